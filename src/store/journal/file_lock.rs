//! Store directory ownership.
//!
//! A store directory belongs to at most one open backend at a time. The
//! claim is an advisory OS lock on a `.lock` file inside the directory,
//! taken without blocking when the backend opens and released when the
//! [`DirLock`] drops. The lock file itself is left behind after release;
//! only the OS lock on it carries meaning, so a stale file from a crashed
//! process never blocks the next owner.

use std::fs::{File, OpenOptions};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::path::{Path, PathBuf};

/// Claim of exclusive ownership over a store directory.
///
/// Owning this value is owning the directory; dropping it releases the
/// claim.
#[derive(Debug)]
pub struct DirLock {
    _claim: File,
    path: PathBuf,
}

impl DirLock {
    /// Claims the directory, failing fast if it is already owned.
    ///
    /// # Errors
    /// - `ErrorKind::WouldBlock` if a live handle already owns the directory
    /// - any error creating the `.lock` file (missing directory, permissions)
    pub fn acquire(dir: &Path) -> IoResult<Self> {
        let path = dir.join(".lock");
        let claim = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        lock_exclusive(&claim)?;

        Ok(Self {
            _claim: claim,
            path,
        })
    }

    /// Location of the `.lock` file backing this claim.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn contended() -> IoError {
    IoError::new(
        ErrorKind::WouldBlock,
        "store directory already owned by a live cardfile handle",
    )
}

#[cfg(unix)]
fn lock_exclusive(claim: &File) -> IoResult<()> {
    use std::os::unix::io::AsRawFd;

    // LOCK_NB: a held lock reports immediately instead of stalling open
    if unsafe { libc::flock(claim.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } == 0 {
        return Ok(());
    }

    let os = IoError::last_os_error();
    if os.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Err(contended())
    } else {
        Err(os)
    }
}

#[cfg(windows)]
fn lock_exclusive(claim: &File) -> IoResult<()> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::HANDLE;
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    let mut overlapped = unsafe { std::mem::zeroed::<OVERLAPPED>() };
    let granted = unsafe {
        LockFileEx(
            claim.as_raw_handle() as HANDLE,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };

    if granted == 0 {
        return Err(contended());
    }
    Ok(())
}

#[cfg(not(any(unix, windows)))]
fn lock_exclusive(_claim: &File) -> IoResult<()> {
    Err(IoError::new(
        ErrorKind::Unsupported,
        "no directory locking primitive on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_contended_until_released() {
        let dir = tempdir().unwrap();

        let held = DirLock::acquire(dir.path()).unwrap();
        assert_eq!(
            DirLock::acquire(dir.path()).unwrap_err().kind(),
            ErrorKind::WouldBlock
        );

        drop(held);
        DirLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_stale_lock_file_is_harmless() {
        let dir = tempdir().unwrap();
        let lock_path = {
            let claim = DirLock::acquire(dir.path()).unwrap();
            claim.path().to_path_buf()
        };

        // The file stays on disk after release but carries no lock
        assert!(lock_path.exists());
        DirLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn test_missing_directory_rejected() {
        let dir = tempdir().unwrap();
        let err = DirLock::acquire(&dir.path().join("absent")).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::WouldBlock);
    }
}
