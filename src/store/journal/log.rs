//! Append-only journal of record operations.
//!
//! The journal is the durable medium behind a store: every mutation is
//! appended (and optionally fsynced) before the in-memory mapping changes,
//! and the full log is replayed at startup to reconstruct the store.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [ENTRY 1: codec-framed JournalEntry]
//! [ENTRY 2: codec-framed JournalEntry]
//! ...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Seek, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::record::Record;

use super::codec;

/// A single entry in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry<R> {
    /// Monotonically increasing sequence number.
    pub sequence: u64,
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// The operation being logged.
    pub op: JournalOp<R>,
}

/// The record operation a journal entry describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalOp<R> {
    /// A new record was added.
    Insert(R),
    /// An existing record was replaced with this state.
    Update(R),
    /// The record with this key was removed.
    Delete {
        /// Key of the removed record.
        key: String,
    },
}

/// Append-only journal for one entity type.
///
/// Opening scans the existing file to find the last sequence number. A torn
/// tail (partial final entry, e.g. from a crash mid-append) is truncated to
/// the last valid entry; corruption before the tail is reported as an error.
#[derive(Debug)]
pub struct Journal<R: Record> {
    path: PathBuf,
    writer: BufWriter<File>,
    sequence: u64,
    sync_on_write: bool,
    _record: PhantomData<R>,
}

impl<R: Record> Journal<R> {
    /// Opens or creates a journal at the given path.
    ///
    /// # Errors
    /// - I/O errors opening or scanning the file
    /// - `ErrorKind::InvalidData` if the header or a non-tail entry is corrupt
    pub fn open(path: &Path, sync_on_write: bool) -> IoResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let sequence = if file.metadata()?.len() >= codec::HEADER_LEN {
            Self::scan_and_repair(path)?
        } else {
            let mut file = file;
            codec::write_header(&mut file)?;
            if sync_on_write {
                file.sync_all()?;
            }
            0
        };

        let file = OpenOptions::new().append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            sequence,
            sync_on_write,
            _record: PhantomData,
        })
    }

    /// Appends an operation, returning its sequence number.
    ///
    /// The entry is flushed (and fsynced when `sync_on_write`) before this
    /// returns; a successful return means the operation is durable.
    ///
    /// # Errors
    /// Any I/O failure; the caller must treat the operation as not persisted.
    pub fn append(&mut self, op: JournalOp<R>) -> IoResult<u64> {
        let candidate = self.sequence + 1;
        let entry = JournalEntry {
            sequence: candidate,
            timestamp: Utc::now(),
            op,
        };

        let encoded = codec::encode(&entry)?;
        self.writer.write_all(&encoded)?;
        self.writer.flush()?;

        if self.sync_on_write {
            self.writer.get_ref().sync_all()?;
        }

        self.sequence = candidate;
        Ok(candidate)
    }

    /// Iterates over all entries from the start of the journal.
    ///
    /// Used at load to replay mutations.
    ///
    /// # Errors
    /// Fails if the file cannot be reopened or the header is invalid.
    pub fn iter(&self) -> IoResult<JournalIter<R>> {
        JournalIter::open(&self.path)
    }

    /// The sequence number of the most recent entry.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Current journal file size in bytes.
    ///
    /// # Errors
    /// Fails if file metadata cannot be read.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Replaces the journal with one `Insert` per live record.
    ///
    /// Called after the log has grown past its size budget; replaying the
    /// rewritten journal reconstructs exactly the given records.
    ///
    /// The compacted log is written and fsynced to a sibling file, then
    /// renamed over the journal. The journal itself is never truncated, so
    /// a crash at any point leaves either the old log or the new one, both
    /// complete.
    ///
    /// # Errors
    /// Any I/O failure. On failure the current journal, append handle, and
    /// sequence counter are all untouched.
    pub fn rewrite(&mut self, records: &[R]) -> IoResult<()> {
        let compact_path = self.path.with_extension("compact");
        let swapped = self.swap_in_compacted(&compact_path, records);
        if swapped.is_err() {
            let _ = std::fs::remove_file(&compact_path);
        }
        swapped
    }

    fn swap_in_compacted(&mut self, compact_path: &Path, records: &[R]) -> IoResult<()> {
        let sequence = Self::write_compacted(compact_path, records)?;

        // Take the append handle on the compacted file before the swap;
        // the handle follows the file through the rename.
        let new_writer = BufWriter::new(OpenOptions::new().append(true).open(compact_path)?);

        self.writer.flush()?;
        std::fs::rename(compact_path, &self.path)?;

        if self.sync_on_write {
            if let Some(dir) = self.path.parent() {
                if let Ok(dir) = File::open(dir) {
                    let _ = dir.sync_all();
                }
            }
        }

        self.writer = new_writer;
        self.sequence = sequence;
        Ok(())
    }

    fn write_compacted(path: &Path, records: &[R]) -> IoResult<u64> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        codec::write_header(&mut file)?;

        let mut sequence = 0u64;
        for record in records {
            sequence += 1;
            let entry = JournalEntry {
                sequence,
                timestamp: Utc::now(),
                op: JournalOp::Insert(record.clone()),
            };
            file.write_all(&codec::encode(&entry)?)?;
        }

        file.sync_all()?;
        Ok(sequence)
    }

    /// Scans the journal, truncating a torn tail, and returns the last
    /// sequence number.
    fn scan_and_repair(path: &Path) -> IoResult<u64> {
        let mut iter = JournalIter::<R>::open(path)?;
        let mut last_seq = 0;
        let mut valid_to = codec::HEADER_LEN;

        loop {
            match iter.next_entry() {
                Ok(Some(entry)) => {
                    last_seq = entry.sequence;
                    valid_to = iter.position()?;
                }
                Ok(None) => break,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    warn!(
                        path = %path.display(),
                        valid_to,
                        "torn journal tail detected; truncating to last valid entry"
                    );
                    let file = OpenOptions::new().write(true).open(path)?;
                    file.set_len(valid_to)?;
                    file.sync_all()?;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(last_seq)
    }
}

/// Forward reader over journal entries.
pub struct JournalIter<R> {
    reader: BufReader<File>,
    file_size: u64,
    _record: PhantomData<R>,
}

impl<R: Record> JournalIter<R> {
    fn open(path: &Path) -> IoResult<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let _version = codec::read_header(&mut reader)?;

        Ok(Self {
            reader,
            file_size,
            _record: PhantomData,
        })
    }

    /// Reads the next entry, or `None` at end of file.
    ///
    /// # Errors
    /// - `ErrorKind::UnexpectedEof` on a torn final entry
    /// - `ErrorKind::InvalidData` on CRC or decode failure
    pub fn next_entry(&mut self) -> IoResult<Option<JournalEntry<R>>> {
        if self.position()? >= self.file_size {
            return Ok(None);
        }
        codec::decode(&mut self.reader).map(Some)
    }

    /// Current byte offset into the journal file.
    ///
    /// # Errors
    /// Fails if the underlying stream position cannot be read.
    pub fn position(&mut self) -> IoResult<u64> {
        self.reader.stream_position()
    }
}

impl<R: Record> Iterator for JournalIter<R> {
    type Item = IoResult<JournalEntry<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
