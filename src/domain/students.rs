//! Student records.
//!
//! Students are keyed by roll number. Enrollment with an existing roll
//! number fails with [`DuplicateKey`](crate::store::StorageError::DuplicateKey)
//! rather than overwriting the existing record.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CardResult, ValidationError};
use crate::record::{require_non_empty, Record};
use crate::store::{
    open_store, EntityStore, JournalBackend, MemoryBackend, StorageBackend, StoreOptions,
};

/// One student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Roll number; unique within a registry.
    pub roll_no: String,
    /// Full name.
    pub name: String,
    /// Department the student belongs to.
    pub department: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Contact email.
    pub email: String,
}

/// Field-level update for a [`Student`]. The roll number is immutable.
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    /// New name, if changing.
    pub name: Option<String>,
    /// New department, if changing.
    pub department: Option<String>,
    /// New date of birth, if changing.
    pub date_of_birth: Option<NaiveDate>,
    /// New email, if changing.
    pub email: Option<String>,
}

impl Record for Student {
    type Patch = StudentPatch;

    fn key(&self) -> &str {
        &self.roll_no
    }

    fn search_text(&self) -> Vec<&str> {
        vec![&self.roll_no, &self.name, &self.department, &self.email]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("department", &self.department)?;
        require_non_empty("email", &self.email)
    }

    fn apply(&mut self, patch: StudentPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(department) = patch.department {
            self.department = department;
        }
        if let Some(date_of_birth) = patch.date_of_birth {
            self.date_of_birth = date_of_birth;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
    }
}

/// A student registry: one [`EntityStore`] of students.
pub struct Registry<B: StorageBackend<Student>> {
    students: EntityStore<Student, B>,
}

impl Registry<JournalBackend<Student>> {
    /// Opens or creates a durable registry at the given directory.
    ///
    /// # Errors
    /// Any storage error from opening the journal backend.
    pub fn open(dir: impl AsRef<Path>) -> CardResult<Self> {
        Ok(Self {
            students: open_store(dir.as_ref(), None, StoreOptions::default())?,
        })
    }
}

impl Registry<MemoryBackend<Student>> {
    /// Creates an ephemeral in-memory registry.
    ///
    /// # Errors
    /// Never fails in practice; kept fallible for uniformity with
    /// [`Registry::open`].
    pub fn in_memory() -> CardResult<Self> {
        Ok(Self {
            students: EntityStore::open(MemoryBackend::new(), StoreOptions::default())?,
        })
    }
}

impl<B: StorageBackend<Student>> Registry<B> {
    /// Enrolls a new student.
    ///
    /// # Errors
    /// - [`DuplicateKey`](crate::store::StorageError::DuplicateKey) if the
    ///   roll number is taken; the existing record is unchanged
    /// - [`ValidationError`] for empty required fields
    pub fn enroll(&mut self, student: Student) -> CardResult<()> {
        self.students.add(student)
    }

    /// Looks up a student by roll number.
    #[must_use]
    pub fn find(&self, roll_no: &str) -> Option<Student> {
        self.students.get(roll_no)
    }

    /// Substring search over roll number, name, department, and email.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Student> {
        self.students.search(query)
    }

    /// Updates a student's details.
    ///
    /// # Errors
    /// - [`NotFound`](crate::store::StorageError::NotFound) if the roll
    ///   number is absent
    /// - [`ValidationError`] if the patched record fails validation
    pub fn update(&mut self, roll_no: &str, patch: StudentPatch) -> CardResult<()> {
        self.students.update(roll_no, patch)
    }

    /// Removes a student record.
    ///
    /// # Errors
    /// [`NotFound`](crate::store::StorageError::NotFound) if the roll number
    /// is absent.
    pub fn withdraw(&mut self, roll_no: &str) -> CardResult<()> {
        self.students.remove(roll_no)
    }

    /// Snapshot of all students in roll-number order.
    #[must_use]
    pub fn roster(&self) -> Vec<Student> {
        self.students.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(roll_no: &str, name: &str) -> Student {
        Student {
            roll_no: roll_no.to_string(),
            name: name.to_string(),
            department: "Physics".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2004, 7, 19).unwrap(),
            email: format!("{}@campus.edu", roll_no.to_ascii_lowercase()),
        }
    }

    #[test]
    fn test_enroll_and_find() {
        let mut registry = Registry::in_memory().unwrap();
        registry.enroll(student("S1", "Hamna")).unwrap();

        let found = registry.find("S1").unwrap();
        assert_eq!(found.name, "Hamna");
        assert_eq!(found.department, "Physics");
    }

    #[test]
    fn test_duplicate_roll_number() {
        let mut registry = Registry::in_memory().unwrap();
        registry.enroll(student("S1", "Hamna")).unwrap();

        let err = registry.enroll(student("S1", "Imposter")).unwrap_err();
        assert!(err.is_duplicate_key());

        // First record retrievable unchanged
        assert_eq!(registry.find("S1").unwrap().name, "Hamna");
        assert_eq!(registry.roster().len(), 1);
    }

    #[test]
    fn test_update_details() {
        let mut registry = Registry::in_memory().unwrap();
        registry.enroll(student("S1", "Hamna")).unwrap();

        registry
            .update(
                "S1",
                StudentPatch {
                    department: Some("Mathematics".to_string()),
                    ..StudentPatch::default()
                },
            )
            .unwrap();

        let found = registry.find("S1").unwrap();
        assert_eq!(found.department, "Mathematics");
        assert_eq!(found.name, "Hamna");
    }

    #[test]
    fn test_update_absent_roll_number() {
        let mut registry = Registry::in_memory().unwrap();
        let err = registry
            .update("S9", StudentPatch::default())
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(registry.roster().is_empty());
    }

    #[test]
    fn test_empty_required_field_rejected() {
        let mut registry = Registry::in_memory().unwrap();
        let mut s = student("S1", "Hamna");
        s.email = String::new();

        let err = registry.enroll(s).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_search_by_department() {
        let mut registry = Registry::in_memory().unwrap();
        registry.enroll(student("S1", "Hamna")).unwrap();
        registry.enroll(student("S2", "Bilal")).unwrap();

        assert_eq!(registry.search("physics").len(), 2);
        assert_eq!(registry.search("bilal").len(), 1);
        assert!(registry.search("chemistry").is_empty());
    }
}
