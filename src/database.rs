use std::sync::Arc;

use crate::data::validate_records;
use crate::error::{RepositoryError, ValidationError};
use crate::models::StudentRecord;

/// Source of the current student collection.
///
/// Handlers only see this trait, so the backing store can be swapped
/// without touching the analytics code.
pub trait StudentRepository: Send + Sync {
    fn list_students(&self) -> Result<Arc<[StudentRecord]>, RepositoryError>;

    fn find_student(&self, id: i64) -> Result<Option<StudentRecord>, RepositoryError>;
}

/// Immutable, validated snapshot of student records held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    students: Arc<[StudentRecord]>,
}

impl InMemoryRepository {
    pub fn new(students: Vec<StudentRecord>) -> Result<Self, ValidationError> {
        validate_records(&students)?;
        Ok(InMemoryRepository {
            students: students.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

impl StudentRepository for InMemoryRepository {
    fn list_students(&self) -> Result<Arc<[StudentRecord]>, RepositoryError> {
        Ok(Arc::clone(&self.students))
    }

    fn find_student(&self, id: i64) -> Result<Option<StudentRecord>, RepositoryError> {
        Ok(self.students.iter().find(|s| s.id == id).cloned())
    }
}
