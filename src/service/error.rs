use thiserror::Error;

use crate::model::{DatabaseError, ResourceType};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{resource_type:?} not found")]
    NotFound { resource_type: ResourceType },

    #[error("submission carries {got} answers but the quiz has {expected} questions")]
    InvalidSubmission { expected: usize, got: usize },

    #[error("time delta must not be negative, got {delta}")]
    NegativeTimeDelta { delta: i64 },

    #[error("access to this resource is forbidden")]
    Forbidden,

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    pub fn not_found(resource_type: ResourceType) -> Self {
        Self::NotFound { resource_type }
    }

    pub fn invalid_submission(expected: usize, got: usize) -> Self {
        Self::InvalidSubmission { expected, got }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(DatabaseError::SqlxError(e))
    }
}
