use thiserror::Error;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
}
