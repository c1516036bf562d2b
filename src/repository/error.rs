use sqlx::error::ErrorKind;

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DatabaseError {
    #[error("Internal database error: {0}")]
    BackendError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Internal database error: {message}")]
    InternalError { message: String },
}

impl DatabaseError {
    /// True when an insert hit a `UNIQUE` constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::BackendError(err) => err
                .as_database_error()
                .is_some_and(|e| matches!(e.kind(), ErrorKind::UniqueViolation)),
            _ => false,
        }
    }
}

impl From<AppError> for DatabaseError {
    fn from(value: AppError) -> Self {
        DatabaseError::InternalError {
            message: value.to_string(),
        }
    }
}
