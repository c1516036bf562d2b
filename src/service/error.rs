use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Unexpected result: {message}")]
    UnexpectedResult { message: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("You don't have enough coins. You need {needed} coins but only have {balance}.")]
    InsufficientFunds { needed: i64, balance: i64 },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    OnCooldown(String),

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(value: sqlx::Error) -> Self {
        ServiceError::DatabaseError(DatabaseError::BackendError(value))
    }
}
