use log::error;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Assertion error: {msg}")]
    AssertionError { msg: String },

    #[error("Missing config with key \"{key}\"")]
    MissingConfig { key: String },

    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },

    #[error("Internal error (ref {ref_id}): {msg}")]
    InternalError { ref_id: String, msg: String },
}

impl AppError {
    /// Logs an unexpected error and returns a short reference id users can report.
    pub fn log_with_ref(error: &(impl std::fmt::Debug + ?Sized)) -> String {
        let ref_id = Self::new_ref_id();
        error!("[ref {}] {:?}", ref_id, error);
        ref_id
    }

    /// Wraps an unexpected error into an [`AppError::InternalError`], logging it once.
    pub fn internal_with_ref(error: impl std::fmt::Display + std::fmt::Debug) -> Self {
        let ref_id = Self::log_with_ref(&error);
        AppError::InternalError {
            ref_id,
            msg: error.to_string(),
        }
    }

    fn new_ref_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_with_ref_is_short_hex() {
        let ref_id = AppError::log_with_ref("boom");
        assert_eq!(ref_id.len(), 8);
        assert!(ref_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_internal_with_ref_keeps_message() {
        match AppError::internal_with_ref("db went away") {
            AppError::InternalError { msg, ref_id } => {
                assert_eq!(msg, "db went away");
                assert_eq!(ref_id.len(), 8);
            }
            _ => panic!("Expected InternalError"),
        }
    }
}
