//! Error types for the loanbook library.

use crate::storage::Collection;

/// All errors that can occur when using loanbook.
#[derive(Debug, thiserror::Error)]
pub enum LoanbookError {
    /// Required fields are missing or malformed. Raised before anything is
    /// written to storage.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up (e.g. `"loan"`).
        entity: &'static str,
        /// Identifier that was not found.
        id: String,
    },

    /// A record without an identity key was written to a collection.
    #[error("record written to `{0}` has no id")]
    MissingKey(Collection),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, LoanbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = LoanbookError::from(serde_err);
        assert!(matches!(err, LoanbookError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = LoanbookError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("file missing"));
    }

    #[test]
    fn error_not_found_display() {
        let err = LoanbookError::NotFound {
            entity: "loan",
            id: "l-1".to_owned(),
        };
        assert_eq!(err.to_string(), "loan not found: l-1");
    }

    #[test]
    fn error_missing_key_names_collection() {
        let err = LoanbookError::MissingKey(Collection::Loans);
        assert!(err.to_string().contains("loans"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LoanbookError>();
    }
}
