//! Error types shared across the crate.
//!
//! Malformed record data never surfaces here: the summary computation degrades
//! bad input to defaults instead. These variants cover store access, configuration
//! and scheduling failures, which are propagated to whatever invoked the trigger.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LicenseError {
    /// A read or write against the license store failed.
    #[error("store error: {0}")]
    StoreError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("scheduler error: {0}")]
    SchedulerError(String),

    /// A record id that cannot be used as a path segment in the store.
    #[error("invalid record key '{key}': {reason}")]
    InvalidRecordKey { key: String, reason: String },

    #[error("invalid store path: {0}")]
    InvalidPath(String),
}

pub type LicenseResult<T> = Result<T, LicenseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = LicenseError::StoreError("connection reset".to_string());
        assert_eq!(err.to_string(), "store error: connection reset");

        let err = LicenseError::InvalidRecordKey {
            key: "a/b".to_string(),
            reason: "contains '/'".to_string(),
        };
        assert_eq!(err.to_string(), "invalid record key 'a/b': contains '/'");
    }
}
