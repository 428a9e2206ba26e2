use thiserror::Error;

/// Result type alias for rblwatch operations
pub type Result<T> = std::result::Result<T, RblError>;

/// Errors that can occur while checking and monitoring DNSBL status
#[derive(Error, Debug)]
pub enum RblError {
    /// Configuration is invalid (zero rate, zero concurrency, empty zone set, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// The storage collaborator failed to load or save
    #[error("storage error: {0}")]
    Storage(String),

    /// An alert could not be delivered
    #[error("notification failed: {0}")]
    Notify(String),

    /// A DNS resolver could not be built or used
    #[error("DNS error: {0}")]
    Dns(String),

    /// Target string is empty, too long or otherwise unusable
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Zone name is empty or malformed
    #[error("invalid zone: {0}")]
    InvalidZone(String),

    /// A run record was finalized more than once
    #[error("run {id} already finalized as {status}")]
    RunFinalized {
        /// Run identifier
        id: u64,
        /// Terminal status the run already holds
        status: String,
    },

    /// Filesystem I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RblError {
    /// Returns true if the error stems from invalid configuration
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if the error came from the storage collaborator
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_) | Self::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(RblError::Config("zero zones".into()).is_config_error());
        assert!(RblError::Storage("down".into()).is_storage_error());
        assert!(!RblError::Notify("webhook".into()).is_storage_error());
    }

    #[test]
    fn test_finalized_message() {
        let err = RblError::RunFinalized {
            id: 7,
            status: "completed".into(),
        };
        assert_eq!(err.to_string(), "run 7 already finalized as completed");
    }
}
