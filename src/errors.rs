//! Typed error hierarchy for the dashboard synchronization core.
//!
//! `SyncError` covers the four failure classes the core distinguishes:
//! - transport failures (`Http`, `Status`): logged, never fatal
//! - malformed push payloads (`MalformedEvent`): the message is discarded
//! - command rejections and local control-surface refusals
//! - configuration problems

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed stream event: {reason}")]
    MalformedEvent { reason: String },

    #[error("{command} rejected by server: {message}")]
    CommandRejected { command: String, message: String },

    #[error("Feature {feature_id} is already running")]
    ExecutionInProgress { feature_id: String },

    #[error("Stop already requested for feature {feature_id}")]
    StopPending { feature_id: String },

    #[error("No feature is running")]
    NotRunning,

    #[error("No project selected")]
    NoActiveProject,

    #[error("Feature {id} not found")]
    UnknownFeature { id: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// Transport errors are retried by re-fetching; everything else is
    /// surfaced to the caller.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Status { .. })
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_rejected_carries_command_and_message() {
        let err = SyncError::CommandRejected {
            command: "reorder".to_string(),
            message: "stale ordering".to_string(),
        };
        assert_eq!(err.to_string(), "reorder rejected by server: stale ordering");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_status_error_is_transport() {
        let err = SyncError::Status {
            endpoint: "/api/projects".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(err.is_transport());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_control_errors_are_matchable() {
        let err = SyncError::StopPending {
            feature_id: "f1".to_string(),
        };
        match &err {
            SyncError::StopPending { feature_id } => assert_eq!(feature_id, "f1"),
            _ => panic!("Expected StopPending"),
        }
        assert!(matches!(SyncError::NotRunning, SyncError::NotRunning));
    }

    #[test]
    fn test_converts_from_anyhow() {
        let err: SyncError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, SyncError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&SyncError::NoActiveProject);
        assert_std_error(&SyncError::Config("x".into()));
    }
}
