// src/infra/errors.rs — Error types for Flowing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowingError {
    // Assignment (non-fatal: the cycle continues with an empty batch)
    #[error("No workers available for assignment")]
    NoWorkersAvailable,

    // Dispatch errors (recovered per assignment, never abort a cycle)
    #[error("Dispatch timed out")]
    DispatchTimeout,

    #[error("Cannot connect to worker endpoint")]
    DispatchConnectionFailure,

    #[error("Worker protocol error: {message}")]
    DispatchProtocolError { message: String },

    #[error("Dispatch failed: {message}")]
    DispatchUnknownFailure { message: String },

    // Registry / configuration
    #[error("Invalid endpoint for worker '{worker}': {url}")]
    InvalidEndpoint { worker: String, url: String },

    #[error("Worker '{id}' registered more than once")]
    DuplicateWorker { id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Report export (fatal: propagated to the caller)
    #[error("Report error: {0}")]
    Report(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlowingError {
    /// Dispatch-phase errors only ever fail a single assignment.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            FlowingError::DispatchTimeout
                | FlowingError::DispatchConnectionFailure
                | FlowingError::DispatchProtocolError { .. }
                | FlowingError::DispatchUnknownFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_failures_are_classified() {
        assert!(FlowingError::DispatchTimeout.is_dispatch_failure());
        assert!(FlowingError::DispatchConnectionFailure.is_dispatch_failure());
        assert!(FlowingError::DispatchProtocolError {
            message: "HTTP 500".into()
        }
        .is_dispatch_failure());
        assert!(FlowingError::DispatchUnknownFailure {
            message: "reset".into()
        }
        .is_dispatch_failure());
    }

    #[test]
    fn test_other_errors_are_not_dispatch_failures() {
        assert!(!FlowingError::NoWorkersAvailable.is_dispatch_failure());
        assert!(!FlowingError::Report("disk full".into()).is_dispatch_failure());
        assert!(!FlowingError::Config("bad".into()).is_dispatch_failure());
    }

    #[test]
    fn test_display_messages() {
        let e = FlowingError::InvalidEndpoint {
            worker: "AgentA".into(),
            url: "localhost".into(),
        };
        assert_eq!(e.to_string(), "Invalid endpoint for worker 'AgentA': localhost");
        assert_eq!(
            FlowingError::DuplicateWorker { id: "AgentB".into() }.to_string(),
            "Worker 'AgentB' registered more than once"
        );
    }
}
