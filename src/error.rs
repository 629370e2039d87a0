//! Error types for the investigation pipeline

use thiserror::Error;

use crate::types::ChainKind;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the investigation pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Request-level errors surfaced to callers
    #[error("Unrecognized address: {0}")]
    UnrecognizedAddress(String),

    #[error("Chain adapter unavailable for {chain}: {reason}")]
    AdapterUnavailable { chain: ChainKind, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Upstream/transport errors; adapters convert these before the
    // orchestrator sees them
    #[error("Upstream source error: {0}")]
    Upstream(String),

    #[error("Upstream timeout")]
    UpstreamTimeout,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    // Pipeline-stage wrapper so callers can see where a failure originated
    #[error("stage {stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Attach the originating pipeline stage name
    pub fn at_stage(self, stage: &'static str) -> Self {
        match self {
            // Don't double-wrap when an inner call already tagged itself
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stable error code for the upward request/response contract
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnrecognizedAddress(_) => "UnrecognizedAddress",
            Error::AdapterUnavailable { .. } => "ChainAdapterUnavailable",
            Error::InvalidRequest(_) => "InvalidRequest",
            Error::Stage { source, .. } => source.code(),
            _ => "Internal",
        }
    }

    /// Check if this error is transient at the transport level
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Upstream(_) | Error::UpstreamTimeout)
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::UpstreamTimeout
        } else {
            Error::Upstream(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_wrap_preserves_code() {
        let err = Error::AdapterUnavailable {
            chain: ChainKind::Ethereum,
            reason: "no endpoint configured".to_string(),
        }
        .at_stage("balance-fetch");

        assert_eq!(err.code(), "ChainAdapterUnavailable");
        assert!(err.to_string().contains("balance-fetch"));
    }

    #[test]
    fn stage_wrap_is_idempotent() {
        let err = Error::Upstream("boom".to_string())
            .at_stage("history-fetch")
            .at_stage("orchestrator");

        match err {
            Error::Stage { stage, .. } => assert_eq!(stage, "history-fetch"),
            other => panic!("expected stage error, got {other:?}"),
        }
    }

    #[test]
    fn request_errors_map_to_wire_codes() {
        assert_eq!(
            Error::UnrecognizedAddress("xyz".into()).code(),
            "UnrecognizedAddress"
        );
        assert_eq!(
            Error::InvalidRequest("bad limit".into()).code(),
            "InvalidRequest"
        );
        assert_eq!(Error::Upstream("503".into()).code(), "Internal");
    }
}
