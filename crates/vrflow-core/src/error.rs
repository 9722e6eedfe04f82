// ── Core error types ──
//
// User-facing errors from vrflow-core. Consumers never see socket
// errors or JSON parse failures directly; the `From<vrflow_api::Error>`
// impl translates transport-layer failures into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to gateway at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("Gateway request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {key}")]
    DeviceNotFound { key: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Command rejected by gateway: {message}")]
    Rejected { message: String },

    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vrflow_api::Error> for CoreError {
    fn from(err: vrflow_api::Error) -> Self {
        match err {
            vrflow_api::Error::Connection { host, message } => CoreError::ConnectionFailed {
                host,
                reason: message,
            },
            vrflow_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            vrflow_api::Error::Protocol { message } => CoreError::Protocol { message },
        }
    }
}
