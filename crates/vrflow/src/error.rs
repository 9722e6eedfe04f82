//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use vrflow_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to gateway at {host}")]
    #[diagnostic(
        code(vrflow::connection_failed),
        help(
            "Check that the gateway is powered on and reachable.\n\
             Host: {host}\n\
             Try: vrflow info --host {host}"
        )
    )]
    ConnectionFailed {
        host: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Gateway request timed out after {seconds}s")]
    #[diagnostic(
        code(vrflow::timeout),
        help("Increase the timeout with --timeout or check gateway responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Unit '{key}' not found")]
    #[diagnostic(
        code(vrflow::not_found),
        help("Run: vrflow devices to see discovered units")
    )]
    UnitNotFound { key: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Gateway rejected the command: {message}")]
    #[diagnostic(code(vrflow::rejected))]
    Rejected { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vrflow::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No gateway host configured")]
    #[diagnostic(
        code(vrflow::no_host),
        help(
            "Pass --host, set VRFLOW_HOST, or create a profile with: vrflow config init <host>\n\
             Config file: {path}"
        )
    )]
    NoHost { path: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vrflow::profile_not_found),
        help("Create one with: vrflow config init <host>")
    )]
    ProfileNotFound { name: String },

    #[error(transparent)]
    #[diagnostic(code(vrflow::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Gateway protocol error: {message}")]
    #[diagnostic(code(vrflow::protocol))]
    Protocol { message: String },

    #[error("{0}")]
    #[diagnostic(code(vrflow::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::UnitNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoHost { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { host, reason } => CliError::ConnectionFailed {
                host,
                source: reason.into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceNotFound { key } => CliError::UnitNotFound { key },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::InvalidCommand { message } => CliError::Validation {
                field: "command".into(),
                reason: message,
            },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
