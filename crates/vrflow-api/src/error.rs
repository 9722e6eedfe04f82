use thiserror::Error;

/// Top-level error type for the `vrflow-api` crate.
///
/// The gateway's failure modes fall into three kinds with different
/// handling contracts: *connection* errors surface to the caller,
/// *timeouts* mean "no data this round", and *protocol* violations are
/// logged at debug and discarded. `vrflow-core` maps these into
/// user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket-level connect/read/write failure (refused, reset, DNS).
    #[error("socket error talking to {host}: {message}")]
    Connection { host: String, message: String },

    /// Bounded-wait expiry on an HTTP exchange or idle TCP read.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Malformed frame or malformed/absent JSON body.
    #[error("protocol violation: {message}")]
    Protocol { message: String },
}

impl Error {
    /// `true` for bounded-wait expiry — treated as "no data", not fatal.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// `true` for socket-level failures that the caller should see.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
