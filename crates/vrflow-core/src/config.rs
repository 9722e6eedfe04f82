// ── Runtime connection configuration ──
//
// Describes *how* to reach a ZhongHong gateway. Carries credential data
// and connection tuning, but never touches disk — the CLI constructs a
// `GatewayConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use vrflow_api::client::DEFAULT_TIMEOUT;

/// TCP port the gateway pushes binary state frames on.
pub const DEFAULT_PUSH_PORT: u16 = 9999;

/// HTTP port for the polling/control interface.
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Configuration for connecting to a single gateway.
///
/// Built by the CLI, passed to [`Gateway`](crate::Gateway) -- core never
/// reads config files.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway hostname or IP address.
    pub host: String,
    /// Port for the push stream.
    pub push_port: u16,
    /// Port for the HTTP interface.
    pub http_port: u16,
    /// HTTP Basic auth username.
    pub username: String,
    /// HTTP Basic auth password. Gateways ship with an empty password.
    pub password: SecretString,
    /// Timeout for each HTTP exchange.
    pub http_timeout: Duration,
}

impl GatewayConfig {
    /// Config for `host` with stock gateway defaults for everything else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            push_port: DEFAULT_PUSH_PORT,
            http_port: DEFAULT_HTTP_PORT,
            username: "admin".into(),
            password: SecretString::from(String::new()),
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}
