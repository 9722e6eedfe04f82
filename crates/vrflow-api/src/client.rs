// Poll transport for the gateway's query/control API.
//
// Wraps the raw HTTP/0.9 exchange with endpoint construction, paginated
// device discovery, catalog metadata retrieval, and control commands.
// A conformant `reqwest` client is held as a degraded fallback for
// environments where the raw socket exchange is impossible.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::brands;
use crate::error::Error;
use crate::http09;

/// Units per full discovery page; a shorter page signals the last one.
pub const FULL_PAGE_UNITS: usize = 5;

/// Safety bound on discovery pagination. Some gateway firmware never
/// signals end-of-list; without this a defective server loops forever.
pub const MAX_PAGES: u32 = 20;

/// Default timeout per request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One device entry from a discovery page (`f=17` response `unit` array).
///
/// The gateway omits fields freely; addresses default to 1 the way the
/// firmware does, everything else to zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollUnit {
    #[serde(default = "default_addr")]
    pub oa: u8,
    #[serde(default = "default_addr")]
    pub ia: u8,
    #[serde(default)]
    pub grp: u8,
    /// Opaque control index required by `f=18` commands.
    #[serde(default)]
    pub idx: u32,
    #[serde(default)]
    pub on: u8,
    #[serde(default)]
    pub mode: u8,
    #[serde(default)]
    pub fan: u8,
    #[serde(rename = "tempSet", default)]
    pub temp_set: u8,
    #[serde(rename = "tempIn", default)]
    pub temp_in: u8,
    #[serde(default)]
    pub alarm: u8,
}

fn default_addr() -> u8 {
    1
}

impl PollUnit {
    /// Merge key shared with push-sourced updates: `"{oa}_{ia}"`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.oa, self.ia)
    }
}

/// Gateway catalog metadata, fetched once and cached by the caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GatewayInfo {
    pub manufacturer: String,
    pub model: String,
    pub model_id: String,
    pub sw_version: String,
}

/// Raw client for the gateway's query/control API.
pub struct GatewayClient {
    host: String,
    http_port: u16,
    username: String,
    password: SecretString,
    timeout: Duration,
    fallback: reqwest::Client,
}

impl GatewayClient {
    /// Create a client for the gateway at `host`.
    ///
    /// The query API always listens on port 80 regardless of the push
    /// stream port; use [`with_http_port`](Self::with_http_port) for
    /// non-standard deployments (test harnesses, port forwards).
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let host = host.into();
        let fallback = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Connection {
                host: host.clone(),
                message: format!("failed to build fallback HTTP client: {e}"),
            })?;

        Ok(Self {
            host,
            http_port: 80,
            username: username.into(),
            password,
            timeout,
            fallback,
        })
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Discover all devices by walking discovery pages in order.
    ///
    /// Stops on an empty page, a partial page (fewer than
    /// [`FULL_PAGE_UNITS`] entries), or the [`MAX_PAGES`] safety bound.
    /// A timed-out or malformed page ends pagination with whatever was
    /// collected; only socket-level failures abort the cycle.
    pub async fn fetch_all_devices(&self) -> Result<Vec<PollUnit>, Error> {
        let mut devices = Vec::new();
        let mut page: u32 = 0;

        loop {
            let Some(body) = self.get(&format!("f=17&p={page}")).await? else {
                debug!(page, "no response for page, ending scan");
                break;
            };
            let Some(raw_units) = body.get("unit") else {
                debug!(page, "no unit list on page, ending scan");
                break;
            };
            let units: Vec<PollUnit> = match serde_json::from_value(raw_units.clone()) {
                Ok(units) => units,
                Err(e) => {
                    debug!(page, error = %e, "malformed unit list, ending scan");
                    break;
                }
            };

            if units.is_empty() {
                debug!(page, "empty page, ending scan");
                break;
            }

            let count = units.len();
            debug!(page, count, "discovery page");
            devices.extend(units);

            if count < FULL_PAGE_UNITS {
                debug!(page, count, "partial page, last one");
                break;
            }

            page += 1;
            if page > MAX_PAGES {
                warn!(max_pages = MAX_PAGES, "page limit reached, stopping scan");
                break;
            }
        }

        debug!(total = devices.len(), "discovery complete");
        Ok(devices)
    }

    /// Fetch gateway catalog metadata.
    ///
    /// Two independent requests (brand/protocol and model/firmware);
    /// either may fail without failing the call — placeholders are
    /// substituted so the caller always gets a usable record.
    pub async fn fetch_gateway_info(&self) -> GatewayInfo {
        let manufacturer = match self.get("f=24").await {
            Ok(Some(body)) => {
                let brand = body.get("brand").and_then(Value::as_u64).unwrap_or(0);
                let proto = body.get("proto").and_then(Value::as_u64).unwrap_or(0);
                brands::manufacturer(brand as u16, proto)
            }
            Ok(None) | Err(_) => {
                warn!("brand query failed, using placeholder manufacturer");
                "Zhong Hong".to_owned()
            }
        };

        let (model, model_id, sw_version) = match self.get("f=1").await {
            Ok(Some(body)) => (
                json_str(&body, "model").unwrap_or("Unknown").to_owned(),
                json_str(&body, "id").unwrap_or_default().to_owned(),
                json_str(&body, "sw").unwrap_or_default().trim().to_owned(),
            ),
            Ok(None) | Err(_) => {
                warn!("model query failed, using placeholder model");
                ("Unknown".to_owned(), String::new(), String::new())
            }
        };

        GatewayInfo {
            manufacturer,
            model,
            model_id,
            sw_version,
        }
    }

    /// Issue one control command for the unit at `idx`.
    ///
    /// Success is exactly "response present and `err == 0`". A missing
    /// response or non-zero code is a failure reported to the caller;
    /// this layer never retries. Socket-level failures surface as
    /// [`Error::Connection`].
    pub async fn send_control(
        &self,
        idx: u32,
        on: u8,
        mode: u8,
        temp_set: u8,
        fan: u8,
    ) -> Result<bool, Error> {
        debug!(idx, on, mode, temp_set, fan, "control command");
        let query = format!("f=18&idx={idx}&on={on}&mode={mode}&tempSet={temp_set}&fan={fan}");

        let Some(body) = self.get(&query).await? else {
            return Ok(false);
        };
        let success = body.get("err").and_then(Value::as_i64) == Some(0);
        debug!(idx, success, "control result");
        Ok(success)
    }

    // ── Request plumbing ─────────────────────────────────────────────

    /// One query API request.
    ///
    /// `Ok(None)` means "no data this round": a timeout or a protocol
    /// violation (logged at debug, never fatal). Socket-level failures
    /// are tried once against the conformant fallback before being
    /// surfaced as errors.
    async fn get(&self, query: &str) -> Result<Option<Value>, Error> {
        let path_query = format!("/cgi-bin/api.html?{query}");

        match http09::exchange(
            &self.host,
            self.http_port,
            &path_query,
            &self.username,
            &self.password,
            self.timeout,
        )
        .await
        {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_timeout() => {
                debug!(query, error = %e, "request timed out, no data");
                Ok(None)
            }
            Err(Error::Protocol { message }) => {
                debug!(query, message, "protocol violation, no data");
                Ok(None)
            }
            Err(raw_err) => {
                // Degraded path: environments where the raw socket
                // exchange is impossible. If it also fails, report the
                // raw error — it names the actual gateway.
                match self.get_conformant(query).await {
                    Ok(body) => Ok(Some(body)),
                    Err(fallback_err) => {
                        debug!(query, error = %fallback_err, "conformant fallback also failed");
                        Err(raw_err)
                    }
                }
            }
        }
    }

    /// Conformant request through `reqwest`.
    ///
    /// On a transport-level parse failure the error text may embed the
    /// JSON body the server actually sent — extract it if so.
    pub(crate) async fn get_conformant(&self, query: &str) -> Result<Value, Error> {
        let url = format!(
            "http://{}:{}/cgi-bin/api.html?{query}",
            self.host, self.http_port
        );
        debug!(%url, "conformant fallback request");

        let result = self
            .fallback
            .get(&url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await;

        match result {
            Ok(resp) => {
                let text = resp.text().await.map_err(|e| Error::Protocol {
                    message: format!("failed to read response body: {e}"),
                })?;
                http09::parse_body(&text)
            }
            Err(e) => {
                let text = e.to_string();
                if let Some(span) = http09::extract_json(&text) {
                    return serde_json::from_str(span).map_err(|parse| Error::Protocol {
                        message: format!("malformed JSON in error text: {parse}"),
                    });
                }
                if e.is_timeout() {
                    Err(Error::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    })
                } else if e.is_connect() {
                    Err(Error::Connection {
                        host: self.host.clone(),
                        message: text,
                    })
                } else {
                    Err(Error::Protocol { message: text })
                }
            }
        }
    }
}

fn json_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field).and_then(Value::as_str)
}
