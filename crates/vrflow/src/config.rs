//! CLI-owned configuration: TOML profiles and translation to
//! `vrflow_core::GatewayConfig`.
//!
//! Core never sees these types -- it receives a pre-built `GatewayConfig`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use vrflow_core::GatewayConfig;
use vrflow_core::config::{DEFAULT_HTTP_PORT, DEFAULT_PUSH_PORT};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

/// CLI-owned TOML configuration. Core never touches this type.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name (used when --profile is not specified).
    pub default_profile: Option<String>,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// CLI-owned profile definition.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway hostname or IP.
    pub host: String,

    /// Push stream port.
    #[serde(default = "default_push_port")]
    pub push_port: u16,

    /// HTTP interface port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Basic auth username.
    #[serde(default = "default_username")]
    pub username: String,

    /// Basic auth password (gateways ship with an empty one).
    #[serde(default)]
    pub password: String,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,
}

fn default_push_port() -> u16 {
    DEFAULT_PUSH_PORT
}
fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}
fn default_username() -> String {
    "admin".into()
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vrflow", "vrflow")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        })
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vrflow");
    p
}

// ── Config loading ───────────────────────────────────────────────────

/// Load the full Config from the file, returning defaults if it
/// doesn't exist.
pub fn load_config_or_default() -> Config {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()));
    figment.extract().unwrap_or_default()
}

// ── Profile resolution ───────────────────────────────────────────────

/// Build a `GatewayConfig` from the config file, profile, and CLI
/// overrides. CLI flags and env vars win over profile values.
pub fn build_gateway_config(global: &GlobalOpts) -> Result<GatewayConfig, CliError> {
    resolve(&load_config_or_default(), global)
}

fn resolve(cfg: &Config, global: &GlobalOpts) -> Result<GatewayConfig, CliError> {
    let profile_name = global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone());

    let profile = match &profile_name {
        Some(name) => Some(cfg.profiles.get(name).ok_or_else(|| {
            CliError::ProfileNotFound { name: name.clone() }
        })?),
        None => None,
    };

    let host = global
        .host
        .clone()
        .or_else(|| profile.map(|p| p.host.clone()))
        .ok_or_else(|| CliError::NoHost {
            path: config_path().display().to_string(),
        })?;

    let mut config = GatewayConfig::new(host);
    if let Some(profile) = profile {
        config.push_port = profile.push_port;
        config.http_port = profile.http_port;
        config.username = profile.username.clone();
        config.password = SecretString::from(profile.password.clone());
        if let Some(secs) = profile.timeout {
            config.http_timeout = Duration::from_secs(secs);
        }
    }

    // CLI flag / env overrides
    if let Some(port) = global.push_port {
        config.push_port = port;
    }
    if let Some(port) = global.http_port {
        config.http_port = port;
    }
    if let Some(ref username) = global.username {
        config.username = username.clone();
    }
    if let Some(ref password) = global.password {
        config.password = SecretString::from(password.clone());
    }
    if let Some(secs) = global.timeout {
        config.http_timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    fn bare_global() -> GlobalOpts {
        GlobalOpts {
            profile: None,
            host: None,
            username: None,
            password: None,
            http_port: None,
            push_port: None,
            output: OutputFormat::Table,
            verbose: 0,
            quiet: false,
            timeout: None,
        }
    }

    fn config_with_home_profile(timeout: Option<u64>) -> Config {
        let mut cfg = Config {
            default_profile: Some("home".into()),
            profiles: HashMap::new(),
        };
        cfg.profiles.insert(
            "home".into(),
            Profile {
                host: "10.0.0.5".into(),
                push_port: DEFAULT_PUSH_PORT,
                http_port: DEFAULT_HTTP_PORT,
                username: "admin".into(),
                password: String::new(),
                timeout,
            },
        );
        cfg
    }

    #[test]
    fn profile_timeout_applies_without_flag() {
        let cfg = config_with_home_profile(Some(30));
        let resolved = resolve(&cfg, &bare_global()).unwrap();
        assert_eq!(resolved.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn timeout_flag_overrides_profile() {
        let cfg = config_with_home_profile(Some(30));
        let mut global = bare_global();
        global.timeout = Some(5);
        let resolved = resolve(&cfg, &global).unwrap();
        assert_eq!(resolved.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn profile_defaults_fill_in() {
        let profile: Profile = toml::from_str(r#"host = "10.0.0.5""#).unwrap();
        assert_eq!(profile.push_port, DEFAULT_PUSH_PORT);
        assert_eq!(profile.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(profile.username, "admin");
        assert_eq!(profile.password, "");
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let mut config = Config {
            default_profile: Some("home".into()),
            profiles: HashMap::new(),
        };
        config.profiles.insert(
            "home".into(),
            Profile {
                host: "192.168.1.50".into(),
                push_port: 9999,
                http_port: 80,
                username: "admin".into(),
                password: String::new(),
                timeout: None,
            },
        );

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.default_profile.as_deref(), Some("home"));
        assert_eq!(parsed.profiles["home"].host, "192.168.1.50");
    }
}
