//! Configuration file management (no gateway connection required).

use std::collections::HashMap;

use vrflow_core::config::{DEFAULT_HTTP_PORT, DEFAULT_PUSH_PORT};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{Config, Profile, config_path};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config_path().display());
            Ok(())
        }

        ConfigCommand::Init { host } => {
            let path = config_path();
            if path.exists() {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!("{} already exists", path.display()),
                });
            }

            let mut profiles = HashMap::new();
            profiles.insert(
                "default".to_owned(),
                Profile {
                    host,
                    push_port: DEFAULT_PUSH_PORT,
                    http_port: DEFAULT_HTTP_PORT,
                    username: "admin".into(),
                    password: String::new(),
                    timeout: None,
                },
            );
            let config = Config {
                default_profile: Some("default".into()),
                profiles,
            };

            let text = toml::to_string_pretty(&config)
                .map_err(|e| CliError::Internal(format!("failed to render config: {e}")))?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, text)?;

            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}
