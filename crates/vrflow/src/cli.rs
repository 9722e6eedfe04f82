//! Clap derive structures for the `vrflow` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use vrflow_core::model;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vrflow -- CLI for ZhongHong VRF HVAC gateways
#[derive(Debug, Parser)]
#[command(
    name = "vrflow",
    version,
    about = "Manage VRF air conditioners through a ZhongHong gateway",
    long_about = "A CLI for ZhongHong B17/B19/B27 VRF gateways.\n\n\
        Discovers indoor units over the gateway's HTTP interface and\n\
        follows live state changes on its binary push stream.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Gateway profile to use
    #[arg(long, short = 'p', env = "VRFLOW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Gateway hostname or IP (overrides profile)
    #[arg(long, short = 'H', env = "VRFLOW_HOST", global = true)]
    pub host: Option<String>,

    /// HTTP Basic auth username
    #[arg(long, short = 'u', env = "VRFLOW_USERNAME", global = true)]
    pub username: Option<String>,

    /// HTTP Basic auth password
    #[arg(long, env = "VRFLOW_PASSWORD", global = true, hide_env = true)]
    pub password: Option<String>,

    /// HTTP interface port
    #[arg(long, env = "VRFLOW_HTTP_PORT", global = true)]
    pub http_port: Option<u16>,

    /// Push stream port
    #[arg(long, env = "VRFLOW_PUSH_PORT", global = true)]
    pub push_port: Option<u16>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VRFLOW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds [default: 10]
    #[arg(long, env = "VRFLOW_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List discovered indoor units
    #[command(alias = "dev", alias = "ls")]
    Devices,

    /// Show gateway catalog information
    Info,

    /// Change the state of one indoor unit
    Set(SetArgs),

    /// Follow live state changes from the push stream
    #[command(alias = "w")]
    Watch,

    /// Manage the configuration file
    Config(ConfigArgs),
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Unit key as shown by `vrflow devices` (e.g. "1_2")
    pub key: String,

    /// Turn the unit on
    #[arg(long, conflicts_with = "off")]
    pub on: bool,

    /// Turn the unit off
    #[arg(long)]
    pub off: bool,

    /// Operating mode
    #[arg(long, short = 'm')]
    pub mode: Option<Mode>,

    /// Target temperature in degrees C (16-30)
    #[arg(long, short = 't')]
    pub temp: Option<u8>,

    /// Fan speed
    #[arg(long, short = 'f')]
    pub fan: Option<FanSpeed>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Cool,
    Dry,
    FanOnly,
    Heat,
}

impl Mode {
    pub fn register(self) -> u8 {
        match self {
            Self::Cool => model::MODE_COOL,
            Self::Dry => model::MODE_DRY,
            Self::FanOnly => model::MODE_FAN_ONLY,
            Self::Heat => model::MODE_HEAT,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FanSpeed {
    Auto,
    High,
    Medium,
    Low,
}

impl FanSpeed {
    pub fn register(self) -> u8 {
        match self {
            Self::Auto => model::FAN_AUTO,
            Self::High => model::FAN_HIGH,
            Self::Medium => model::FAN_MEDIUM,
            Self::Low => model::FAN_LOW,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a starter configuration file
    Init {
        /// Gateway host to seed the default profile with
        host: String,
    },
    /// Print the configuration file path
    Path,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_structure_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn set_parses_mode_and_temp() {
        let cli = Cli::try_parse_from([
            "vrflow", "set", "1_2", "--on", "--mode", "cool", "--temp", "24",
        ])
        .unwrap();
        let Command::Set(args) = cli.command else {
            panic!("expected set command");
        };
        assert_eq!(args.key, "1_2");
        assert!(args.on);
        assert!(matches!(args.mode, Some(Mode::Cool)));
        assert_eq!(args.temp, Some(24));
    }

    #[test]
    fn on_and_off_conflict() {
        assert!(Cli::try_parse_from(["vrflow", "set", "1_2", "--on", "--off"]).is_err());
    }
}
