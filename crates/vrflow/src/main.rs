mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vrflow_core::Gateway;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a gateway connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Everything else connects first
        cmd => {
            let gateway_config = config::build_gateway_config(&cli.global)?;
            let gateway = Gateway::new(gateway_config)?;

            gateway.connect().await?;
            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &gateway, &cli.global).await;
            gateway.shutdown().await;
            result
        }
    }
}
