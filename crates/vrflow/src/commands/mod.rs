//! Command dispatch: bridges CLI args -> core Gateway calls -> output.

pub mod config_cmd;
pub mod devices;
pub mod info;
pub mod set;
pub mod watch;

use vrflow_core::Gateway;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(gateway, global),
        Command::Info => info::handle(gateway, global),
        Command::Set(args) => set::handle(gateway, args, global).await,
        Command::Watch => watch::handle(gateway, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
