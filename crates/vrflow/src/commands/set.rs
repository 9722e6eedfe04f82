//! Unit control commands.

use vrflow_core::Gateway;

use crate::cli::{GlobalOpts, SetArgs};
use crate::error::CliError;
use crate::output;

use super::devices;

pub async fn handle(gateway: &Gateway, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let on = if args.on {
        Some(true)
    } else if args.off {
        Some(false)
    } else {
        None
    };

    if on.is_none() && args.mode.is_none() && args.temp.is_none() && args.fan.is_none() {
        return Err(CliError::Validation {
            field: "set".into(),
            reason: "nothing to change; pass --on/--off, --mode, --temp, or --fan".into(),
        });
    }

    let record = gateway
        .set_unit(
            &args.key,
            on,
            args.mode.map(crate::cli::Mode::register),
            args.temp,
            args.fan.map(crate::cli::FanSpeed::register),
        )
        .await?;

    let rendered = devices::render_records(&global.output, std::slice::from_ref(&record));
    output::print(&rendered, global.quiet);
    Ok(())
}
