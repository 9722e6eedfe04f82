//! Gateway catalog information.

use vrflow_core::Gateway;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let Some(info) = gateway.gateway_info() else {
        return Err(CliError::Internal("gateway catalog not loaded".into()));
    };

    let units = gateway.devices().len();
    let rendered = match global.output {
        OutputFormat::Table => format!(
            "Manufacturer: {}\n\
             Model:        {}\n\
             Gateway ID:   {}\n\
             Firmware:     {}\n\
             Units:        {}",
            info.manufacturer, info.model, info.model_id, info.sw_version, units
        ),
        OutputFormat::Json => output::json(&info, false),
        OutputFormat::JsonCompact => output::json(&info, true),
        OutputFormat::Plain => info.model.clone(),
    };
    output::print(&rendered, global.quiet);
    Ok(())
}
