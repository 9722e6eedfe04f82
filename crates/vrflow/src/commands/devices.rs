//! Device listing.

use tabled::Tabled;

use vrflow_core::{DeviceRecord, Gateway, fan_name, mode_name};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "GROUP")]
    group: u8,
    #[tabled(rename = "POWER")]
    power: &'static str,
    #[tabled(rename = "MODE")]
    mode: &'static str,
    #[tabled(rename = "FAN")]
    fan: &'static str,
    #[tabled(rename = "SET")]
    set_temp: String,
    #[tabled(rename = "ROOM")]
    room_temp: String,
    #[tabled(rename = "ALARM")]
    alarm: u8,
}

pub fn to_row(record: &DeviceRecord) -> DeviceRow {
    DeviceRow {
        key: record.key(),
        group: record.grp,
        power: if record.is_on() { "on" } else { "off" },
        mode: mode_name(record.mode),
        fan: fan_name(record.fan),
        set_temp: format!("{}°C", record.temp_set),
        room_temp: format!("{}°C", record.temp_in),
        alarm: record.alarm,
    }
}

/// Render device records in the chosen format. Shared with `set`,
/// which prints the record it just changed as a one-row listing.
pub fn render_records(format: &OutputFormat, records: &[DeviceRecord]) -> String {
    match format {
        OutputFormat::Table => {
            let rows: Vec<DeviceRow> = records.iter().map(to_row).collect();
            output::table(&rows)
        }
        OutputFormat::Json => output::json(records, false),
        OutputFormat::JsonCompact => output::json(records, true),
        OutputFormat::Plain => records
            .iter()
            .map(DeviceRecord::key)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = gateway.devices();
    output::print(&render_records(&global.output, &devices), global.quiet);
    Ok(())
}
