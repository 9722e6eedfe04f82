//! Small shared output helpers.
//!
//! Each command owns its own `--output` dispatch; this module only
//! provides the table and JSON building blocks plus quiet-aware
//! printing.

use std::io::{self, Write};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

pub fn table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn json<T: Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let result = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    result.unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Print to stdout unless quiet or empty.
pub fn print(rendered: &str, quiet: bool) {
    if quiet || rendered.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{rendered}");
}
