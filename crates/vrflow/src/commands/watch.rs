//! Live state following.
//!
//! Subscribes to the gateway's update stream and prints one line per
//! state change until interrupted. Updates cross a thread boundary on
//! the way here, so a per-unit version gate filters out any that
//! arrive stale.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::warn;

use vrflow_core::{DeviceRecord, Gateway, VersionGate, fan_name, mode_name};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    if !global.quiet {
        eprintln!("Watching for updates (Ctrl-C to stop)...");
    }

    let gates: Mutex<HashMap<String, VersionGate>> = Mutex::new(HashMap::new());
    let quiet = global.quiet;
    let subscription = gateway.subscribe(move |record| {
        let fresh = gates
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(record.key())
            .or_default()
            .admit(record.version);
        if fresh {
            print_update(record);
        }
        Ok(())
    });

    // Surface push-stream connectivity changes alongside the data.
    let mut connectivity = gateway.connectivity();
    let connectivity_task = tokio::spawn(async move {
        loop {
            if connectivity.changed().await.is_err() {
                return;
            }
            let connected = *connectivity.borrow_and_update();
            if !quiet {
                if connected {
                    eprintln!("push stream connected");
                } else {
                    eprintln!("push stream disconnected, retrying...");
                }
            }
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to wait for interrupt signal");
    }

    connectivity_task.abort();
    gateway.unsubscribe(subscription);
    Ok(())
}

fn print_update(record: &DeviceRecord) {
    println!(
        "{}  power={} mode={} fan={} set={}°C room={}°C alarm={}",
        record.key(),
        if record.is_on() { "on" } else { "off" },
        mode_name(record.mode),
        fan_name(record.fan),
        record.temp_set,
        record.temp_in,
        record.alarm,
    );
}
