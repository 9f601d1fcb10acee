//! heatlink — combustion-heating controller telemetry to MQTT bridge.
//!
//! Drives one decode → register → publish cycle per tick: reads a serial
//! telemetry line and an analog pressure voltage, decodes both, and hands
//! the typed values to the core pipeline. A failed decode skips the cycle;
//! the next one starts fresh.

mod config;
mod mqtt;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use heatlink_core::{Pipeline, TelemetryValue};
use heatlink_decoder::{analog, frame};

use config::BridgeConfig;
use mqtt::MqttSink;
use sources::{FileVoltageSource, LineSource, SerialLineSource, VoltageSource};

/// Bridge a combustion-heating controller onto MQTT with hub discovery.
#[derive(Parser)]
#[command(name = "heatlink", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "heatlink.toml")]
    config: PathBuf,

    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = BridgeConfig::load(&cli.config)?;

    let sink = Arc::new(MqttSink::connect(&config.mqtt));
    let mut lines = SerialLineSource::open(&config.serial)
        .with_context(|| format!("failed to open serial port {}", config.serial.port))?;
    let mut voltage_source = FileVoltageSource::new(&config.adc);

    let mut pipeline = Pipeline::new(config.registry_config(), sink);

    info!(
        serial = %config.serial.port,
        adc = %config.adc.value_path,
        "entering bridge loop, ctrl-c to quit"
    );

    let poll_interval = Duration::from_secs(config.bridge.poll_interval_secs);
    let publish_hold = Duration::from_secs(config.bridge.publish_hold_secs);

    loop {
        // The controller state moves slowly; idle longer after a good
        // publication, retry sooner otherwise.
        let pause = match run_cycle(&config, &mut pipeline, &mut lines, &mut voltage_source).await
        {
            Ok(true) => publish_hold,
            Ok(false) => poll_interval,
            Err(e) => {
                error!(error = %e, "cycle failed");
                poll_interval
            }
        };
        if shutdown_or_sleep(pause).await {
            break;
        }
    }

    info!("shutting down");
    Ok(())
}

/// Sleep for `pause`, returning true if ctrl-c arrived meanwhile. A cycle
/// is never interrupted mid-registration; shutdown only lands between
/// cycles.
async fn shutdown_or_sleep(pause: Duration) -> bool {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = tokio::time::sleep(pause) => false,
    }
}

/// One read → decode → register → publish cycle. Returns whether a state
/// publication went out.
async fn run_cycle(
    config: &BridgeConfig,
    pipeline: &mut Pipeline,
    lines: &mut dyn LineSource,
    voltage_source: &mut dyn VoltageSource,
) -> anyhow::Result<bool> {
    let line = tokio::task::block_in_place(|| lines.read_line())?;
    let voltage = tokio::task::block_in_place(|| voltage_source.read_voltage())?;

    let (frame_values, analog_values) = match (frame::decode(&line), analog::decode(voltage)) {
        (Ok(frame_values), Ok(analog_values)) => (frame_values, analog_values),
        (frame_result, analog_result) => {
            warn!(
                serial_valid = frame_result.is_ok(),
                voltage_valid = analog_result.is_ok(),
                line = %line.trim(),
                voltage,
                "skipping cycle after decode failure"
            );
            return Ok(false);
        }
    };

    let mut values = cycle_diagnostics(&line, voltage);
    values.extend(frame_values);
    values.extend(analog_values);

    pipeline
        .run_cycle(
            &config.bridge.system_name,
            &config.bridge.sensor_name,
            &values,
        )
        .await?;
    Ok(true)
}

/// Per-cycle diagnostics published alongside the decoded values.
fn cycle_diagnostics(line: &str, voltage: f64) -> Vec<TelemetryValue> {
    vec![
        TelemetryValue::new("raw_data_serial", line.trim(), "Raw Serial Data")
            .with_category("diagnostic")
            .disabled_by_default(),
        TelemetryValue::new("raw_data_voltage", voltage, "Raw Voltage Data")
            .with_category("diagnostic")
            .with_device_class("voltage")
            .with_unit("V")
            .disabled_by_default(),
        TelemetryValue::new("last_seen", Utc::now().to_rfc3339(), "Last Seen")
            .with_category("diagnostic")
            .with_icon("mdi:clock"),
    ]
}
