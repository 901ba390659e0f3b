use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};

use minew_beacon_etl::batch::{run_reader, BatchReport};
use minew_beacon_etl::config::{DecoderConfig, OutputFormat};
use minew_beacon_etl::models::{Confidence, Reading};
use minew_beacon_etl::tracker::{ChangeFilter, InMemoryStore};
use minew_beacon_etl::utils::{calculate_averages, format_datetime};
use minew_beacon_etl::Decoder;

/// Format an optional measurement for log output
fn show(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{:.2}{}", v, unit))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Write one reading in the configured format
fn emit(reading: &Reading, output: OutputFormat) {
    let json = match output {
        OutputFormat::Json => serde_json::to_string(reading),
        OutputFormat::Ingest => serde_json::to_string(&reading.to_ingest_record()),
        OutputFormat::Log => {
            info!(
                "{} ({}) [{}{}]: temp={} humidity={} battery={} voltage={}",
                reading.device_id.as_deref().unwrap_or("unknown"),
                reading.name.as_deref().unwrap_or("-"),
                reading.frame_kind,
                match reading.confidence {
                    Confidence::Exact => "",
                    Confidence::Heuristic => ", heuristic",
                },
                show(reading.temperature, "°C"),
                show(reading.humidity, "%"),
                reading
                    .battery_percent
                    .map(|b| format!("{}%", b))
                    .unwrap_or_else(|| "n/a".to_string()),
                show(reading.battery_voltage, " V"),
            );
            return;
        }
    };

    match json {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to serialize reading: {}", e),
    }
}

fn log_summary(report: &BatchReport) {
    let summaries = calculate_averages(&report.readings);

    for summary in &summaries {
        info!(
            "Summary for {} ({}):",
            summary.device_id,
            summary.name.as_deref().unwrap_or("unnamed")
        );
        info!("  Latest temperature: {}", show(summary.latest_temperature, "°C"));
        info!("  Latest humidity: {}", show(summary.latest_humidity, "%"));
        info!("  Average temperature: {}", show(summary.mean_temperature, "°C"));
        info!("  Average humidity: {}", show(summary.mean_humidity, "%"));
        info!("  Based on {} samples", summary.samples);
    }

    let hard_faults = report.hard_faults().count();
    info!(
        "Decoded {} readings, {} lines skipped as other beacons, {} faults",
        report.readings.len(),
        report.faults.len() - hard_faults,
        hard_faults
    );

    if report.readings.is_empty() {
        warn!("No Minew readings decoded from this batch!");
    }
}

async fn run(config: DecoderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let decoder = Decoder::from_config(&config);

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &config.input {
        Some(path) => {
            info!("Reading advertisements from {}", path.display());
            Box::new(BufReader::new(File::open(path).await?))
        }
        None => {
            info!("Reading advertisements from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };

    let start_time = OffsetDateTime::now_utc();
    info!("Starting batch at: {}", format_datetime(&start_time));

    let mut changes = ChangeFilter::new(InMemoryStore::new());
    let report = run_reader(&decoder, reader, |reading| {
        if config.only_changes && changes.check(reading.clone()).is_none() {
            debug!(
                "Unchanged reading from {}, not emitted",
                reading.device_id.as_deref().unwrap_or("unknown")
            );
            return;
        }
        emit(reading, config.output);
    })
    .await?;

    info!(
        "Batch complete at: {}",
        format_datetime(&OffsetDateTime::now_utc())
    );
    log_summary(&report);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging, RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match DecoderConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Run the batch or stop on Ctrl+C
    tokio::select! {
        result = run(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => {
                    error!("Fatal error: {}", e);
                    return Err(e);
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Program terminated by user. Exiting gracefully."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    Ok(())
}
