//! Utility functions for summarising readings and formatting
use std::collections::BTreeMap;

use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::{DeviceSummary, Reading};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    dt.format(format_description!(
        "[day].[month].[year] - [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| dt.to_string())
}

/// Round to two decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the present values, None if there are none
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(round2(sum / count as f64))
    }
}

/// Calculate per-device averages over a batch of readings
///
/// Readings are grouped by device id; readings without one cannot be
/// attributed and are skipped. "Latest" means last in input order.
///
/// # Arguments
/// * `readings` - Decoded readings in the order they were received
///
/// # Returns
/// One summary per device, ordered by device id
pub fn calculate_averages(readings: &[Reading]) -> Vec<DeviceSummary> {
    let mut by_device: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        if let Some(device_id) = reading.device_id.as_deref() {
            by_device.entry(device_id).or_default().push(reading);
        }
    }

    let aggregated_at = OffsetDateTime::now_utc();

    by_device
        .into_iter()
        .filter_map(|(device_id, data_points)| {
            let latest = data_points.last()?;
            Some(DeviceSummary {
                device_id: device_id.to_string(),
                name: data_points.iter().rev().find_map(|r| r.name.clone()),
                samples: data_points.len(),
                latest_temperature: latest.temperature,
                latest_humidity: latest.humidity,
                mean_temperature: mean(data_points.iter().map(|r| r.temperature)),
                mean_humidity: mean(data_points.iter().map(|r| r.humidity)),
                aggregated_at,
            })
        })
        .collect()
}
