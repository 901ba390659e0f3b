//! Change detection for readings, keyed by device id
use std::collections::HashMap;

use crate::models::Reading;

/// Last-seen reading per device
pub trait ReadingStore {
    fn last(&self, device_id: &str) -> Option<&Reading>;
    fn remember(&mut self, reading: Reading);
}

/// HashMap-backed store, enough for a single process
#[derive(Debug, Default)]
pub struct InMemoryStore {
    last_seen: HashMap<String, Reading>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

impl ReadingStore for InMemoryStore {
    fn last(&self, device_id: &str) -> Option<&Reading> {
        self.last_seen.get(device_id)
    }

    fn remember(&mut self, reading: Reading) {
        if let Some(device_id) = reading.device_id.clone() {
            self.last_seen.insert(device_id, reading);
        }
    }
}

/// True when temperature or humidity differ from the previous reading
///
/// A device seen for the first time always counts as changed.
pub fn has_changed(old: Option<&Reading>, new: &Reading) -> bool {
    match old {
        None => true,
        Some(old) => old.temperature != new.temperature || old.humidity != new.humidity,
    }
}

/// Passes through only readings that changed since the last one per device
#[derive(Debug, Default)]
pub struct ChangeFilter<S: ReadingStore> {
    store: S,
}

impl<S: ReadingStore> ChangeFilter<S> {
    pub fn new(store: S) -> Self {
        ChangeFilter { store }
    }

    /// Record `reading` and return it if it differs from the stored one
    ///
    /// Readings without a device id cannot be compared and are always kept.
    pub fn check(&mut self, reading: Reading) -> Option<Reading> {
        let Some(device_id) = reading.device_id.clone() else {
            return Some(reading);
        };

        if has_changed(self.store.last(&device_id), &reading) {
            self.store.remember(reading.clone());
            Some(reading)
        } else {
            None
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, FrameKind};
    use time::OffsetDateTime;

    fn reading(device_id: Option<&str>, temperature: f64, humidity: f64) -> Reading {
        Reading {
            temperature: Some(temperature),
            humidity: Some(humidity),
            battery_percent: None,
            battery_voltage: None,
            device_id: device_id.map(str::to_string),
            name: None,
            frame_kind: FrameKind::ConnectV3PlainTempHumidity,
            confidence: Confidence::Exact,
            source_hex: String::new(),
            received_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_has_changed() {
        let old = reading(Some("a/2"), 21.0, 40.0);
        assert!(has_changed(None, &old));
        assert!(!has_changed(Some(&old), &reading(Some("a/2"), 21.0, 40.0)));
        assert!(has_changed(Some(&old), &reading(Some("a/2"), 21.5, 40.0)));
        assert!(has_changed(Some(&old), &reading(Some("a/2"), 21.0, 41.0)));
    }

    #[test]
    fn test_filter_drops_repeats_per_device() {
        let mut filter = ChangeFilter::new(InMemoryStore::new());

        assert!(filter.check(reading(Some("a/2"), 21.0, 40.0)).is_some());
        assert!(filter.check(reading(Some("a/2"), 21.0, 40.0)).is_none());
        assert!(filter.check(reading(Some("b/2"), 21.0, 40.0)).is_some());
        assert!(filter.check(reading(Some("a/2"), 22.0, 40.0)).is_some());
        assert!(filter.check(reading(Some("a/2"), 22.0, 40.0)).is_none());

        assert_eq!(filter.store().len(), 2);
        assert_eq!(
            filter.store().last("a/2").and_then(|r| r.temperature),
            Some(22.0)
        );
    }

    #[test]
    fn test_readings_without_device_id_always_pass() {
        let mut filter = ChangeFilter::new(InMemoryStore::new());
        assert!(filter.check(reading(None, 21.0, 40.0)).is_some());
        assert!(filter.check(reading(None, 21.0, 40.0)).is_some());
        assert!(filter.store().is_empty());
    }

    #[test]
    fn test_custom_store() {
        // Store that remembers nothing: every reading is new
        struct Forgetful;
        impl ReadingStore for Forgetful {
            fn last(&self, _: &str) -> Option<&Reading> {
                None
            }
            fn remember(&mut self, _: Reading) {}
        }

        let mut filter = ChangeFilter::new(Forgetful);
        assert!(filter.check(reading(Some("a/2"), 1.0, 1.0)).is_some());
        assert!(filter.check(reading(Some("a/2"), 1.0, 1.0)).is_some());
    }
}
