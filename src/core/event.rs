use serde::{Deserialize, Serialize};
use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;

/// Category of climate event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Fire,
    Temperature,
    Precipitation,
    Vegetation,
    Ice,
}

/// Event severity, ordered least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Satellite instrument that observed the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Modis,
    Viirs,
    Landsat,
    Sentinel,
}

/// Geographic bounding box around an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Event location with its surrounding bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
    pub bounds: GeoBounds,
}

/// Free-form measurement details attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMetadata {
    pub confidence: Option<f64>,
    pub temperature: Option<f64>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub processing_time: Option<DateTime<Utc>>,
}

/// A single observed climate event
///
/// Event records are owned by the archive they were loaded from; the
/// playback machine only ever refers to them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateEvent {
    /// Stable event identifier, e.g. "fire_2024_001"
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// Observation timestamp in UTC
    pub timestamp: DateTime<Utc>,

    /// Event category
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Severity rating
    pub severity: Severity,

    /// Observing instrument
    pub instrument: Instrument,

    /// Where the event was observed
    pub coordinates: Coordinates,

    /// Optional measurement details
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl ClimateEvent {
    /// Check whether the event rates at or above the given severity
    pub fn at_least(&self, severity: Severity) -> bool {
        self.severity >= severity
    }

    /// Calendar year of the observation
    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Get timestamp as Unix timestamp in seconds
    pub fn timestamp_unix(&self) -> f64 {
        self.timestamp.timestamp_millis() as f64 / 1000.0
    }
}

/// Read-only, id-indexed collection of climate events
///
/// Steps reference events by id; consumers resolve those references here.
/// Duplicate ids keep the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<ClimateEvent>,
    by_id: HashMap<String, usize>,
}

impl EventStore {
    /// Build a store from a list of events
    pub fn new(events: Vec<ClimateEvent>) -> Self {
        let mut by_id = HashMap::with_capacity(events.len());
        for (idx, event) in events.iter().enumerate() {
            by_id.entry(event.id.clone()).or_insert(idx);
        }
        Self { events, by_id }
    }

    /// Look up an event by id
    pub fn get(&self, id: &str) -> Option<&ClimateEvent> {
        self.by_id.get(id).and_then(|&idx| self.events.get(idx))
    }

    /// Check whether an event id exists in the store
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of events in the store
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over all events in archive order
    pub fn iter(&self) -> impl Iterator<Item = &ClimateEvent> {
        self.events.iter()
    }

    /// Events of a specific kind, in archive order
    pub fn of_kind(&self, kind: EventKind) -> Vec<&ClimateEvent> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }

    /// Events rated at or above the given severity, in archive order
    pub fn at_least(&self, severity: Severity) -> Vec<&ClimateEvent> {
        self.events.iter().filter(|e| e.at_least(severity)).collect()
    }
}

/// Build a fixed-shape event for tests
#[cfg(test)]
pub(crate) fn sample_event(id: &str, kind: EventKind, severity: Severity, day: u32) -> ClimateEvent {
    use chrono::TimeZone;

    ClimateEvent {
        id: id.to_string(),
        title: format!("Event {}", id),
        timestamp: Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap(),
        kind,
        severity,
        instrument: Instrument::Modis,
        coordinates: Coordinates {
            lat: 34.05,
            lng: -118.24,
            bounds: GeoBounds {
                north: 34.55,
                south: 33.55,
                east: -117.74,
                west: -118.74,
            },
        },
        metadata: EventMetadata::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);

        let event = sample_event("e1", EventKind::Fire, Severity::High, 1);
        assert!(event.at_least(Severity::Medium));
        assert!(event.at_least(Severity::High));
        assert!(!event.at_least(Severity::Critical));
    }

    #[test]
    fn test_event_json_field_names() {
        let event = sample_event("fire_2024_001", EventKind::Fire, Severity::Critical, 15);
        let json = serde_json::to_value(&event).unwrap();

        // the archive format spells the category field "type"
        assert_eq!(json["type"], "fire");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["instrument"], "modis");
        assert_eq!(json["coordinates"]["bounds"]["north"], 34.55);

        let back: ClimateEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_store_lookup_and_filters() {
        let store = EventStore::new(vec![
            sample_event("e1", EventKind::Fire, Severity::High, 1),
            sample_event("e2", EventKind::Ice, Severity::Low, 2),
            sample_event("e3", EventKind::Fire, Severity::Critical, 3),
        ]);

        assert_eq!(store.len(), 3);
        assert!(store.contains("e2"));
        assert!(store.get("e4").is_none());
        assert_eq!(store.get("e3").unwrap().severity, Severity::Critical);
        assert_eq!(store.of_kind(EventKind::Fire).len(), 2);
        assert_eq!(store.at_least(Severity::High).len(), 2);
    }

    #[test]
    fn test_store_duplicate_ids_keep_first() {
        let mut dup = sample_event("e1", EventKind::Ice, Severity::Low, 2);
        dup.title = "duplicate".to_string();
        let store = EventStore::new(vec![
            sample_event("e1", EventKind::Fire, Severity::High, 1),
            dup,
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("e1").unwrap().kind, EventKind::Fire);
    }
}
