//! Detection event data models.
//!
//! A `DetectionEvent` is one accepted incident in a session's ledger. Events
//! are immutable after insertion; the severity drives both the integrity
//! score deduction and the report's risk classification.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FocusLost,
    NoFace,
    MultipleFaces,
    PhoneDetected,
    BookDetected,
    DeviceDetected,
    LookingAway,
    EyesClosed,
    ProhibitedObject,
}

impl EventType {
    /// The closed universe of event types, in declaration order. Report
    /// consumers rely on every type appearing in `eventsByType`, so this
    /// list must stay in sync with the enum.
    pub const ALL: [EventType; 9] = [
        EventType::FocusLost,
        EventType::NoFace,
        EventType::MultipleFaces,
        EventType::PhoneDetected,
        EventType::BookDetected,
        EventType::DeviceDetected,
        EventType::LookingAway,
        EventType::EyesClosed,
        EventType::ProhibitedObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::FocusLost => "focus_lost",
            EventType::NoFace => "no_face",
            EventType::MultipleFaces => "multiple_faces",
            EventType::PhoneDetected => "phone_detected",
            EventType::BookDetected => "book_detected",
            EventType::DeviceDetected => "device_detected",
            EventType::LookingAway => "looking_away",
            EventType::EyesClosed => "eyes_closed",
            EventType::ProhibitedObject => "prohibited_object",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Integrity score deduction applied per accepted event. This schedule
    /// is part of the report contract and must not drift: high 10,
    /// medium 5, low 2.
    pub fn deduction(&self) -> u32 {
        match self {
            Severity::High => 10,
            Severity::Medium => 5,
            Severity::Low => 2,
        }
    }
}

/// Open map of auxiliary fields attached to an event (face counts, detected
/// object labels, duration spans). Kept as raw JSON values so detector
/// adapters can attach whatever they observed.
pub type EventMetadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "EventMetadata::is_empty")]
    pub metadata: EventMetadata,
}

/// Candidate event handed to the ledger before identity and timestamp
/// defaults are assigned.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: EventType,
    pub severity: Severity,
    pub description: String,
    pub confidence: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: EventMetadata,
}

impl NewEvent {
    pub fn new(event_type: EventType, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            event_type,
            severity,
            description: description.into(),
            confidence: None,
            timestamp: None,
            metadata: EventMetadata::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

pub fn event_type_from_str(value: &str) -> Option<EventType> {
    EventType::ALL
        .iter()
        .copied()
        .find(|t| t.as_str() == value)
}

pub fn severity_from_str(value: &str) -> Option<Severity> {
    match value {
        "low" => Some(Severity::Low),
        "medium" => Some(Severity::Medium),
        "high" => Some(Severity::High),
        _ => None,
    }
}
