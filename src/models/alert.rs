//! Transient UI-facing alerts derived from detection events.
//!
//! Alerts share the id of the event that produced them but are never
//! persisted: they live in an in-memory feed for the duration of a live
//! session and can be dismissed without touching the ledger.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::event::{DetectionEvent, Severity};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Info,
    Warning,
    Critical,
}

impl From<Severity> for AlertKind {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::High => AlertKind::Critical,
            Severity::Medium => AlertKind::Warning,
            Severity::Low => AlertKind::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub persistent: bool,
}

impl Alert {
    pub fn from_event(event: &DetectionEvent) -> Self {
        let mut message = event.event_type.as_str().replace('_', " ");
        if let Some(confidence) = event.confidence {
            message.push_str(&format!(" \u{2022} {}%", (confidence * 100.0).round() as u32));
        }

        Self {
            id: event.id.clone(),
            kind: event.severity.into(),
            title: event.description.clone(),
            message,
            timestamp: event.timestamp,
            duration_ms: Some(5_000),
            persistent: false,
        }
    }
}

/// Newest-first buffer of live alerts.
#[derive(Debug, Default)]
pub struct AlertFeed {
    alerts: Vec<Alert>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alert: Alert) {
        self.alerts.insert(0, alert);
    }

    pub fn dismiss(&mut self, id: &str) {
        self.alerts.retain(|a| a.id != id);
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    /// Drop non-persistent alerts whose display duration has elapsed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.alerts.retain(|a| {
            if a.persistent {
                return true;
            }
            match a.duration_ms {
                Some(ms) => now - a.timestamp < Duration::milliseconds(ms as i64),
                None => true,
            }
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
