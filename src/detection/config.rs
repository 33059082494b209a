use serde::{Deserialize, Serialize};

/// Tunable thresholds consumed by the incident debouncer.
///
/// Durations are wall-clock milliseconds; the detection loop is not
/// tick-rate bounded, so frame counts must never stand in for time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Minimum object-detector confidence, in percent (0-100). Objects
    /// below this are ignored.
    pub confidence_threshold: u32,

    /// When off, eyes-closed frames produce no incidents.
    pub enable_drowsiness_detection: bool,

    /// Continuous face absence longer than this fires one no_face incident.
    pub no_face_threshold_ms: u64,

    /// Continuous gaze-away longer than this fires one looking_away incident.
    pub looking_away_threshold_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 50,
            enable_drowsiness_detection: true,
            no_face_threshold_ms: 10_000,
            looking_away_threshold_ms: 5_000,
        }
    }
}
