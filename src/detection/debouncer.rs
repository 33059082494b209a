//! Per-session incident debouncer.
//!
//! Converts noisy per-frame detector output into discrete incidents.
//! Face absence and gaze-away use wall-clock hysteresis: a timer starts on
//! the first qualifying frame, clears when the condition lifts, and fires
//! exactly once per full threshold of uninterrupted signal (then restarts,
//! so a persisting condition re-fires after another full threshold).
//! Multi-face, eyes-closed and object sightings are stateless and fire on
//! every qualifying frame.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::models::{EventType, NewEvent, Severity};

use super::config::DetectionConfig;
use super::observation::{FaceSignal, FrameObservation, ObjectObservation};

#[derive(Debug)]
pub struct IncidentDebouncer {
    config: DetectionConfig,
    no_face_since: Option<DateTime<Utc>>,
    looking_away_since: Option<DateTime<Utc>>,
}

impl IncidentDebouncer {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            no_face_since: None,
            looking_away_since: None,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Evaluate one frame. Face incidents are emitted before object
    /// incidents (the face pipeline runs first); each incident carries the
    /// frame timestamp and the ledger does not depend on emission order.
    pub fn observe(&mut self, frame: &FrameObservation) -> Vec<NewEvent> {
        let now = frame.timestamp;
        let mut incidents = Vec::new();

        self.observe_face(&frame.face, now, &mut incidents);
        for object in &frame.objects {
            self.observe_object(object, now, &mut incidents);
        }

        incidents
    }

    fn observe_face(&mut self, face: &FaceSignal, now: DateTime<Utc>, out: &mut Vec<NewEvent>) {
        match *face {
            FaceSignal::NoFace => {
                match self.no_face_since {
                    None => self.no_face_since = Some(now),
                    Some(since) => {
                        if elapsed_ms(since, now) > self.config.no_face_threshold_ms {
                            out.push(
                                NewEvent::new(
                                    EventType::NoFace,
                                    Severity::High,
                                    format!(
                                        "No face in frame for >{} seconds",
                                        self.config.no_face_threshold_ms / 1_000
                                    ),
                                )
                                .with_timestamp(now),
                            );
                            self.no_face_since = Some(now);
                        }
                    }
                }
            }
            FaceSignal::OneFace {
                is_looking_at_camera,
                eyes_open,
                confidence,
            } => {
                self.no_face_since = None;

                if is_looking_at_camera {
                    self.looking_away_since = None;
                } else {
                    match self.looking_away_since {
                        None => self.looking_away_since = Some(now),
                        Some(since) => {
                            if elapsed_ms(since, now) > self.config.looking_away_threshold_ms {
                                out.push(
                                    NewEvent::new(
                                        EventType::LookingAway,
                                        Severity::Medium,
                                        format!(
                                            "Candidate looking away from screen for >{} seconds",
                                            self.config.looking_away_threshold_ms / 1_000
                                        ),
                                    )
                                    .with_confidence(confidence)
                                    .with_timestamp(now),
                                );
                                self.looking_away_since = Some(now);
                            }
                        }
                    }
                }

                if !eyes_open && self.config.enable_drowsiness_detection {
                    out.push(
                        NewEvent::new(
                            EventType::EyesClosed,
                            Severity::Low,
                            "Eyes closed detected (possible drowsiness)",
                        )
                        .with_confidence(confidence)
                        .with_timestamp(now),
                    );
                }
            }
            FaceSignal::ManyFaces { count } => {
                // A face is present, so both hysteresis timers clear.
                self.no_face_since = None;
                self.looking_away_since = None;

                out.push(
                    NewEvent::new(
                        EventType::MultipleFaces,
                        Severity::High,
                        format!("Multiple faces detected ({count})"),
                    )
                    .with_timestamp(now)
                    .with_metadata("faceCount", json!(count)),
                );
            }
        }
    }

    fn observe_object(
        &mut self,
        object: &ObjectObservation,
        now: DateTime<Utc>,
        out: &mut Vec<NewEvent>,
    ) {
        let threshold = f64::from(self.config.confidence_threshold) / 100.0;
        if object.confidence < threshold {
            return;
        }

        let Some((event_type, severity, description)) = classify_object(&object.class) else {
            return;
        };

        out.push(
            NewEvent::new(event_type, severity, description)
                .with_confidence(object.confidence)
                .with_timestamp(now)
                .with_metadata("objectClass", json!(object.class)),
        );
    }
}

fn elapsed_ms(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - since).num_milliseconds().max(0) as u64
}

/// Map a detector class name to an incident category by substring match.
fn classify_object(class: &str) -> Option<(EventType, Severity, &'static str)> {
    let class = class.to_lowercase();
    if class.contains("phone") || class.contains("cell") {
        Some((
            EventType::PhoneDetected,
            Severity::Medium,
            "Phone-like object detected",
        ))
    } else if class.contains("book") || class.contains("paper") {
        Some((
            EventType::BookDetected,
            Severity::Low,
            "Book/notes-like object detected",
        ))
    } else if class.contains("laptop") || class.contains("tablet") || class.contains("monitor") {
        Some((
            EventType::DeviceDetected,
            Severity::Medium,
            "Extra electronic device detected",
        ))
    } else {
        None
    }
}
