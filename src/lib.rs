//! vigil: session integrity monitoring engine for remote interview
//! proctoring.
//!
//! The engine ingests per-frame detector observations, debounces them into
//! discrete incidents, maintains a bounded integrity score per session,
//! and builds deterministic end-of-session reports. Detectors, rendering,
//! and the HTTP surface are external collaborators; this crate owns the
//! aggregation state machine and its persistence.

pub mod db;
pub mod detection;
pub mod error;
pub mod models;
pub mod proctor;
pub mod report;
pub mod settings;

pub use db::{Database, EventOrder};
pub use detection::{
    DetectionConfig, FaceSignal, FrameObservation, FrameSource, IncidentDebouncer, MockDetector,
    ObjectObservation,
};
pub use error::VigilError;
pub use models::{
    Alert, AlertFeed, AlertKind, DetectionEvent, EventMetadata, EventType, NewEvent, Session,
    SessionStatus, Severity, INITIAL_INTEGRITY_SCORE,
};
pub use proctor::{ProctorMonitor, SessionController};
pub use report::{build_report, SessionReport};
pub use settings::SettingsStore;
