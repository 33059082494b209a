pub mod alert;
pub mod event;
pub mod session;

pub use alert::{Alert, AlertFeed, AlertKind};
pub use event::{
    event_type_from_str, severity_from_str, DetectionEvent, EventMetadata, EventType, NewEvent,
    Severity,
};
pub use session::{Session, SessionStatus, INITIAL_INTEGRITY_SCORE};
