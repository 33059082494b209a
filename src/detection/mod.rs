pub mod config;
pub mod debouncer;
pub mod mock;
pub mod observation;

pub use config::DetectionConfig;
pub use debouncer::IncidentDebouncer;
pub use mock::MockDetector;
pub use observation::{FaceSignal, FrameObservation, FrameSource, ObjectObservation};
