//! Detector adapter contract.
//!
//! Detectors are interchangeable external capabilities; the engine assumes
//! nothing about them beyond the per-frame observation shape below. A
//! detector that fails on a frame degrades to "nothing observed" upstream,
//! it never aborts session bookkeeping.

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Face pipeline outcome for one frame, as a discriminated result rather
/// than a callback per case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceSignal {
    NoFace,
    OneFace {
        is_looking_at_camera: bool,
        eyes_open: bool,
        confidence: f64,
    },
    ManyFaces {
        count: u32,
    },
}

/// One labeled object box from the object detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectObservation {
    pub class: String,
    pub confidence: f64,
    pub bbox: [f64; 4],
}

/// Everything the detectors reported for a single video frame.
#[derive(Debug, Clone)]
pub struct FrameObservation {
    pub timestamp: DateTime<Utc>,
    pub face: FaceSignal,
    pub objects: Vec<ObjectObservation>,
}

impl FrameObservation {
    pub fn at(timestamp: DateTime<Utc>, face: FaceSignal) -> Self {
        Self {
            timestamp,
            face,
            objects: Vec::new(),
        }
    }

    pub fn with_objects(mut self, objects: Vec<ObjectObservation>) -> Self {
        self.objects = objects;
        self
    }
}

/// Source of per-frame observations driving a monitored session.
///
/// `next_frame` returns `Ok(None)` when the stream is exhausted (camera
/// released, demo finished). Errors are per-frame detector failures; the
/// monitor loop logs them and keeps going.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<FrameObservation>>;
}
