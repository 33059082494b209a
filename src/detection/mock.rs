//! Random detector standing in for real camera inference.
//!
//! Emits mostly-nominal frames with rare object sightings and occasional
//! face dropouts, matching the probabilities the demo mode of the original
//! detector stub used. Useful for exercising the full pipeline without a
//! camera or a model.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::observation::{FaceSignal, FrameObservation, FrameSource, ObjectObservation};

pub struct MockDetector {
    remaining_frames: u64,
    frame_interval_ms: i64,
    next_timestamp: DateTime<Utc>,
}

impl MockDetector {
    /// A detector that produces `frames` observations spaced
    /// `frame_interval_ms` apart, starting now.
    pub fn new(frames: u64, frame_interval_ms: i64) -> Self {
        Self {
            remaining_frames: frames,
            frame_interval_ms,
            next_timestamp: Utc::now(),
        }
    }

    fn roll_face(rng: &mut impl Rng) -> FaceSignal {
        let roll: f64 = rng.gen();
        if roll < 0.02 {
            FaceSignal::NoFace
        } else if roll < 0.025 {
            FaceSignal::ManyFaces {
                count: rng.gen_range(2..=3),
            }
        } else if roll < 0.08 {
            FaceSignal::OneFace {
                is_looking_at_camera: false,
                eyes_open: true,
                confidence: 0.5 + rng.gen::<f64>() * 0.4,
            }
        } else {
            FaceSignal::OneFace {
                is_looking_at_camera: true,
                eyes_open: rng.gen::<f64>() > 0.01,
                confidence: 0.9,
            }
        }
    }

    fn roll_objects(rng: &mut impl Rng) -> Vec<ObjectObservation> {
        let roll: f64 = rng.gen();
        let sighting = if roll < 0.002 {
            Some(("cell phone", 0.85 + rng.gen::<f64>() * 0.15))
        } else if roll < 0.004 {
            Some(("book", 0.8 + rng.gen::<f64>() * 0.2))
        } else if roll < 0.005 {
            let devices = ["tablet", "laptop", "monitor"];
            Some((
                devices[rng.gen_range(0..devices.len())],
                0.75 + rng.gen::<f64>() * 0.25,
            ))
        } else {
            None
        };

        sighting
            .map(|(class, confidence)| {
                vec![ObjectObservation {
                    class: class.to_string(),
                    confidence,
                    bbox: [
                        rng.gen_range(0.0..400.0),
                        rng.gen_range(0.0..300.0),
                        120.0,
                        90.0,
                    ],
                }]
            })
            .unwrap_or_default()
    }
}

impl FrameSource for MockDetector {
    fn next_frame(&mut self) -> Result<Option<FrameObservation>> {
        if self.remaining_frames == 0 {
            return Ok(None);
        }
        self.remaining_frames -= 1;

        let timestamp = self.next_timestamp;
        self.next_timestamp = timestamp + Duration::milliseconds(self.frame_interval_ms);

        let mut rng = rand::thread_rng();
        let frame = FrameObservation::at(timestamp, Self::roll_face(&mut rng))
            .with_objects(Self::roll_objects(&mut rng));
        Ok(Some(frame))
    }
}
