//! TrackerPipeline for combining detection with tracking.

use crate::error::Result;
use crate::tracker::{BYTETracker, TrackedObject, TrackerConfig};

use super::DetectionSource;

/// Bundles a detection source with a [`BYTETracker`].
///
/// Detections the source leaves without a correlation id get their index in
/// the frame's detection list, so every output can be traced back.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: BYTETracker,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: TrackerConfig) -> Result<Self> {
        Ok(Self {
            detector,
            tracker: BYTETracker::new(config)?,
        })
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self {
            detector,
            tracker: BYTETracker::default(),
        }
    }

    /// Run detection on one frame and feed the result to the tracker.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> std::result::Result<Vec<TrackedObject>, D::Error> {
        let mut detections = self.detector.detect(input, width, height)?;
        for (idx, det) in detections.iter_mut().enumerate() {
            if det.detection_id.is_none() {
                det.detection_id = Some(idx as i64);
            }
        }
        Ok(self.tracker.update(detections))
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &BYTETracker {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut BYTETracker {
        &mut self.tracker
    }
}
