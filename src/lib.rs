//! # bytetrack-objtracker
//!
//! ByteTrack multi-object tracker core. Once per frame the tracker receives
//! identity-less detections (box, confidence, label, caller correlation id)
//! and returns tracks with stable ids and smoothed geometry.
//!
//! ## Example
//!
//! ```rust
//! use bytetrack_objtracker::{BYTETracker, Detection, TrackerConfig};
//!
//! let mut tracker = BYTETracker::new(TrackerConfig::default()).unwrap();
//! let tracks = tracker.update(vec![
//!     Detection::new(100.0, 100.0, 200.0, 200.0, 0.9).with_detection_id(0),
//! ]);
//! assert_eq!(tracks.len(), 1);
//! assert_eq!(tracks[0].matched_detection_id, Some(0));
//! ```

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use integration::{
    DetectionBuilder, DetectionSource, IntoDetections, Region, RegionTracker, TrackerPipeline,
};
pub use tracker::{
    BYTETracker, Detection, KalmanConfig, Rect, STrack, TrackState, TrackedObject, TrackerConfig,
};
