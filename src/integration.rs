//! Integration module for connecting detection sources and region metadata
//! with the tracker.

mod builder;
mod detector;
mod pipeline;
mod regions;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::TrackerPipeline;
pub use regions::{Region, RegionTracker};
