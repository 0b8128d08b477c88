mod arena;
mod byte_tracker;
mod config;
mod kalman_filter;
pub mod lap;
mod matching;
mod rect;
mod strack;
mod track_state;

pub use arena::{TrackArena, TrackHandle};
pub use byte_tracker::{BYTETracker, joint_stracks, remove_duplicate_stracks, sub_stracks};
pub use config::TrackerConfig;
pub use kalman_filter::{KalmanConfig, KalmanError, KalmanFilter};
pub use matching::{AssignmentResult, Detection, iou_distance, linear_assignment};
pub use rect::{Rect, iou_batch, max_overlap_over_self};
pub use strack::{STrack, TrackedObject};
pub use track_state::{TrackState, TransitionError};
