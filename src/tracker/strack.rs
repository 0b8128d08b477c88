//! Single object track (STrack) for multi-object tracking.

use log::warn;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::{TrackState, TransitionError};

/// Single object track.
///
/// Lifecycle fields (`track_id`, `state`, confirmation and frame bookkeeping)
/// only change through the transition methods.
#[derive(Debug, Clone)]
pub struct STrack {
    track_id: u64,
    state: TrackState,
    is_activated: bool,
    frame_id: u64,
    start_frame: u64,
    mean: Option<Array1<f64>>,
    covariance: Option<Array2<f64>>,
    /// Confidence of the detection matched this frame, 0 while lost
    pub score: f32,
    /// Class label of the last matched detection
    pub label: i32,
    /// Number of consecutive updates since (re)activation
    pub tracklet_len: u32,
    /// Last observed detection bounding box (TLWH format)
    pub tlwh: Rect,
    /// Low-pass filtered (width, height)
    pub smoothed_wh: [f32; 2],
    /// Correlation id of the detection matched this frame
    pub matched_detection_id: Option<i64>,
    /// IoU with the detection matched this frame
    pub iou_score: f32,
}

impl STrack {
    /// Create a new STrack from a detection box.
    pub fn new(tlwh: Rect, score: f32) -> Self {
        Self {
            track_id: 0,
            state: TrackState::New,
            is_activated: false,
            frame_id: 0,
            start_frame: 0,
            mean: None,
            covariance: None,
            score,
            label: 0,
            tracklet_len: 0,
            tlwh,
            smoothed_wh: [tlwh.width, tlwh.height],
            matched_detection_id: None,
            iou_score: 0.0,
        }
    }

    pub fn from_detection(det: &Detection) -> Self {
        let mut track = Self::new(det.bbox, det.score);
        track.label = det.label;
        track.matched_detection_id = det.detection_id;
        track
    }

    /// Identity assigned on activation; 0 before that.
    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Whether the track has been confirmed.
    pub fn is_activated(&self) -> bool {
        self.is_activated
    }

    /// Last frame this track was matched (or created).
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn end_frame(&self) -> u64 {
        self.frame_id
    }

    /// Observed duration, `frame_id - start_frame`.
    pub fn duration(&self) -> u64 {
        self.frame_id.saturating_sub(self.start_frame)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn covariance(&self) -> Option<&Array2<f64>> {
        self.covariance.as_ref()
    }

    /// Get the current bounding box in TLWH format.
    ///
    /// Uses the Kalman state when there is one, the raw detection otherwise.
    pub fn rect(&self) -> Rect {
        match &self.mean {
            Some(mean) => {
                let cx = mean[0] as f32;
                let cy = mean[1] as f32;
                let aspect = mean[2] as f32;
                let h = mean[3] as f32;
                Rect::from_xyah(cx, cy, aspect, h)
            }
            None => self.tlwh,
        }
    }

    pub fn tlbr(&self) -> [f32; 4] {
        self.rect().to_tlbr()
    }

    /// Filtered box center with the smoothed size.
    pub fn smoothed_rect(&self) -> Rect {
        let [x1, y1, x2, y2] = self.tlbr();
        Rect::from_center(
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0,
            self.smoothed_wh[0],
            self.smoothed_wh[1],
        )
    }

    /// Start a new tracklet under `track_id`.
    ///
    /// Tracks born on the first frame are confirmed immediately; later ones
    /// stay unconfirmed until they are matched again.
    pub fn activate(
        &mut self,
        kalman_filter: &KalmanFilter,
        frame_id: u64,
        track_id: u64,
    ) -> Result<(), TransitionError> {
        self.state = self.state.transition(TrackState::Tracked)?;
        self.track_id = track_id;

        let (mean, covariance) = kalman_filter.initiate(self.tlwh.to_xyah_f64());
        self.mean = Some(mean);
        self.covariance = Some(covariance);
        self.tracklet_len = 0;
        self.is_activated = frame_id == 1;
        self.frame_id = frame_id;
        self.start_frame = frame_id;
        Ok(())
    }

    /// Resume a track that was not actively tracked.
    ///
    /// Keeps the identity unless `new_id` is given. The smoothed size is
    /// re-seeded from the detection.
    pub fn re_activate(
        &mut self,
        new_track: &STrack,
        kalman_filter: &KalmanFilter,
        frame_id: u64,
        iou_score: f32,
        new_id: Option<u64>,
    ) -> Result<(), TransitionError> {
        self.state = self.state.transition(TrackState::Tracked)?;
        self.correct(kalman_filter, &new_track.tlwh);

        self.tlwh = new_track.tlwh;
        self.smoothed_wh = [new_track.tlwh.width, new_track.tlwh.height];
        self.tracklet_len = 0;
        self.is_activated = true;
        self.frame_id = frame_id;
        self.absorb(new_track, iou_score);

        if let Some(track_id) = new_id {
            self.track_id = track_id;
        }
        Ok(())
    }

    /// Fold a matched detection into the track.
    pub fn update(
        &mut self,
        new_track: &STrack,
        kalman_filter: &KalmanFilter,
        frame_id: u64,
        iou_score: f32,
        wh_smooth_factor: f32,
    ) -> Result<(), TransitionError> {
        self.state = self.state.transition(TrackState::Tracked)?;
        self.frame_id = frame_id;
        self.tracklet_len += 1;

        self.correct(kalman_filter, &new_track.tlwh);
        self.tlwh = new_track.tlwh;

        let observed = [new_track.tlwh.width, new_track.tlwh.height];
        for (smoothed, observed) in self.smoothed_wh.iter_mut().zip(observed) {
            *smoothed = wh_smooth_factor * *smoothed + (1.0 - wh_smooth_factor) * observed;
        }

        self.is_activated = true;
        self.absorb(new_track, iou_score);
        Ok(())
    }

    fn absorb(&mut self, det: &STrack, iou_score: f32) {
        self.score = det.score;
        self.label = det.label;
        self.matched_detection_id = det.matched_detection_id;
        self.iou_score = iou_score;
    }

    /// Kalman correction; a degenerate update leaves the prior state in place.
    fn correct(&mut self, kalman_filter: &KalmanFilter, observed: &Rect) {
        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            match kalman_filter.update(mean, cov, observed.to_xyah_f64()) {
                Ok((new_mean, new_cov)) => {
                    self.mean = Some(new_mean);
                    self.covariance = Some(new_cov);
                }
                Err(err) => warn!("track {}: skipping Kalman correction: {err}", self.track_id),
            }
        }
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if let (Some(mean), Some(cov)) = (&self.mean, &self.covariance) {
            let mut mean_to_predict = mean.clone();
            if self.state != TrackState::Tracked {
                mean_to_predict[7] = 0.0;
            }
            let (new_mean, new_cov) = kalman_filter.predict(&mean_to_predict, cov);
            self.mean = Some(new_mean);
            self.covariance = Some(new_cov);
        }
    }

    pub fn mark_lost(&mut self) -> Result<(), TransitionError> {
        self.state = self.state.transition(TrackState::Lost)?;
        self.score = 0.0;
        self.matched_detection_id = None;
        self.iou_score = 0.0;
        Ok(())
    }

    pub fn mark_removed(&mut self) -> Result<(), TransitionError> {
        self.state = self.state.transition(TrackState::Removed)?;
        self.matched_detection_id = None;
        Ok(())
    }

    /// Output record for this track.
    pub fn to_output(&self) -> TrackedObject {
        TrackedObject {
            track_id: self.track_id,
            rect: self.smoothed_rect(),
            matched_detection_id: self.matched_detection_id,
            label: self.label,
            score: self.score,
            state: self.state,
        }
    }
}

/// Per-frame tracker output for one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub track_id: u64,
    /// Smoothed geometry (TLWH)
    pub rect: Rect,
    /// Detection matched this frame, `None` while the track is carried lost
    pub matched_detection_id: Option<i64>,
    pub label: i32,
    pub score: f32,
    pub state: TrackState,
}
