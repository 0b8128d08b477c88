//! Main BYTETracker algorithm implementation.

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::error::Result;
use crate::tracker::arena::{TrackArena, TrackHandle};
use crate::tracker::config::TrackerConfig;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::Rect;
use crate::tracker::strack::{STrack, TrackedObject};
use crate::tracker::track_state::{TrackState, TransitionError};

/// Cost ceiling for low-score detections against still-tracked tracks.
const SECOND_MATCH_THRESH: f32 = 0.5;
/// Cost ceiling for unconfirmed tracks against leftover high-score detections.
const UNCONFIRMED_MATCH_THRESH: f32 = 0.7;
/// Tracked/lost pairs closer than this (1 - IoU) are duplicates.
const DUPLICATE_DIST_THRESH: f32 = 0.15;

/// Multi-object tracker.
///
/// Feed one detection list per frame, in frame order, to [`BYTETracker::update`].
/// Tracks live in a [`TrackArena`]; the tracked and lost pools hold handles.
pub struct BYTETracker {
    arena: TrackArena,
    tracked_stracks: Vec<TrackHandle>,
    lost_stracks: Vec<TrackHandle>,
    frame_id: u64,
    next_track_id: u64,
    config: TrackerConfig,
    max_time_lost: u32,
    kalman_filter: KalmanFilter,
}

impl Default for BYTETracker {
    fn default() -> Self {
        Self::from_valid_config(TrackerConfig::default())
    }
}

impl BYTETracker {
    /// Build a tracker, rejecting an invalid configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: TrackerConfig) -> Self {
        let max_time_lost = config.max_time_lost();
        debug!(
            "BYTETracker: max_time_lost = {max_time_lost}, frame_rate = {}, track_buffer = {}",
            config.frame_rate, config.track_buffer
        );
        Self {
            arena: TrackArena::new(),
            tracked_stracks: Vec::new(),
            lost_stracks: Vec::new(),
            frame_id: 0,
            next_track_id: 1,
            kalman_filter: KalmanFilter::with_config(config.kalman),
            config,
            max_time_lost,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Number of frames processed since construction or the last reset.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn max_time_lost(&self) -> u32 {
        self.max_time_lost
    }

    /// Tracks in the tracked pool, including unconfirmed ones.
    pub fn tracked_tracks(&self) -> impl Iterator<Item = &STrack> + '_ {
        self.arena.resolve(&self.tracked_stracks)
    }

    pub fn lost_tracks(&self) -> impl Iterator<Item = &STrack> + '_ {
        self.arena.resolve(&self.lost_stracks)
    }

    /// Drop every track and restart frame counting.
    ///
    /// Track ids keep increasing across resets.
    pub fn reset(&mut self) {
        self.arena.clear();
        self.tracked_stracks.clear();
        self.lost_stracks.clear();
        self.frame_id = 0;
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_track_id;
        self.next_track_id += 1;
        id
    }

    /// Process one frame of detections and return the tracks to report.
    ///
    /// Confirmed tracked tracks come first, then confirmed lost tracks.
    pub fn update(&mut self, detections: Vec<Detection>) -> Vec<TrackedObject> {
        self.frame_id += 1;
        let frame_id = self.frame_id;

        let mut activated_stracks = Vec::new();
        let mut refind_stracks = Vec::new();
        let mut lost_stracks = Vec::new();
        let mut removed_stracks = Vec::new();

        // Step 1: Build candidate tracks and split them by score
        let candidates: Vec<STrack> = detections.iter().map(STrack::from_detection).collect();

        let mut high = Vec::new();
        let mut low = Vec::new();
        for (i, det) in candidates.iter().enumerate() {
            if det.score >= self.config.track_thresh {
                high.push(i);
            } else if det.score > self.config.low_thresh {
                low.push(i);
            }
        }
        let mut consumed = vec![false; candidates.len()];

        let (unconfirmed, tracked): (Vec<TrackHandle>, Vec<TrackHandle>) = self
            .tracked_stracks
            .iter()
            .partition(|&&h| self.arena.get(h).is_some_and(|t| !t.is_activated()));

        let strack_pool = joint_stracks(&tracked, &self.lost_stracks);

        // Step 2: First association, with high score detections
        for &handle in &strack_pool {
            if let Some(track) = self.arena.get_mut(handle) {
                track.predict(&self.kalman_filter);
            }
        }

        let dists = matching::iou_distance(
            &self.rects(&strack_pool),
            &candidate_rects(&candidates, &high),
        );
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::linear_assignment(&dists, self.config.match_thresh);

        for (itracked, idet) in matches {
            let det = &candidates[high[idet]];
            consumed[high[idet]] = true;
            let iou_score = 1.0 - dists[[itracked, idet]];
            self.associate(
                strack_pool[itracked],
                det,
                iou_score,
                &mut activated_stracks,
                &mut refind_stracks,
            );
        }

        // Step 3: Second association, with low score detections, only
        // against tracks that were still tracked before this frame
        let mut r_tracked_stracks = Vec::new();
        for &idx in &unmatched_tracks {
            let handle = strack_pool[idx];
            let Some(track) = self.arena.get_mut(handle) else {
                continue;
            };
            if track.state() == TrackState::Tracked {
                r_tracked_stracks.push(handle);
            } else {
                track.matched_detection_id = None;
            }
        }

        let dists_second = matching::iou_distance(
            &self.rects(&r_tracked_stracks),
            &candidate_rects(&candidates, &low),
        );
        let AssignmentResult {
            matches: matches_second,
            unmatched_tracks: unmatched_tracks_second,
            ..
        } = matching::linear_assignment(&dists_second, SECOND_MATCH_THRESH);

        for (itracked, idet) in matches_second {
            let det = &candidates[low[idet]];
            consumed[low[idet]] = true;
            let iou_score = 1.0 - dists_second[[itracked, idet]];
            self.associate(
                r_tracked_stracks[itracked],
                det,
                iou_score,
                &mut activated_stracks,
                &mut refind_stracks,
            );
        }

        for idx in unmatched_tracks_second {
            let handle = r_tracked_stracks[idx];
            if let Some(track) = self.arena.get_mut(handle) {
                if track.state() != TrackState::Lost {
                    log_rejected(track.track_id(), track.mark_lost());
                    lost_stracks.push(handle);
                }
            }
        }

        // Deal with unconfirmed tracks, usually tracks with only one beginning frame
        let detections_rem: Vec<usize> = unmatched_detections.iter().map(|&j| high[j]).collect();
        let dists_unconfirmed = matching::iou_distance(
            &self.rects(&unconfirmed),
            &candidate_rects(&candidates, &detections_rem),
        );
        let AssignmentResult {
            matches: matches_unconfirmed,
            unmatched_tracks: unmatched_unconfirmed,
            unmatched_detections: unmatched_new,
        } = matching::linear_assignment(&dists_unconfirmed, UNCONFIRMED_MATCH_THRESH);

        for (itracked, idet) in matches_unconfirmed {
            let handle = unconfirmed[itracked];
            let det = &candidates[detections_rem[idet]];
            consumed[detections_rem[idet]] = true;
            let iou_score = 1.0 - dists_unconfirmed[[itracked, idet]];
            if let Some(track) = self.arena.get_mut(handle) {
                let result = track.update(
                    det,
                    &self.kalman_filter,
                    frame_id,
                    iou_score,
                    self.config.wh_smooth_factor,
                );
                log_rejected(track.track_id(), result);
                activated_stracks.push(handle);
            }
        }
        for idx in unmatched_unconfirmed {
            let handle = unconfirmed[idx];
            if let Some(track) = self.arena.get_mut(handle) {
                log_rejected(track.track_id(), track.mark_removed());
                removed_stracks.push(handle);
            }
        }

        // Step 4: Init new stracks, highest score first
        let mut spawn: Vec<usize> = unmatched_new
            .into_iter()
            .map(|j| detections_rem[j])
            .filter(|&i| candidates[i].score >= self.config.high_thresh)
            .collect();
        spawn.sort_by(|&a, &b| {
            candidates[b]
                .score
                .total_cmp(&candidates[a].score)
                .then(a.cmp(&b))
        });

        for idx in spawn {
            if duplicates_consumed(idx, &candidates, &consumed) {
                trace!("frame {frame_id}: detection {idx} duplicates a consumed detection, not spawning");
                continue;
            }
            let mut track = candidates[idx].clone();
            let track_id = self.next_id();
            log_rejected(track_id, track.activate(&self.kalman_filter, frame_id, track_id));
            consumed[idx] = true;
            debug!("Init new track: {track_id}");
            activated_stracks.push(self.arena.insert(track));
        }

        // Step 5: Update state
        let tracked_stracks = joint_stracks(&activated_stracks, &refind_stracks);

        let mut lost_pool = sub_stracks(&self.lost_stracks, &tracked_stracks);
        lost_pool = joint_stracks(&lost_pool, &lost_stracks);
        lost_pool.retain(|&handle| {
            let Some(track) = self.arena.get_mut(handle) else {
                return false;
            };
            if frame_id.saturating_sub(track.end_frame()) >= u64::from(self.max_time_lost) {
                debug!("Retire lost track: {}", track.track_id());
                log_rejected(track.track_id(), track.mark_removed());
                removed_stracks.push(handle);
                false
            } else {
                true
            }
        });

        let (tracked_stracks, lost_pool) =
            remove_duplicate_stracks(&self.arena, &tracked_stracks, &lost_pool);

        let keep: HashSet<TrackHandle> = tracked_stracks.iter().chain(&lost_pool).copied().collect();
        let dropped: Vec<TrackHandle> = self
            .tracked_stracks
            .iter()
            .chain(&self.lost_stracks)
            .chain(&activated_stracks)
            .chain(&removed_stracks)
            .copied()
            .filter(|h| !keep.contains(h))
            .collect();
        for handle in dropped {
            if let Some(track) = self.arena.remove(handle) {
                if track.state() != TrackState::Removed {
                    debug!("Drop duplicate track: {}", track.track_id());
                }
            }
        }

        self.tracked_stracks = tracked_stracks;
        self.lost_stracks = lost_pool;
        self.log_statistics();

        self.arena
            .resolve(&self.tracked_stracks)
            .chain(self.arena.resolve(&self.lost_stracks))
            .filter(|t| t.is_activated() && t.state() != TrackState::Removed)
            .map(STrack::to_output)
            .collect()
    }

    /// Apply a matched detection: a tracked track is updated, any other is
    /// re-activated under its old identity.
    fn associate(
        &mut self,
        handle: TrackHandle,
        det: &STrack,
        iou_score: f32,
        activated: &mut Vec<TrackHandle>,
        refind: &mut Vec<TrackHandle>,
    ) {
        let Some(track) = self.arena.get_mut(handle) else {
            return;
        };
        if track.state() == TrackState::Tracked {
            let result = track.update(
                det,
                &self.kalman_filter,
                self.frame_id,
                iou_score,
                self.config.wh_smooth_factor,
            );
            log_rejected(track.track_id(), result);
            activated.push(handle);
        } else {
            let result = track.re_activate(det, &self.kalman_filter, self.frame_id, iou_score, None);
            log_rejected(track.track_id(), result);
            refind.push(handle);
        }
    }

    fn rects(&self, handles: &[TrackHandle]) -> Vec<Rect> {
        self.arena.resolve(handles).map(STrack::rect).collect()
    }

    fn log_statistics(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let ids = |handles: &[TrackHandle], confirmed: bool| {
            self.arena
                .resolve(handles)
                .filter(|t| t.is_activated() == confirmed)
                .map(|t| t.track_id())
                .collect::<Vec<_>>()
        };
        trace!(
            "frame {}: tracked {:?}, unconfirmed {:?}, lost {:?}",
            self.frame_id,
            ids(&self.tracked_stracks, true),
            ids(&self.tracked_stracks, false),
            ids(&self.lost_stracks, true),
        );
    }
}

/// Whether a spawn candidate is a near-copy (same criterion as
/// [`remove_duplicate_stracks`]) of a detection that already belongs to a
/// track this frame.
fn duplicates_consumed(idx: usize, candidates: &[STrack], consumed: &[bool]) -> bool {
    let candidate = &candidates[idx].tlwh;
    candidates
        .iter()
        .zip(consumed)
        .enumerate()
        .any(|(j, (other, &used))| {
            j != idx && used && 1.0 - candidate.iou(&other.tlwh) < DUPLICATE_DIST_THRESH
        })
}

fn candidate_rects(candidates: &[STrack], indices: &[usize]) -> Vec<Rect> {
    indices.iter().map(|&i| candidates[i].rect()).collect()
}

fn log_rejected(track_id: u64, result: std::result::Result<(), TransitionError>) {
    if let Err(err) = result {
        warn!("track {track_id}: {err}");
    }
}

/// Union of two handle lists, keeping first-seen order.
pub fn joint_stracks(tlista: &[TrackHandle], tlistb: &[TrackHandle]) -> Vec<TrackHandle> {
    let mut exists = HashSet::new();
    tlista
        .iter()
        .chain(tlistb)
        .copied()
        .filter(|h| exists.insert(*h))
        .collect()
}

/// Handles of `tlista` that are not in `tlistb`.
pub fn sub_stracks(tlista: &[TrackHandle], tlistb: &[TrackHandle]) -> Vec<TrackHandle> {
    let b_ids: HashSet<TrackHandle> = tlistb.iter().copied().collect();
    tlista
        .iter()
        .copied()
        .filter(|h| !b_ids.contains(h))
        .collect()
}

/// Drop one side of every tracked/lost pair that overlaps almost entirely.
///
/// The track observed for longer survives; ties keep the tracked one.
pub fn remove_duplicate_stracks(
    arena: &TrackArena,
    stracksa: &[TrackHandle],
    stracksb: &[TrackHandle],
) -> (Vec<TrackHandle>, Vec<TrackHandle>) {
    let tracks_a: Vec<(TrackHandle, &STrack)> = stracksa
        .iter()
        .filter_map(|&h| arena.get(h).map(|t| (h, t)))
        .collect();
    let tracks_b: Vec<(TrackHandle, &STrack)> = stracksb
        .iter()
        .filter_map(|&h| arena.get(h).map(|t| (h, t)))
        .collect();

    let a_rects: Vec<Rect> = tracks_a.iter().map(|(_, t)| t.rect()).collect();
    let b_rects: Vec<Rect> = tracks_b.iter().map(|(_, t)| t.rect()).collect();
    let pdist = matching::iou_distance(&a_rects, &b_rects);

    let mut dupa = vec![false; tracks_a.len()];
    let mut dupb = vec![false; tracks_b.len()];

    for ((i, j), &dist) in pdist.indexed_iter() {
        if dist < DUPLICATE_DIST_THRESH {
            let time_a = tracks_a[i].1.duration();
            let time_b = tracks_b[j].1.duration();
            if time_a >= time_b {
                dupb[j] = true;
            } else {
                dupa[i] = true;
            }
        }
    }

    let resa = tracks_a
        .iter()
        .zip(&dupa)
        .filter(|(_, dup)| !**dup)
        .map(|((h, _), _)| *h)
        .collect();
    let resb = tracks_b
        .iter()
        .zip(&dupb)
        .filter(|(_, dup)| !**dup)
        .map(|((h, _), _)| *h)
        .collect();

    (resa, resb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, score: f32) -> Detection {
        Detection::new(x, y, x + 50.0, y + 100.0, score)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = TrackerConfig {
            track_thresh: 0.7,
            high_thresh: 0.6,
            ..Default::default()
        };
        assert!(BYTETracker::new(config).is_err());
    }

    #[test]
    fn test_first_frame_tracks_are_confirmed() {
        let mut tracker = BYTETracker::default();
        let out = tracker.update(vec![det(0.0, 0.0, 0.9), det(200.0, 0.0, 0.8)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].track_id, 1);
        assert_eq!(out[1].track_id, 2);
    }

    #[test]
    fn test_later_tracks_need_a_second_match() {
        let mut tracker = BYTETracker::default();
        assert!(tracker.update(vec![]).is_empty());

        assert!(tracker.update(vec![det(0.0, 0.0, 0.9)]).is_empty());
        assert_eq!(tracker.tracked_tracks().count(), 1);
        assert!(!tracker.tracked_tracks().all(STrack::is_activated));

        let out = tracker.update(vec![det(1.0, 0.0, 0.9)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_id, 1);
    }

    #[test]
    fn test_unconfirmed_track_is_removed_when_unmatched() {
        let mut tracker = BYTETracker::default();
        tracker.update(vec![]);
        tracker.update(vec![det(0.0, 0.0, 0.9)]);
        assert!(tracker.update(vec![]).is_empty());
        assert_eq!(tracker.tracked_tracks().count(), 0);
        assert_eq!(tracker.lost_tracks().count(), 0);
    }

    #[test]
    fn test_low_score_detection_extends_track() {
        let mut tracker = BYTETracker::default();
        let first = tracker.update(vec![det(0.0, 0.0, 0.9)]);
        let id = first[0].track_id;

        let out = tracker.update(vec![det(2.0, 0.0, 0.3).with_detection_id(5)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_id, id);
        assert_eq!(out[0].matched_detection_id, Some(5));
        assert_eq!(out[0].state, TrackState::Tracked);
    }

    #[test]
    fn test_low_score_detection_does_not_revive_lost_track() {
        let mut tracker = BYTETracker::default();
        tracker.update(vec![det(0.0, 0.0, 0.9)]);
        tracker.update(vec![]);
        let out = tracker.update(vec![det(0.0, 0.0, 0.3)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].state, TrackState::Lost);
        assert_eq!(out[0].matched_detection_id, None);
    }

    #[test]
    fn test_detections_below_floor_are_ignored() {
        let mut tracker = BYTETracker::default();
        tracker.update(vec![det(0.0, 0.0, 0.9)]);
        let out = tracker.update(vec![det(0.0, 0.0, 0.05)]);
        assert_eq!(out[0].state, TrackState::Lost);
    }

    #[test]
    fn test_only_near_copies_of_consumed_detections_are_duplicates() {
        let candidates: Vec<STrack> = [
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(2.0, 0.0, 100.0, 100.0),
            Rect::new(10.0, 10.0, 20.0, 20.0),
        ]
        .into_iter()
        .map(|r| STrack::new(r, 0.9))
        .collect();
        let consumed = [true, false, false];

        assert!(duplicates_consumed(1, &candidates, &consumed));
        assert!(!duplicates_consumed(2, &candidates, &consumed));
        assert!(!duplicates_consumed(1, &candidates, &[false, false, false]));
    }

    #[test]
    fn test_frame_counter_passes_u32_range() {
        let mut tracker = BYTETracker::default();
        tracker.frame_id = u64::from(u32::MAX);
        tracker.update(vec![det(0.0, 0.0, 0.9)]);
        assert_eq!(tracker.frame_id(), u64::from(u32::MAX) + 1);

        let out = tracker.update(vec![det(0.0, 0.0, 0.9)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].track_id, 1);
    }

    #[test]
    fn test_joint_and_sub_stracks() {
        let mut arena = TrackArena::new();
        let handles: Vec<TrackHandle> = (0..4)
            .map(|_| arena.insert(STrack::new(Rect::default(), 0.5)))
            .collect();
        let joined = joint_stracks(&handles[0..3], &handles[1..4]);
        assert_eq!(joined, handles);
        let diff = sub_stracks(&handles, &handles[1..3]);
        assert_eq!(diff, vec![handles[0], handles[3]]);
    }

    #[test]
    fn test_remove_duplicate_keeps_longer_track() {
        let kf = KalmanFilter::new();
        let mut arena = TrackArena::new();

        let mut older = STrack::new(Rect::new(0.0, 0.0, 50.0, 100.0), 0.9);
        older.activate(&kf, 1, 1).unwrap();
        let same = STrack::new(Rect::new(1.0, 0.0, 50.0, 100.0), 0.9);
        older.update(&same, &kf, 5, 1.0, 0.9).unwrap();
        older.mark_lost().unwrap();

        let mut younger = STrack::new(Rect::new(1.0, 0.0, 50.0, 100.0), 0.9);
        younger.activate(&kf, 5, 2).unwrap();

        let a = arena.insert(younger);
        let b = arena.insert(older);
        let (tracked, lost) = remove_duplicate_stracks(&arena, &[a], &[b]);
        assert!(tracked.is_empty());
        assert_eq!(lost, vec![b]);
    }

    #[test]
    fn test_remove_duplicate_tie_keeps_tracked() {
        let kf = KalmanFilter::new();
        let mut arena = TrackArena::new();
        let mut a = STrack::new(Rect::new(0.0, 0.0, 50.0, 100.0), 0.9);
        a.activate(&kf, 3, 1).unwrap();
        let mut b = STrack::new(Rect::new(0.0, 0.0, 50.0, 100.0), 0.9);
        b.activate(&kf, 3, 2).unwrap();
        b.mark_lost().unwrap();

        let ha = arena.insert(a);
        let hb = arena.insert(b);
        let (tracked, lost) = remove_duplicate_stracks(&arena, &[ha], &[hb]);
        assert_eq!(tracked, vec![ha]);
        assert!(lost.is_empty());
    }

    #[test]
    fn test_reset_keeps_ids_unique() {
        let mut tracker = BYTETracker::default();
        let first = tracker.update(vec![det(0.0, 0.0, 0.9)]);
        tracker.reset();
        assert_eq!(tracker.frame_id(), 0);
        assert_eq!(tracker.tracked_tracks().count(), 0);
        let second = tracker.update(vec![det(0.0, 0.0, 0.9)]);
        assert_ne!(first[0].track_id, second[0].track_id);
    }
}
