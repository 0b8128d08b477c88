//! Re-association of tracker output with caller-side region metadata.

use crate::error::Result;
use crate::tracker::{BYTETracker, Rect, TrackedObject, TrackerConfig};

use super::DetectionBuilder;

/// One detected region of a frame together with opaque caller metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Region<M> {
    pub rect: Rect,
    /// Detection confidence in percent
    pub confidence: f64,
    pub label: i32,
    pub meta: M,
}

/// Tracker front-end that carries metadata through the tracker by
/// correlation id.
///
/// Each region becomes a detection whose id is its position in the frame.
/// Emitted tracks are joined back to the metadata of the region they matched;
/// tracks carried without a detection this frame have nothing to attach to
/// and are left out.
pub struct RegionTracker<M> {
    tracker: BYTETracker,
    _meta: std::marker::PhantomData<M>,
}

impl<M> RegionTracker<M> {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Ok(Self {
            tracker: BYTETracker::new(config)?,
            _meta: std::marker::PhantomData,
        })
    }

    pub fn tracker(&self) -> &BYTETracker {
        &self.tracker
    }

    /// Track one frame of regions.
    pub fn process(&mut self, regions: Vec<Region<M>>) -> Vec<(TrackedObject, M)> {
        let detections = regions
            .iter()
            .enumerate()
            .map(|(idx, region)| {
                let [x, y, w, h] = region.rect.to_tlwh();
                DetectionBuilder::new()
                    .tlwh(x, y, w, h)
                    .confidence_percent(region.confidence)
                    .label(region.label)
                    .detection_id(idx as i64)
                    .build()
            })
            .collect();

        let mut metas: Vec<Option<M>> = regions.into_iter().map(|r| Some(r.meta)).collect();

        self.tracker
            .update(detections)
            .into_iter()
            .filter_map(|track| {
                let idx = usize::try_from(track.matched_detection_id?).ok()?;
                let meta = metas.get_mut(idx)?.take()?;
                Some((track, meta))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: f32, confidence: f64, meta: &'static str) -> Region<&'static str> {
        Region {
            rect: Rect::new(x, 50.0, 40.0, 80.0),
            confidence,
            label: 1,
            meta,
        }
    }

    #[test]
    fn test_metadata_follows_tracks() {
        let mut tracker = RegionTracker::new(TrackerConfig::default()).unwrap();
        let out = tracker.process(vec![region(0.0, 90.0, "left"), region(300.0, 90.0, "right")]);
        assert_eq!(out.len(), 2);
        let left_id = out.iter().find(|(_, m)| *m == "left").map(|(t, _)| t.track_id);

        // Same objects, reversed order in the frame.
        let out = tracker.process(vec![region(302.0, 90.0, "right"), region(2.0, 90.0, "left")]);
        assert_eq!(out.len(), 2);
        let left_again = out.iter().find(|(_, m)| *m == "left").map(|(t, _)| t.track_id);
        assert_eq!(left_id, left_again);
    }

    #[test]
    fn test_tracks_without_detection_are_skipped() {
        let mut tracker = RegionTracker::new(TrackerConfig::default()).unwrap();
        assert_eq!(tracker.process(vec![region(0.0, 90.0, "a")]).len(), 1);
        assert!(tracker.process(vec![]).is_empty());
        assert_eq!(tracker.tracker().lost_tracks().count(), 1);
    }

    #[test]
    fn test_percent_confidence_is_scaled() {
        let mut tracker = RegionTracker::new(TrackerConfig::default()).unwrap();
        // 55% is between track-thresh and high-thresh: never spawns.
        assert!(tracker.process(vec![region(0.0, 55.0, "weak")]).is_empty());
        assert_eq!(tracker.tracker().tracked_tracks().count(), 0);
    }
}
