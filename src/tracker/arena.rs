//! Handle-addressed storage for the tracker's tracks.
//!
//! The tracked and lost pools hold [`TrackHandle`]s into one [`TrackArena`],
//! so moving a track between pools never copies it and a handle can only
//! name the single live track stored under it.

use crate::tracker::strack::STrack;

/// Stable handle of a track stored in a [`TrackArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackHandle(usize);

#[derive(Debug, Clone, Default)]
pub struct TrackArena {
    slots: Vec<Option<STrack>>,
    free: Vec<usize>,
}

impl TrackArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track: STrack) -> TrackHandle {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(track);
                TrackHandle(idx)
            }
            None => {
                self.slots.push(Some(track));
                TrackHandle(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, handle: TrackHandle) -> Option<&STrack> {
        self.slots.get(handle.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, handle: TrackHandle) -> Option<&mut STrack> {
        self.slots.get_mut(handle.0).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, handle: TrackHandle) -> Option<STrack> {
        let track = self.slots.get_mut(handle.0)?.take()?;
        self.free.push(handle.0);
        Some(track)
    }

    /// Resolve handles, skipping any that no longer name a track.
    pub fn resolve<'a>(
        &'a self,
        handles: &'a [TrackHandle],
    ) -> impl Iterator<Item = &'a STrack> + 'a {
        handles.iter().filter_map(|&h| self.get(h))
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::rect::Rect;

    fn track(score: f32) -> STrack {
        STrack::new(Rect::new(0.0, 0.0, 1.0, 1.0), score)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut arena = TrackArena::new();
        let a = arena.insert(track(0.1));
        let b = arena.insert(track(0.2));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(b).map(|t| t.score), Some(0.2));

        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.score, 0.1);
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut arena = TrackArena::new();
        let a = arena.insert(track(0.1));
        arena.remove(a);
        let b = arena.insert(track(0.3));
        assert_eq!(a, b);
        assert_eq!(arena.get(b).map(|t| t.score), Some(0.3));
    }

    #[test]
    fn test_resolve_skips_stale_handles() {
        let mut arena = TrackArena::new();
        let a = arena.insert(track(0.1));
        let b = arena.insert(track(0.2));
        arena.remove(a);
        let scores: Vec<f32> = arena.resolve(&[a, b]).map(|t| t.score).collect();
        assert_eq!(scores, vec![0.2]);
    }
}
