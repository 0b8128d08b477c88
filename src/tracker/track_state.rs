use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Track state enumeration for object tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackState {
    /// Built from a detection, no identity yet
    #[default]
    New,
    /// Actively tracked object
    Tracked,
    /// Temporarily lost track
    Lost,
    /// Removed from tracking; terminal
    Removed,
}

/// A lifecycle move that the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal track transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: TrackState,
    pub to: TrackState,
}

impl TrackState {
    /// Whether the lifecycle permits moving from `self` to `to`.
    ///
    /// `New -> Tracked` is activation, `Tracked -> Tracked` an update,
    /// `Lost -> Tracked` a re-activation. Nothing leaves `Removed`.
    pub fn can_transition_to(self, to: TrackState) -> bool {
        use TrackState::*;
        matches!(
            (self, to),
            (New, Tracked)
                | (Tracked, Tracked)
                | (Lost, Tracked)
                | (Tracked, Lost)
                | (Lost, Lost)
                | (New | Tracked | Lost, Removed)
        )
    }

    pub(crate) fn transition(self, to: TrackState) -> Result<TrackState, TransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(TransitionError { from: self, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_is_terminal() {
        for to in [TrackState::New, TrackState::Tracked, TrackState::Lost, TrackState::Removed] {
            assert!(!TrackState::Removed.can_transition_to(to));
        }
    }

    #[test]
    fn test_nothing_returns_to_new() {
        for from in [TrackState::New, TrackState::Tracked, TrackState::Lost] {
            assert!(!from.can_transition_to(TrackState::New));
        }
    }

    #[test]
    fn test_new_cannot_be_lost() {
        assert_eq!(
            TrackState::New.transition(TrackState::Lost),
            Err(TransitionError {
                from: TrackState::New,
                to: TrackState::Lost
            })
        );
        assert_eq!(TrackState::Lost.transition(TrackState::Tracked), Ok(TrackState::Tracked));
    }
}
