use std::time::SystemTime;

use tracing::debug;

use crate::{clock::structure::BlindStructure, dao::models::TimerEntity};

/// Replicated clock record for one game.
///
/// `seconds_remaining` is only meaningful relative to `last_update`; readers go
/// through [`crate::clock::drift::correct`] unless the clock is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    /// Index of the current level in the blind structure.
    pub level_index: usize,
    /// Seconds left in the level at `last_update`; `None` until seeded.
    pub seconds_remaining: Option<u32>,
    /// Started and not yet exhausted.
    pub running: bool,
    /// Frozen; implies `running`.
    pub paused: bool,
    /// Instant of the last write, when known.
    pub last_update: Option<SystemTime>,
}

impl TimerState {
    /// Level 0 at its full duration, running, stamped `now`.
    pub fn fresh(structure: &BlindStructure, now: SystemTime) -> Self {
        Self {
            level_index: 0,
            seconds_remaining: Some(structure.duration_secs(0)),
            running: true,
            paused: false,
            last_update: Some(now),
        }
    }

    /// Whether a prior snapshot exists for the game.
    pub fn is_initialized(&self) -> bool {
        self.seconds_remaining.is_some()
    }

    /// Whether the stored values are exact regardless of elapsed time.
    pub fn is_frozen(&self) -> bool {
        !self.running || self.paused || self.seconds_remaining.is_none()
    }
}

impl From<&TimerEntity> for TimerState {
    fn from(entity: &TimerEntity) -> Self {
        let mut paused = entity.timer_paused;
        if paused && !entity.timer_running {
            debug!("stored timer paused while not running; clearing pause flag");
            paused = false;
        }

        Self {
            level_index: entity.current_blind_level,
            seconds_remaining: entity.time_remaining_seconds,
            running: entity.timer_running,
            paused,
            last_update: entity.timer_last_update,
        }
    }
}

impl From<&TimerState> for TimerEntity {
    fn from(state: &TimerState) -> Self {
        Self {
            current_blind_level: state.level_index,
            time_remaining_seconds: state.seconds_remaining,
            timer_running: state.running,
            timer_paused: state.paused && state.running,
            timer_last_update: state.last_update,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_without_running_is_normalised() {
        let entity = TimerEntity {
            current_blind_level: 1,
            time_remaining_seconds: Some(90),
            timer_running: false,
            timer_paused: true,
            timer_last_update: None,
        };

        let state = TimerState::from(&entity);
        assert!(!state.paused);
        assert!(state.is_frozen());
    }

    #[test]
    fn default_entity_is_uninitialized() {
        let state = TimerState::from(&TimerEntity::default());
        assert!(!state.is_initialized());
        assert!(state.is_frozen());
    }
}
