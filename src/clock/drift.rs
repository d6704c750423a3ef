//! Fast-forwards a stale timer snapshot to "now".
//!
//! Runs on every fetch for both roles. Viewers display the result directly; a
//! creator session seeds its engine from it.

use std::time::SystemTime;

use crate::clock::{structure::BlindStructure, timer::TimerState};

/// Where the clock should be right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    /// Corrected level index.
    pub level_index: usize,
    /// Corrected seconds left in that level; `None` when the snapshot was never seeded.
    pub seconds_remaining: Option<u32>,
    /// How many level boundaries were crossed during the gap.
    pub levels_advanced: usize,
}

impl Correction {
    /// A level change happened during the gap; creators persist it eagerly.
    pub fn is_critical(&self) -> bool {
        self.levels_advanced > 0
    }

    /// The corrected values as a snapshot stamped `now`, keeping the run flags of `base`.
    pub fn apply_to(&self, base: &TimerState, now: SystemTime) -> TimerState {
        TimerState {
            level_index: self.level_index,
            seconds_remaining: self.seconds_remaining,
            running: base.running,
            paused: base.paused,
            last_update: Some(now),
        }
    }
}

/// Re-derive the live level and remaining seconds from `state` as of `now`.
///
/// Frozen snapshots (not running, paused, never seeded, or missing a timestamp)
/// are returned unchanged. A timestamp in the future counts as no elapsed time.
pub fn correct(state: &TimerState, structure: &BlindStructure, now: SystemTime) -> Correction {
    let start_index = structure.clamp_index(state.level_index);

    let (Some(stored), Some(last_update)) = (state.seconds_remaining, state.last_update) else {
        return Correction {
            level_index: start_index,
            seconds_remaining: state.seconds_remaining,
            levels_advanced: 0,
        };
    };

    if state.is_frozen() {
        return Correction {
            level_index: start_index,
            seconds_remaining: Some(stored),
            levels_advanced: 0,
        };
    }

    let elapsed = now
        .duration_since(last_update)
        .map(|gap| gap.as_secs())
        .unwrap_or(0);
    let elapsed = i64::try_from(elapsed).unwrap_or(i64::MAX);

    let mut level_index = start_index;
    let mut remaining = i64::from(stored).saturating_sub(elapsed);
    while remaining <= 0 && level_index < structure.last_index() {
        level_index += 1;
        remaining += i64::from(structure.duration_secs(level_index));
    }

    let remaining = u32::try_from(remaining.max(0)).unwrap_or(u32::MAX);

    Correction {
        level_index,
        seconds_remaining: Some(remaining),
        levels_advanced: level_index - start_index,
    }
}
