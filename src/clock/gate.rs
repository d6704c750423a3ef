//! Write policy between the creator's engine and the store.

use crate::clock::{authority::Role, engine::TickOutcome};

/// Default number of steady ticks between two writes.
pub const DEFAULT_PERSIST_EVERY_TICKS: u32 = 10;

/// What happened locally since the previous decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockChange {
    /// A plain one-second countdown step.
    SteadyTick,
    /// The level advanced (tick rollover).
    LevelChanged,
    /// The last level ran out.
    Exhausted,
    /// Creator paused or resumed.
    PauseToggled,
    /// Fresh timer created at level 0.
    Seeded,
    /// Drift correction crossed at least one level boundary.
    Corrected,
    /// Session is unmounting or switching games.
    Teardown,
}

impl ClockChange {
    /// Classify an engine tick; idle ticks produce nothing to persist.
    pub fn from_tick(outcome: TickOutcome) -> Option<Self> {
        match outcome {
            TickOutcome::Idle => None,
            TickOutcome::Counted => Some(ClockChange::SteadyTick),
            TickOutcome::LevelAdvanced { .. } => Some(ClockChange::LevelChanged),
            TickOutcome::Exhausted => Some(ClockChange::Exhausted),
        }
    }

    /// Critical changes bypass the debounce.
    pub fn is_critical(self) -> bool {
        !matches!(self, ClockChange::SteadyTick)
    }
}

/// Debounces steady-state writes; lets critical transitions through immediately.
#[derive(Debug, Clone)]
pub struct PersistenceGate {
    every_ticks: u32,
    ticks_since_write: u32,
}

impl Default for PersistenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_PERSIST_EVERY_TICKS)
    }
}

impl PersistenceGate {
    /// Gate writing at most once per `every_ticks` steady ticks (minimum 1).
    pub fn new(every_ticks: u32) -> Self {
        Self {
            every_ticks: every_ticks.max(1),
            ticks_since_write: 0,
        }
    }

    /// Decide whether `change` must be written now.
    ///
    /// Viewers never write, whatever the change.
    pub fn decide(&mut self, role: Role, change: ClockChange) -> Option<ClockChange> {
        if !role.can_write() {
            return None;
        }

        if change.is_critical() {
            self.ticks_since_write = 0;
            return Some(change);
        }

        self.ticks_since_write += 1;
        if self.ticks_since_write >= self.every_ticks {
            self.ticks_since_write = 0;
            Some(change)
        } else {
            None
        }
    }

    /// Forget pending steady ticks (new game, new engine).
    pub fn reset(&mut self) {
        self.ticks_since_write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_ticks_write_once_per_interval() {
        let mut gate = PersistenceGate::default();
        let writes: Vec<u32> = (1..=35)
            .filter(|_| gate.decide(Role::Creator, ClockChange::SteadyTick).is_some())
            .collect();
        assert_eq!(writes, vec![10, 20, 30]);
    }

    #[test]
    fn critical_change_on_first_tick_writes_immediately() {
        for change in [ClockChange::LevelChanged, ClockChange::PauseToggled] {
            let mut gate = PersistenceGate::default();
            assert_eq!(gate.decide(Role::Creator, change), Some(change));
        }
    }

    #[test]
    fn critical_write_restarts_the_debounce_window() {
        let mut gate = PersistenceGate::default();
        for _ in 0..7 {
            assert!(gate.decide(Role::Creator, ClockChange::SteadyTick).is_none());
        }
        assert!(gate.decide(Role::Creator, ClockChange::PauseToggled).is_some());
        for _ in 0..9 {
            assert!(gate.decide(Role::Creator, ClockChange::SteadyTick).is_none());
        }
        assert!(gate.decide(Role::Creator, ClockChange::SteadyTick).is_some());
    }

    #[test]
    fn viewer_never_writes() {
        let mut gate = PersistenceGate::default();
        let changes = [
            ClockChange::SteadyTick,
            ClockChange::LevelChanged,
            ClockChange::PauseToggled,
            ClockChange::Teardown,
        ];
        let writes = (0..100)
            .flat_map(|_| changes)
            .filter_map(|change| gate.decide(Role::Viewer, change))
            .count();
        assert_eq!(writes, 0);
    }

    #[test]
    fn tick_outcomes_map_to_changes() {
        assert_eq!(ClockChange::from_tick(TickOutcome::Idle), None);
        assert_eq!(
            ClockChange::from_tick(TickOutcome::LevelAdvanced { from: 0, to: 1 }),
            Some(ClockChange::LevelChanged)
        );
    }
}
