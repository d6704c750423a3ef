use std::time::SystemTime;

use thiserror::Error;

use crate::clock::{drift::Correction, structure::BlindStructure, timer::TimerState};

/// Phases of the creator-side countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    /// Not started, or exhausted on the last level.
    Stopped,
    /// Counting down once per second.
    Running,
    /// Frozen at the current remaining time.
    Paused,
    /// Tournament finished; the engine no longer ticks.
    Finished,
}

/// Events that can be applied to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Tournament entered play with no prior timer record.
    Start,
    /// Creator froze the clock.
    Pause,
    /// Creator resumed the clock.
    Resume,
    /// Remaining time hit zero and a next level exists.
    LevelExpired,
    /// Remaining time hit zero on the last level.
    ClockExhausted,
    /// Tournament status became finished.
    Finish,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the engine was in when the event was received.
    pub from: ClockPhase,
    /// The event that cannot be applied from this phase.
    pub event: ClockEvent,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Engine is not running; nothing changed.
    Idle,
    /// One second was counted down.
    Counted,
    /// The level expired and the next one started at full duration.
    LevelAdvanced {
        /// Level that just ended.
        from: usize,
        /// Level now in play.
        to: usize,
    },
    /// The last level expired; the clock stopped at zero.
    Exhausted,
}

/// Second-by-second countdown owned by the creator session.
///
/// State is mutated synchronously so teardown can always read the in-flight
/// level and remaining time.
#[derive(Debug, Clone)]
pub struct ClockEngine {
    structure: BlindStructure,
    phase: ClockPhase,
    level_index: usize,
    seconds_remaining: u32,
}

impl ClockEngine {
    /// Create a stopped engine positioned on level 0 at full duration.
    pub fn new(structure: BlindStructure) -> Self {
        let seconds_remaining = structure.duration_secs(0);
        Self {
            structure,
            phase: ClockPhase::Stopped,
            level_index: 0,
            seconds_remaining,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Current level index.
    pub fn level_index(&self) -> usize {
        self.level_index
    }

    /// Seconds left in the current level.
    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Structure driving the engine.
    pub fn structure(&self) -> &BlindStructure {
        &self.structure
    }

    /// Whether the tick timer should be armed.
    pub fn is_ticking(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    /// Fresh start: level 0 at its full duration.
    ///
    /// Only valid from [`ClockPhase::Stopped`]; callers guard on the absence of a
    /// prior timer record.
    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.apply(ClockEvent::Start)?;
        self.level_index = 0;
        self.seconds_remaining = self.structure.duration_secs(0);
        Ok(())
    }

    /// Seed the engine from a drift-corrected snapshot.
    pub fn adopt(&mut self, correction: &Correction, running: bool, paused: bool) {
        self.level_index = self.structure.clamp_index(correction.level_index);
        self.seconds_remaining = correction
            .seconds_remaining
            .unwrap_or_else(|| self.structure.duration_secs(self.level_index));
        self.phase = match (running, paused) {
            (false, _) => ClockPhase::Stopped,
            (true, true) => ClockPhase::Paused,
            (true, false) => ClockPhase::Running,
        };
    }

    /// Flip between running and paused, returning the new phase.
    pub fn toggle_pause(&mut self) -> Result<ClockPhase, InvalidTransition> {
        let event = if self.phase == ClockPhase::Paused {
            ClockEvent::Resume
        } else {
            ClockEvent::Pause
        };
        self.apply(event)
    }

    /// Count down one second, rolling into the next level at zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != ClockPhase::Running {
            return TickOutcome::Idle;
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return TickOutcome::Counted;
        }

        let from = self.level_index;
        if from < self.structure.last_index() {
            // Running -> Running is always valid.
            let _ = self.apply(ClockEvent::LevelExpired);
            self.level_index = from + 1;
            self.seconds_remaining = self.structure.duration_secs(self.level_index);
            TickOutcome::LevelAdvanced {
                from,
                to: self.level_index,
            }
        } else {
            let _ = self.apply(ClockEvent::ClockExhausted);
            self.seconds_remaining = 0;
            TickOutcome::Exhausted
        }
    }

    /// Enter the terminal phase.
    pub fn finish(&mut self) {
        // Every phase, Finished included, may finish.
        let _ = self.apply(ClockEvent::Finish);
    }

    /// Snapshot of the engine suitable for persistence, stamped `now`.
    pub fn snapshot(&self, now: SystemTime) -> TimerState {
        TimerState {
            level_index: self.level_index,
            seconds_remaining: Some(self.seconds_remaining),
            running: matches!(self.phase, ClockPhase::Running | ClockPhase::Paused),
            paused: self.phase == ClockPhase::Paused,
            last_update: Some(now),
        }
    }

    fn apply(&mut self, event: ClockEvent) -> Result<ClockPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: ClockEvent) -> Result<ClockPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (ClockPhase::Stopped, ClockEvent::Start) => ClockPhase::Running,
            (ClockPhase::Running, ClockEvent::Pause) => ClockPhase::Paused,
            (ClockPhase::Paused, ClockEvent::Resume) => ClockPhase::Running,
            (ClockPhase::Running, ClockEvent::LevelExpired) => ClockPhase::Running,
            (ClockPhase::Running, ClockEvent::ClockExhausted) => ClockPhase::Stopped,
            (_, ClockEvent::Finish) => ClockPhase::Finished,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::structure::tests::structure_of;

    fn started(minutes: &[u32]) -> ClockEngine {
        let mut engine = ClockEngine::new(structure_of(minutes));
        engine.start().unwrap();
        engine
    }

    #[test]
    fn start_seeds_level_zero_at_full_duration() {
        let engine = started(&[10, 10]);
        assert_eq!(engine.phase(), ClockPhase::Running);
        assert_eq!(engine.level_index(), 0);
        assert_eq!(engine.seconds_remaining(), 600);
    }

    #[test]
    fn start_is_rejected_once_running() {
        let mut engine = started(&[10]);
        let err = engine.start().unwrap_err();
        assert_eq!(err.from, ClockPhase::Running);
        assert_eq!(err.event, ClockEvent::Start);
    }

    #[test]
    fn tick_counts_down_then_rolls_over() {
        let mut engine = started(&[1, 2]);
        for _ in 0..59 {
            assert_eq!(engine.tick(), TickOutcome::Counted);
        }
        assert_eq!(engine.seconds_remaining(), 1);
        assert_eq!(engine.tick(), TickOutcome::LevelAdvanced { from: 0, to: 1 });
        assert_eq!(engine.level_index(), 1);
        assert_eq!(engine.seconds_remaining(), 120);
        assert_eq!(engine.phase(), ClockPhase::Running);
    }

    #[test]
    fn last_level_exhausts_to_stopped_at_zero() {
        let mut engine = started(&[1]);
        for _ in 0..59 {
            engine.tick();
        }
        assert_eq!(engine.tick(), TickOutcome::Exhausted);
        assert_eq!(engine.phase(), ClockPhase::Stopped);
        assert_eq!(engine.seconds_remaining(), 0);
        assert_eq!(engine.tick(), TickOutcome::Idle);

        let snapshot = engine.snapshot(SystemTime::UNIX_EPOCH);
        assert!(!snapshot.running);
        assert_eq!(snapshot.seconds_remaining, Some(0));
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let mut engine = started(&[10]);
        engine.tick();
        assert_eq!(engine.toggle_pause().unwrap(), ClockPhase::Paused);
        for _ in 0..30 {
            assert_eq!(engine.tick(), TickOutcome::Idle);
        }
        assert_eq!(engine.seconds_remaining(), 599);

        let snapshot = engine.snapshot(SystemTime::UNIX_EPOCH);
        assert!(snapshot.running && snapshot.paused);

        assert_eq!(engine.toggle_pause().unwrap(), ClockPhase::Running);
        engine.tick();
        assert_eq!(engine.seconds_remaining(), 598);
    }

    #[test]
    fn pause_requires_a_running_clock() {
        let mut engine = ClockEngine::new(structure_of(&[10]));
        let err = engine.toggle_pause().unwrap_err();
        assert_eq!(err.from, ClockPhase::Stopped);
        assert_eq!(err.event, ClockEvent::Pause);
    }

    #[test]
    fn finish_is_terminal() {
        let mut engine = started(&[10]);
        engine.finish();
        assert_eq!(engine.phase(), ClockPhase::Finished);
        assert_eq!(engine.tick(), TickOutcome::Idle);
        assert!(engine.start().is_err());
        assert!(engine.toggle_pause().is_err());
    }

    #[test]
    fn finish_applies_from_every_phase() {
        let mut paused = started(&[10]);
        paused.toggle_pause().unwrap();
        assert_eq!(paused.compute_transition(ClockEvent::Finish), Ok(ClockPhase::Finished));
        paused.finish();
        assert_eq!(paused.phase(), ClockPhase::Finished);
        assert!(!paused.snapshot(SystemTime::UNIX_EPOCH).running);

        let mut stopped = ClockEngine::new(structure_of(&[10]));
        stopped.finish();
        stopped.finish();
        assert_eq!(stopped.phase(), ClockPhase::Finished);
        assert_eq!(
            stopped.toggle_pause(),
            Err(InvalidTransition {
                from: ClockPhase::Finished,
                event: ClockEvent::Pause,
            })
        );
    }

    #[test]
    fn adopt_follows_the_stored_flags() {
        let mut engine = ClockEngine::new(structure_of(&[10, 10]));
        let correction = Correction {
            level_index: 1,
            seconds_remaining: Some(595),
            levels_advanced: 1,
        };

        engine.adopt(&correction, true, false);
        assert_eq!(engine.phase(), ClockPhase::Running);
        assert_eq!((engine.level_index(), engine.seconds_remaining()), (1, 595));

        engine.adopt(&correction, true, true);
        assert_eq!(engine.phase(), ClockPhase::Paused);

        engine.adopt(&correction, false, false);
        assert_eq!(engine.phase(), ClockPhase::Stopped);
    }

    #[test]
    fn snapshot_is_stamped_with_the_given_instant() {
        let engine = started(&[10]);
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        let snapshot = engine.snapshot(now);
        assert_eq!(snapshot.last_update, Some(now));
        assert_eq!(snapshot.seconds_remaining, Some(600));
        assert!(snapshot.running && !snapshot.paused);
    }
}
