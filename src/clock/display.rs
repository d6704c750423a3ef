//! Presentation snapshot published by a clock session.

use std::{fmt, time::Duration};

use crate::{
    clock::structure::{BlindLevel, BlindStructure, LevelKind},
    dao::models::TournamentStatus,
};

/// Blinds or break shown for a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDescriptor {
    /// 1-based level number as shown to players.
    pub number: usize,
    /// Whether the level is a break.
    pub is_break: bool,
    /// Small blind on play levels.
    pub small_blind: Option<u64>,
    /// Big blind on play levels.
    pub big_blind: Option<u64>,
    /// Big-blind ante, if any.
    pub ante: Option<u64>,
    /// Configured length of the level.
    pub duration_minutes: u32,
}

impl From<&BlindLevel> for LevelDescriptor {
    fn from(level: &BlindLevel) -> Self {
        let (small_blind, big_blind, ante) = match level.kind {
            LevelKind::Play {
                small_blind,
                big_blind,
                ante,
            } => (Some(small_blind), Some(big_blind), ante),
            LevelKind::Break => (None, None, None),
        };
        Self {
            number: level.index + 1,
            is_break: level.is_break(),
            small_blind,
            big_blind,
            ante,
            duration_minutes: level.duration_minutes,
        }
    }
}

impl fmt::Display for LevelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_break, self.small_blind, self.big_blind) {
            (false, Some(small), Some(big)) => {
                write!(f, "Level {} {small}/{big}", self.number)?;
                if let Some(ante) = self.ante {
                    write!(f, " ante {ante}")?;
                }
                Ok(())
            }
            _ => write!(f, "Break (level {})", self.number),
        }
    }
}

/// Live clock values rendered while a structure is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveClock {
    /// Current tournament status.
    pub status: TournamentStatus,
    /// Current level index.
    pub level_index: usize,
    /// Current level.
    pub level: LevelDescriptor,
    /// Level that follows, if any.
    pub next_level: Option<LevelDescriptor>,
    /// Seconds left in the level.
    pub seconds_remaining: u32,
    /// Clock started and not exhausted.
    pub running: bool,
    /// Clock frozen.
    pub paused: bool,
    /// Whether this session may toggle pause.
    pub can_toggle_pause: bool,
}

impl LiveClock {
    /// Build the live view for `level_index`, clamping it into the structure.
    pub fn new(
        structure: &BlindStructure,
        status: TournamentStatus,
        level_index: usize,
        seconds_remaining: u32,
        running: bool,
        paused: bool,
        can_toggle_pause: bool,
    ) -> Self {
        let level_index = structure.clamp_index(level_index);
        let level = structure
            .level(level_index)
            .map(LevelDescriptor::from)
            .unwrap_or_else(|| LevelDescriptor {
                number: level_index + 1,
                is_break: false,
                small_blind: None,
                big_blind: None,
                ante: None,
                duration_minutes: 0,
            });
        Self {
            status,
            level_index,
            level,
            next_level: structure.level(level_index + 1).map(LevelDescriptor::from),
            seconds_remaining,
            running,
            paused,
            can_toggle_pause,
        }
    }

    /// Remaining time as `MM:SS`, or `H:MM:SS` past one hour.
    pub fn remaining(&self) -> String {
        format_remaining(self.seconds_remaining)
    }
}

/// Whether the clock can be shown at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// No successful fetch yet.
    Loading,
    /// Missing or malformed blind structure.
    Unavailable,
    /// Tournament finished; the timer is no longer consulted.
    Finished,
    /// Clock values are available.
    Live(LiveClock),
}

/// Snapshot consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDisplay {
    /// What to render.
    pub availability: Availability,
    /// Interval before the next refresh.
    pub poll_interval: Duration,
}

impl TimerDisplay {
    /// Initial display before the first fetch completes.
    pub fn loading(poll_interval: Duration) -> Self {
        Self {
            availability: Availability::Loading,
            poll_interval,
        }
    }

    /// Live clock values, when available.
    pub fn live(&self) -> Option<&LiveClock> {
        match &self.availability {
            Availability::Live(clock) => Some(clock),
            _ => None,
        }
    }
}

impl fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.availability {
            Availability::Loading => write!(f, "loading"),
            Availability::Unavailable => write!(f, "not available"),
            Availability::Finished => write!(f, "tournament finished"),
            Availability::Live(clock) => {
                write!(f, "{} | {}", clock.level, clock.remaining())?;
                if clock.paused {
                    write!(f, " | paused")?;
                } else if !clock.running {
                    write!(f, " | stopped")?;
                }
                if let Some(next) = &clock.next_level {
                    write!(f, " | next: {next}")?;
                }
                Ok(())
            }
        }
    }
}

/// Format seconds as `MM:SS`, switching to `H:MM:SS` from one hour.
pub fn format_remaining(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::structure::tests::{break_row, play_row};

    #[test]
    fn formats_remaining_time() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(595), "09:55");
        assert_eq!(format_remaining(3599), "59:59");
        assert_eq!(format_remaining(3600), "1:00:00");
        assert_eq!(format_remaining(7325), "2:02:05");
    }

    #[test]
    fn live_line_shows_blinds_and_next_level() {
        let mut third = play_row(2, 20, 100, 200);
        third.big_blind_ante = Some(200);
        let rows = vec![play_row(0, 10, 25, 50), break_row(1, 5), third];
        let structure = BlindStructure::try_from(rows.as_slice()).unwrap();

        let display = TimerDisplay {
            availability: Availability::Live(LiveClock::new(
                &structure,
                TournamentStatus::InProgress,
                0,
                595,
                true,
                false,
                false,
            )),
            poll_interval: Duration::from_secs(2),
        };
        assert_eq!(
            display.to_string(),
            "Level 1 25/50 | 09:55 | next: Break (level 2)"
        );

        let paused = LiveClock::new(
            &structure,
            TournamentStatus::InProgress,
            2,
            61,
            true,
            true,
            true,
        );
        assert_eq!(paused.level.to_string(), "Level 3 100/200 ante 200");
        assert!(paused.next_level.is_none());
        assert_eq!(paused.remaining(), "01:01");
    }

    #[test]
    fn sentinel_states_render_plainly() {
        let display = TimerDisplay {
            availability: Availability::Unavailable,
            poll_interval: Duration::from_secs(2),
        };
        assert_eq!(display.to_string(), "not available");
        assert!(display.live().is_none());
    }
}
