use std::time::Duration;

use crate::dao::models::TournamentStatus;

/// Fetch cadence for refreshing a game record, by tournament status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    /// In progress and ticking: keeps viewers visually live.
    pub in_progress: Duration,
    /// In progress but paused: the clock is frozen.
    pub paused: Duration,
    /// Registration open: a safety net rather than an active sync.
    pub registering: Duration,
    /// Finished: only late result data.
    pub finished: Duration,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            in_progress: Duration::from_secs(2),
            paused: Duration::from_secs(30),
            registering: Duration::from_secs(12 * 60 * 60),
            finished: Duration::from_secs(30),
        }
    }
}

impl PollingPolicy {
    /// Interval to wait before the next fetch.
    pub fn interval(&self, status: TournamentStatus, paused: bool) -> Duration {
        match status {
            TournamentStatus::InProgress if paused => self.paused,
            TournamentStatus::InProgress => self.in_progress,
            TournamentStatus::Registering => self.registering,
            TournamentStatus::Finished => self.finished,
        }
    }
}
