use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Tournament lifecycle owned by game configuration; drives whether the clock
/// initializes, ticks, or stays dormant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Players are still registering; the clock has not started.
    Registering,
    /// Tournament is being played; the creator drives the clock.
    InProgress,
    /// Tournament is over; timer fields are no longer consulted.
    Finished,
}

impl TournamentStatus {
    /// Whether the lifecycle may move from `self` to `next` (forward only).
    pub fn can_advance_to(self, next: TournamentStatus) -> bool {
        matches!(
            (self, next),
            (TournamentStatus::Registering, TournamentStatus::InProgress)
                | (TournamentStatus::InProgress, TournamentStatus::Finished)
                | (TournamentStatus::Registering, TournamentStatus::Finished)
        )
    }
}

/// One row of the blind structure as persisted in game configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlindLevelEntity {
    /// Position of the level in the structure (0-based).
    pub index: usize,
    /// Whether this row is a break rather than a play level.
    pub is_break: bool,
    /// Small blind, absent on breaks.
    #[serde(default)]
    pub small_blind: Option<u64>,
    /// Big blind, absent on breaks.
    #[serde(default)]
    pub big_blind: Option<u64>,
    /// Optional big-blind ante.
    #[serde(default)]
    pub big_blind_ante: Option<u64>,
    /// Length of the level in minutes.
    pub duration_minutes: u32,
}

/// The five replicated timer fields stored alongside a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerEntity {
    /// Index of the current blind level.
    pub current_blind_level: usize,
    /// Seconds left in the current level as of `timer_last_update`; `None` until seeded.
    pub time_remaining_seconds: Option<u32>,
    /// Whether the tournament clock has been started and not exhausted.
    pub timer_running: bool,
    /// Whether the clock is frozen.
    pub timer_paused: bool,
    /// Wall-clock instant of the last timer write.
    pub timer_last_update: Option<SystemTime>,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the game night.
    pub name: String,
    /// Identity of the session that owns the game and drives its clock.
    pub creator_id: Option<String>,
    /// Current tournament lifecycle status.
    pub status: TournamentStatus,
    /// Ordered blind structure.
    pub blind_levels: Vec<BlindLevelEntity>,
    /// Replicated clock record.
    pub timer: TimerEntity,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
}

/// Aggregate game list item entity (subset of GameEntity) persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameListItemEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the game night.
    pub name: String,
    /// Current tournament lifecycle status.
    pub status: TournamentStatus,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
}

impl From<GameEntity> for GameListItemEntity {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            status: entity.status,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_moves_forward() {
        use TournamentStatus::*;
        assert!(Registering.can_advance_to(InProgress));
        assert!(InProgress.can_advance_to(Finished));
        assert!(Registering.can_advance_to(Finished));
        assert!(!InProgress.can_advance_to(Registering));
        assert!(!Finished.can_advance_to(InProgress));
        assert!(!InProgress.can_advance_to(InProgress));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TournamentStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
