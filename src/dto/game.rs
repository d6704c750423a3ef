use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{
        BlindLevelEntity, GameEntity, GameListItemEntity, TimerEntity, TournamentStatus,
    },
    dto::{
        format_system_time,
        validation::{validate_blind_level, validate_timer_flags},
    },
};

/// Payload used to create a game with its blind structure.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Display name of the game night.
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    /// Identity of the creating session; the only one allowed to drive the clock.
    #[validate(length(min = 1, max = 128))]
    pub creator_id: String,
    /// Levels in play order. May be empty while registering.
    #[serde(default)]
    #[validate(nested)]
    pub blind_levels: Vec<BlindLevelDto>,
}

/// Replacement blind structure, accepted only before the tournament starts.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct BlindStructureRequest {
    /// Levels in play order.
    #[validate(nested)]
    pub blind_levels: Vec<BlindLevelDto>,
}

/// One level of the blind structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema, Validate)]
#[validate(schema(function = "validate_blind_level"))]
pub struct BlindLevelDto {
    /// 0-based position; rewritten from the list order on input.
    #[serde(default)]
    pub index: usize,
    /// Whether the level is a break.
    #[serde(default)]
    pub is_break: bool,
    /// Small blind (play levels).
    #[serde(default)]
    pub small_blind: Option<u64>,
    /// Big blind (play levels).
    #[serde(default)]
    pub big_blind: Option<u64>,
    /// Optional big-blind ante.
    #[serde(default)]
    pub big_blind_ante: Option<u64>,
    /// Level length in minutes.
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: u32,
}

impl From<BlindLevelEntity> for BlindLevelDto {
    fn from(entity: BlindLevelEntity) -> Self {
        Self {
            index: entity.index,
            is_break: entity.is_break,
            small_blind: entity.small_blind,
            big_blind: entity.big_blind,
            big_blind_ante: entity.big_blind_ante,
            duration_minutes: entity.duration_minutes,
        }
    }
}

impl From<BlindLevelDto> for BlindLevelEntity {
    fn from(dto: BlindLevelDto) -> Self {
        Self {
            index: dto.index,
            is_break: dto.is_break,
            small_blind: dto.small_blind.filter(|_| !dto.is_break),
            big_blind: dto.big_blind.filter(|_| !dto.is_break),
            big_blind_ante: dto.big_blind_ante.filter(|_| !dto.is_break),
            duration_minutes: dto.duration_minutes,
        }
    }
}

/// Requested tournament status change.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// Target status; only forward moves are accepted.
    pub status: TournamentStatus,
}

/// The five timer fields written by the creator session.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema, Validate)]
#[validate(schema(function = "validate_timer_flags"))]
pub struct TimerUpdateRequest {
    /// Index of the current level.
    pub current_blind_level: usize,
    /// Seconds left in the level as of `timer_last_update`.
    pub time_remaining_seconds: Option<u32>,
    /// Clock started and not exhausted.
    pub timer_running: bool,
    /// Clock frozen; requires `timer_running`.
    pub timer_paused: bool,
    /// Milliseconds since the Unix epoch; the server stamps the write when absent.
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    #[schema(value_type = Option<i64>)]
    pub timer_last_update: Option<SystemTime>,
}

impl From<TimerUpdateRequest> for TimerEntity {
    fn from(request: TimerUpdateRequest) -> Self {
        Self {
            current_blind_level: request.current_blind_level,
            time_remaining_seconds: request.time_remaining_seconds,
            timer_running: request.timer_running,
            timer_paused: request.timer_paused,
            timer_last_update: request.timer_last_update,
        }
    }
}

impl From<TimerEntity> for TimerUpdateRequest {
    fn from(entity: TimerEntity) -> Self {
        Self {
            current_blind_level: entity.current_blind_level,
            time_remaining_seconds: entity.time_remaining_seconds,
            timer_running: entity.timer_running,
            timer_paused: entity.timer_paused,
            timer_last_update: entity.timer_last_update,
        }
    }
}

/// Full game record, including the replicated timer fields.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GameView {
    /// Game identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Identity allowed to write the timer.
    pub creator_id: Option<String>,
    /// Tournament lifecycle status.
    pub status: TournamentStatus,
    /// Blind structure in play order.
    pub blind_levels: Vec<BlindLevelDto>,
    /// Index of the current level.
    pub current_blind_level: usize,
    /// Seconds left as of `timer_last_update`; null until the clock starts.
    pub time_remaining_seconds: Option<u32>,
    /// Clock started and not exhausted.
    pub timer_running: bool,
    /// Clock frozen.
    pub timer_paused: bool,
    /// Milliseconds since the Unix epoch of the last timer write.
    #[serde_as(as = "Option<TimestampMilliSeconds<i64>>")]
    #[schema(value_type = Option<i64>)]
    pub timer_last_update: Option<SystemTime>,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

impl GameView {
    /// Timer fields as persisted.
    pub fn timer(&self) -> TimerEntity {
        TimerEntity {
            current_blind_level: self.current_blind_level,
            time_remaining_seconds: self.time_remaining_seconds,
            timer_running: self.timer_running,
            timer_paused: self.timer_paused,
            timer_last_update: self.timer_last_update,
        }
    }
}

impl From<GameEntity> for GameView {
    fn from(entity: GameEntity) -> Self {
        let GameEntity {
            id,
            name,
            creator_id,
            status,
            blind_levels,
            timer,
            created_at,
            updated_at,
        } = entity;

        Self {
            id,
            name,
            creator_id,
            status,
            blind_levels: blind_levels.into_iter().map(Into::into).collect(),
            current_blind_level: timer.current_blind_level,
            time_remaining_seconds: timer.time_remaining_seconds,
            timer_running: timer.timer_running,
            timer_paused: timer.timer_paused,
            timer_last_update: timer.timer_last_update,
            created_at: format_system_time(created_at),
            updated_at: format_system_time(updated_at),
        }
    }
}

/// Lightweight game summary used for listings.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GameListItem {
    /// Game identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Tournament lifecycle status.
    pub status: TournamentStatus,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

impl From<GameListItemEntity> for GameListItem {
    fn from(entity: GameListItemEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            status: entity.status,
            updated_at: format_system_time(entity.updated_at),
        }
    }
}
