use std::time::SystemTime;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    clock::{
        authority::{self, Role},
        structure::BlindStructure,
    },
    dao::{
        game_store::GameStore,
        models::{BlindLevelEntity, GameEntity, TimerEntity, TournamentStatus},
    },
    dto::game::{BlindLevelDto, CreateGameRequest, GameListItem, GameView},
    error::ServiceError,
};

/// Persist a new game in the registering state with an unseeded timer.
pub async fn create_game(
    store: &dyn GameStore,
    request: CreateGameRequest,
    now: SystemTime,
) -> Result<GameView, ServiceError> {
    let CreateGameRequest {
        name,
        creator_id,
        blind_levels,
    } = request;

    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput(
            "game name must not be empty".into(),
        ));
    }
    let creator_id = creator_id.trim().to_owned();
    if creator_id.is_empty() {
        return Err(ServiceError::InvalidInput(
            "creator identity must not be empty".into(),
        ));
    }

    let blind_levels = build_levels(blind_levels)?;
    let game = GameEntity {
        id: Uuid::new_v4(),
        name,
        creator_id: Some(creator_id),
        status: TournamentStatus::Registering,
        blind_levels,
        timer: TimerEntity::default(),
        created_at: now,
        updated_at: now,
    };

    store.save_game(game.clone()).await?;
    info!(game_id = %game.id, levels = game.blind_levels.len(), "game created");

    Ok(game.into())
}

/// List every game, most recently updated first.
pub async fn list_games(store: &dyn GameStore) -> Result<Vec<GameListItem>, ServiceError> {
    let games = store.list_games().await?;
    Ok(games.into_iter().map(Into::into).collect())
}

/// Fetch a single game with its timer fields.
pub async fn get_game(store: &dyn GameStore, id: Uuid) -> Result<GameView, ServiceError> {
    Ok(load_game(store, id).await?.into())
}

/// Move the tournament lifecycle forward on behalf of the creator.
///
/// Entering play requires a usable blind structure; finishing clears the timer.
pub async fn update_status(
    store: &dyn GameStore,
    id: Uuid,
    caller: Option<&str>,
    next: TournamentStatus,
    now: SystemTime,
) -> Result<GameView, ServiceError> {
    let mut game = load_game(store, id).await?;
    ensure_creator(&game, caller)?;

    if !game.status.can_advance_to(next) {
        return Err(ServiceError::InvalidState(format!(
            "cannot move tournament from {:?} to {:?}",
            game.status, next
        )));
    }

    match next {
        TournamentStatus::InProgress => {
            BlindStructure::try_from(game.blind_levels.as_slice())?;
            game.timer = TimerEntity::default();
        }
        TournamentStatus::Finished => game.timer = TimerEntity::default(),
        TournamentStatus::Registering => {}
    }

    let previous = game.status;
    game.status = next;
    game.updated_at = now;
    store.save_game(game.clone()).await?;
    info!(game_id = %id, from = ?previous, to = ?next, "tournament status changed");

    Ok(game.into())
}

/// Replace the blind structure; only allowed before the tournament starts.
pub async fn replace_blind_levels(
    store: &dyn GameStore,
    id: Uuid,
    caller: Option<&str>,
    levels: Vec<BlindLevelDto>,
    now: SystemTime,
) -> Result<GameView, ServiceError> {
    let mut game = load_game(store, id).await?;
    ensure_creator(&game, caller)?;

    if game.status != TournamentStatus::Registering {
        return Err(ServiceError::InvalidState(
            "blind structure is frozen once the tournament starts".into(),
        ));
    }

    game.blind_levels = build_levels(levels)?;
    game.updated_at = now;
    store.save_game(game.clone()).await?;
    info!(game_id = %id, levels = game.blind_levels.len(), "blind structure replaced");

    Ok(game.into())
}

/// Overwrite the five timer fields as `caller`.
///
/// Plain last-write-wins: no version check is made against the stored timer.
pub async fn write_timer(
    store: &dyn GameStore,
    id: Uuid,
    caller: Option<&str>,
    mut update: TimerEntity,
    now: SystemTime,
) -> Result<GameEntity, ServiceError> {
    let mut game = load_game(store, id).await?;
    ensure_creator(&game, caller)?;

    if game.status != TournamentStatus::InProgress {
        return Err(ServiceError::InvalidState(format!(
            "timer can only be written while the tournament is in progress (status {:?})",
            game.status
        )));
    }

    let structure = BlindStructure::try_from(game.blind_levels.as_slice())
        .map_err(|err| ServiceError::InvalidState(format!("blind structure: {err}")))?;

    if update.timer_paused && !update.timer_running {
        return Err(ServiceError::InvalidInput(
            "a paused timer must also be running".into(),
        ));
    }
    let Some(level) = structure.level(update.current_blind_level) else {
        return Err(ServiceError::InvalidInput(format!(
            "level {} is outside the {}-level structure",
            update.current_blind_level,
            structure.last_index() + 1
        )));
    };
    if let Some(remaining) = update.time_remaining_seconds
        && remaining > level.duration_secs()
    {
        return Err(ServiceError::InvalidInput(format!(
            "{remaining}s remaining exceeds the {}s level duration",
            level.duration_secs()
        )));
    }

    let stored = &game.timer;
    if stored.timer_running && update.current_blind_level < stored.current_blind_level {
        warn!(
            game_id = %id,
            stored_level = stored.current_blind_level,
            level = update.current_blind_level,
            "timer write moves the clock back a level; another creator session may be active"
        );
    }

    update.timer_last_update.get_or_insert(now);
    debug!(
        game_id = %id,
        level = update.current_blind_level,
        remaining = ?update.time_remaining_seconds,
        running = update.timer_running,
        paused = update.timer_paused,
        "timer written"
    );

    game.timer = update;
    game.updated_at = now;
    store.save_game(game.clone()).await?;

    Ok(game)
}

async fn load_game(store: &dyn GameStore, id: Uuid) -> Result<GameEntity, ServiceError> {
    store
        .find_game(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{id}` not found")))
}

fn ensure_creator(game: &GameEntity, caller: Option<&str>) -> Result<(), ServiceError> {
    match authority::resolve(caller, game.creator_id.as_deref()) {
        Role::Creator => Ok(()),
        Role::Viewer => Err(ServiceError::Forbidden(
            "only the game creator may modify this game".into(),
        )),
    }
}

/// Rewrite indices from list order; an empty list is allowed until play starts.
fn build_levels(levels: Vec<BlindLevelDto>) -> Result<Vec<BlindLevelEntity>, ServiceError> {
    let levels: Vec<BlindLevelEntity> = levels
        .into_iter()
        .enumerate()
        .map(|(index, level)| BlindLevelEntity {
            index,
            ..level.into()
        })
        .collect();

    if !levels.is_empty() {
        BlindStructure::try_from(levels.as_slice())?;
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::game_store::memory::MemoryGameStore;

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn level(small: u64, big: u64, minutes: u32) -> BlindLevelDto {
        BlindLevelDto {
            index: 0,
            is_break: false,
            small_blind: Some(small),
            big_blind: Some(big),
            big_blind_ante: None,
            duration_minutes: minutes,
        }
    }

    async fn started_game(store: &MemoryGameStore) -> Uuid {
        let request = CreateGameRequest {
            name: "Thursday".into(),
            creator_id: "alice".into(),
            blind_levels: vec![level(25, 50, 10), level(50, 100, 10)],
        };
        let game = create_game(store, request, now()).await.unwrap();
        update_status(
            store,
            game.id,
            Some("alice"),
            TournamentStatus::InProgress,
            now(),
        )
        .await
        .unwrap();
        game.id
    }

    fn running(level: usize, remaining: u32) -> TimerEntity {
        TimerEntity {
            current_blind_level: level,
            time_remaining_seconds: Some(remaining),
            timer_running: true,
            timer_paused: false,
            timer_last_update: None,
        }
    }

    #[tokio::test]
    async fn create_game_rewrites_level_indices() {
        let store = MemoryGameStore::new();
        let mut second = level(50, 100, 10);
        second.index = 7;
        let request = CreateGameRequest {
            name: "  Thursday  ".into(),
            creator_id: "alice".into(),
            blind_levels: vec![level(25, 50, 10), second],
        };

        let game = create_game(&store, request, now()).await.unwrap();
        assert_eq!(game.name, "Thursday");
        assert_eq!(game.status, TournamentStatus::Registering);
        assert_eq!(game.blind_levels[1].index, 1);
        assert_eq!(game.time_remaining_seconds, None);
    }

    #[tokio::test]
    async fn only_the_creator_writes_the_timer() {
        let store = MemoryGameStore::new();
        let id = started_game(&store).await;

        for caller in [None, Some("bob"), Some("  ")] {
            let err = write_timer(&store, id, caller, running(0, 600), now())
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Forbidden(_)));
        }

        let game = write_timer(&store, id, Some("alice"), running(0, 600), now())
            .await
            .unwrap();
        assert_eq!(game.timer.timer_last_update, Some(now()));
    }

    #[tokio::test]
    async fn timer_writes_are_checked_against_the_structure() {
        let store = MemoryGameStore::new();
        let id = started_game(&store).await;

        let err = write_timer(&store, id, Some("alice"), running(2, 10), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = write_timer(&store, id, Some("alice"), running(0, 601), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let mut paused = running(0, 300);
        paused.timer_running = false;
        paused.timer_paused = true;
        let err = write_timer(&store, id, Some("alice"), paused, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn last_write_wins_even_backwards() {
        let store = MemoryGameStore::new();
        let id = started_game(&store).await;

        write_timer(&store, id, Some("alice"), running(1, 500), now())
            .await
            .unwrap();
        let game = write_timer(&store, id, Some("alice"), running(0, 100), now())
            .await
            .unwrap();
        assert_eq!(game.timer.current_blind_level, 0);
        assert_eq!(game.timer.time_remaining_seconds, Some(100));
    }

    #[tokio::test]
    async fn status_moves_forward_and_finishing_clears_the_timer() {
        let store = MemoryGameStore::new();
        let id = started_game(&store).await;
        write_timer(&store, id, Some("alice"), running(1, 500), now())
            .await
            .unwrap();

        let err = update_status(
            &store,
            id,
            Some("alice"),
            TournamentStatus::Registering,
            now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let game = update_status(&store, id, Some("alice"), TournamentStatus::Finished, now())
            .await
            .unwrap();
        assert_eq!(game.status, TournamentStatus::Finished);
        assert_eq!(game.time_remaining_seconds, None);
        assert!(!game.timer_running);

        let err = write_timer(&store, id, Some("alice"), running(0, 10), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn play_requires_a_structure_and_freezes_it() {
        let store = MemoryGameStore::new();
        let request = CreateGameRequest {
            name: "Empty".into(),
            creator_id: "alice".into(),
            blind_levels: vec![],
        };
        let game = create_game(&store, request, now()).await.unwrap();

        let err = update_status(
            &store,
            game.id,
            Some("alice"),
            TournamentStatus::InProgress,
            now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        replace_blind_levels(&store, game.id, Some("alice"), vec![level(25, 50, 20)], now())
            .await
            .unwrap();
        update_status(
            &store,
            game.id,
            Some("alice"),
            TournamentStatus::InProgress,
            now(),
        )
        .await
        .unwrap();

        let err = replace_blind_levels(&store, game.id, Some("alice"), vec![], now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }
}
