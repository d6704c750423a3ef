//! Process-local game store backing the server and the tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{GameEntity, GameListItemEntity},
    storage::StorageResult,
};

/// Game store keeping every record in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<DashMap<Uuid, GameEntity>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let games = self.games.clone();
        Box::pin(async move {
            games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let games = self.games.clone();
        Box::pin(async move { Ok(games.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>> {
        let games = self.games.clone();
        Box::pin(async move {
            let mut items: Vec<GameListItemEntity> = games
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect();
            items.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).reverse());
            Ok(items)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::dao::models::{TimerEntity, TournamentStatus};

    fn game(name: &str, updated_at: SystemTime) -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            creator_id: Some("host".into()),
            status: TournamentStatus::Registering,
            blind_levels: Vec::new(),
            timer: TimerEntity::default(),
            created_at: updated_at,
            updated_at,
        }
    }

    #[tokio::test]
    async fn save_then_find_returns_latest_copy() {
        let store = MemoryGameStore::new();
        let mut entity = game("friday", SystemTime::UNIX_EPOCH);
        store.save_game(entity.clone()).await.unwrap();

        entity.timer.current_blind_level = 3;
        store.save_game(entity.clone()).await.unwrap();

        let found = store.find_game(entity.id).await.unwrap().unwrap();
        assert_eq!(found.timer.current_blind_level, 3);
        assert!(store.find_game(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_most_recent_first() {
        let store = MemoryGameStore::new();
        let older = game("older", SystemTime::UNIX_EPOCH);
        let newer = game("newer", SystemTime::UNIX_EPOCH + Duration::from_secs(60));
        store.save_game(older).await.unwrap();
        store.save_game(newer).await.unwrap();

        let names: Vec<String> = store
            .list_games()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["newer".to_string(), "older".to_string()]);
    }
}
