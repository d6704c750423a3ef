pub mod memory;

use crate::dao::models::{GameEntity, GameListItemEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for game records and their timer fields.
///
/// Backends offer plain read-modify-write semantics: `save_game` replaces the whole
/// record and performs no compare-and-swap.
pub trait GameStore: Send + Sync {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameListItemEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
