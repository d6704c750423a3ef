//! Gateway between a clock session and the game store.

use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    clock::timer::TimerState,
    dao::{
        game_store::GameStore,
        models::{BlindLevelEntity, GameEntity, TimerEntity, TournamentStatus},
        storage::StorageError,
    },
    error::ServiceError,
    services::game_service,
};

/// The parts of a game record a clock session consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Game identifier.
    pub id: Uuid,
    /// Identity allowed to write the timer.
    pub creator_id: Option<String>,
    /// Tournament lifecycle status.
    pub status: TournamentStatus,
    /// Blind structure rows as configured.
    pub blind_levels: Vec<BlindLevelEntity>,
    /// Last persisted timer snapshot.
    pub timer: TimerState,
}

impl From<GameEntity> for GameRecord {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            creator_id: entity.creator_id,
            status: entity.status,
            timer: TimerState::from(&entity.timer),
            blind_levels: entity.blind_levels,
        }
    }
}

/// Failures talking to the store; always transient from the session's point of view.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The game does not exist.
    #[error("game `{0}` not found")]
    NotFound(Uuid),
    /// The store refused the write.
    #[error("timer write rejected: {0}")]
    Rejected(String),
    /// Local storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// HTTP request could not be completed.
    #[cfg(feature = "remote-sync")]
    #[error("request to `{url}` failed")]
    Transport {
        /// Target URL.
        url: String,
        /// Client failure.
        #[source]
        source: reqwest::Error,
    },
    /// HTTP response body could not be decoded.
    #[cfg(feature = "remote-sync")]
    #[error("failed to decode response from `{url}`")]
    Decode {
        /// Target URL.
        url: String,
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// HTTP response had an unexpected status.
    #[error("unexpected response status {status} from `{url}`")]
    Status {
        /// Target URL.
        url: String,
        /// Status code received.
        status: u16,
    },
}

/// Read the game record and write timer snapshots on behalf of a session.
pub trait TimerSync: Send + Sync {
    /// Fetch the current game record.
    fn fetch(&self, game_id: Uuid) -> BoxFuture<'static, Result<GameRecord, SyncError>>;
    /// Write the five timer fields as `identity`.
    fn push(
        &self,
        game_id: Uuid,
        identity: Option<String>,
        state: TimerState,
    ) -> BoxFuture<'static, Result<(), SyncError>>;
}

/// In-process gateway talking directly to a [`GameStore`].
///
/// Writes go through the same creator and lifecycle checks as the HTTP service.
#[derive(Clone)]
pub struct StoreSync {
    store: Arc<dyn GameStore>,
}

impl StoreSync {
    /// Wrap a store handle.
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }
}

impl TimerSync for StoreSync {
    fn fetch(&self, game_id: Uuid) -> BoxFuture<'static, Result<GameRecord, SyncError>> {
        let store = self.store.clone();
        Box::pin(async move {
            store
                .find_game(game_id)
                .await?
                .map(GameRecord::from)
                .ok_or(SyncError::NotFound(game_id))
        })
    }

    fn push(
        &self,
        game_id: Uuid,
        identity: Option<String>,
        state: TimerState,
    ) -> BoxFuture<'static, Result<(), SyncError>> {
        let store = self.store.clone();
        Box::pin(async move {
            let update = TimerEntity::from(&state);
            game_service::write_timer(
                store.as_ref(),
                game_id,
                identity.as_deref(),
                update,
                SystemTime::now(),
            )
            .await
            .map(|_| ())
            .map_err(|err| match err {
                ServiceError::NotFound(_) => SyncError::NotFound(game_id),
                ServiceError::Unavailable(source) => SyncError::Storage(source),
                other => SyncError::Rejected(other.to_string()),
            })
        })
    }
}
