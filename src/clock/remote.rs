//! [`TimerSync`] over the store's HTTP API.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use crate::{
    clock::{
        sync::{GameRecord, SyncError, TimerSync},
        timer::TimerState,
    },
    dao::models::TimerEntity,
    dto::game::{GameView, TimerUpdateRequest},
    routes::game::SESSION_IDENTITY_HEADER,
};

/// Default per-request timeout; a poll slower than this is treated as failed.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

impl From<GameView> for GameRecord {
    fn from(view: GameView) -> Self {
        let timer = TimerState::from(&view.timer());
        Self {
            id: view.id,
            creator_id: view.creator_id,
            status: view.status,
            blind_levels: view.blind_levels.into_iter().map(Into::into).collect(),
            timer,
        }
    }
}

/// HTTP client for `GET /games/{id}` and `PATCH /games/{id}/timer`.
#[derive(Clone)]
pub struct HttpTimerSync {
    client: Client,
    base_url: Arc<str>,
}

impl HttpTimerSync {
    /// Build a client against the store at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let base_url = Arc::<str>::from(base_url.trim_end_matches('/'));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| SyncError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    fn game_url(&self, game_id: Uuid) -> String {
        format!("{}/games/{}", self.base_url, game_id)
    }
}

impl TimerSync for HttpTimerSync {
    fn fetch(&self, game_id: Uuid) -> BoxFuture<'static, Result<GameRecord, SyncError>> {
        let client = self.client.clone();
        let url = self.game_url(game_id);
        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|source| SyncError::Transport {
                    url: url.clone(),
                    source,
                })?;

            match response.status() {
                StatusCode::NOT_FOUND => Err(SyncError::NotFound(game_id)),
                status if status.is_success() => response
                    .json::<GameView>()
                    .await
                    .map(GameRecord::from)
                    .map_err(|source| SyncError::Decode { url, source }),
                other => Err(SyncError::Status {
                    url,
                    status: other.as_u16(),
                }),
            }
        })
    }

    fn push(
        &self,
        game_id: Uuid,
        identity: Option<String>,
        state: TimerState,
    ) -> BoxFuture<'static, Result<(), SyncError>> {
        let client = self.client.clone();
        let url = format!("{}/timer", self.game_url(game_id));
        let body = TimerUpdateRequest::from(TimerEntity::from(&state));
        Box::pin(async move {
            let mut builder = client.patch(&url).json(&body);
            if let Some(identity) = identity {
                builder = builder.header(SESSION_IDENTITY_HEADER, identity);
            }

            let response = builder
                .send()
                .await
                .map_err(|source| SyncError::Transport {
                    url: url.clone(),
                    source,
                })?;

            match response.status() {
                status if status.is_success() => Ok(()),
                StatusCode::NOT_FOUND => Err(SyncError::NotFound(game_id)),
                StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN | StatusCode::CONFLICT => {
                    let message = response.text().await.unwrap_or_default();
                    Err(SyncError::Rejected(message))
                }
                other => Err(SyncError::Status {
                    url,
                    status: other.as_u16(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::TournamentStatus;

    #[test]
    fn game_view_becomes_a_record() {
        let view: GameView = serde_json::from_value(serde_json::json!({
            "id": "00000000-0000-0000-0000-000000000000",
            "name": "Friday",
            "creator_id": "alice",
            "status": "in_progress",
            "blind_levels": [
                { "index": 0, "is_break": false, "small_blind": 25, "big_blind": 50, "duration_minutes": 15 },
                { "index": 1, "is_break": true, "duration_minutes": 5 }
            ],
            "current_blind_level": 1,
            "time_remaining_seconds": 120,
            "timer_running": true,
            "timer_paused": false,
            "timer_last_update": 1_700_000_000_000_i64,
            "created_at": "2023-11-14T22:13:20Z",
            "updated_at": "2023-11-14T22:13:20Z"
        }))
        .unwrap();

        let record = GameRecord::from(view);
        assert_eq!(record.status, TournamentStatus::InProgress);
        assert_eq!(record.blind_levels.len(), 2);
        assert!(record.blind_levels[1].is_break);
        assert_eq!(record.timer.level_index, 1);
        assert_eq!(
            record.timer.last_update,
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let sync = HttpTimerSync::new("http://localhost:8080/", DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(
            sync.game_url(Uuid::nil()),
            "http://localhost:8080/games/00000000-0000-0000-0000-000000000000"
        );
    }
}
