use std::time::SystemTime;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, patch, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{
        BlindStructureRequest, CreateGameRequest, GameListItem, GameView, StatusUpdateRequest,
        TimerUpdateRequest,
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Header carrying the caller's session identity.
pub const SESSION_IDENTITY_HEADER: &str = "x-session-identity";

/// Routes handling game records and the replicated clock fields.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/status", put(update_status))
        .route("/games/{id}/blind-levels", put(replace_blind_levels))
        .route("/games/{id}/timer", patch(write_timer))
}

/// Create a game in the registering state.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameView),
        (status = 400, description = "Invalid game definition")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<Json<GameView>, AppError> {
    let game = game_service::create_game(state.game_store(), payload, SystemTime::now()).await?;
    Ok(Json(game))
}

/// List games, most recently updated first.
#[utoipa::path(
    get,
    path = "/games",
    tag = "game",
    responses((status = 200, description = "Known games", body = [GameListItem]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameListItem>>, AppError> {
    Ok(Json(game_service::list_games(state.game_store()).await?))
}

/// Fetch a game with its timer fields; polled by every clock session.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = String, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game record", body = GameView),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::get_game(state.game_store(), id).await?))
}

/// Move the tournament status forward (creator only).
#[utoipa::path(
    put,
    path = "/games/{id}/status",
    tag = "game",
    params(
        ("id" = String, Path, description = "Identifier of the game"),
        ("X-Session-Identity" = String, Header, description = "Identity of the caller")
    ),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = GameView),
        (status = 403, description = "Caller is not the creator"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<GameView>, AppError> {
    let caller = session_identity(&headers);
    let game = game_service::update_status(
        state.game_store(),
        id,
        caller.as_deref(),
        payload.status,
        SystemTime::now(),
    )
    .await?;
    Ok(Json(game))
}

/// Replace the blind structure while registration is open (creator only).
#[utoipa::path(
    put,
    path = "/games/{id}/blind-levels",
    tag = "game",
    params(
        ("id" = String, Path, description = "Identifier of the game"),
        ("X-Session-Identity" = String, Header, description = "Identity of the caller")
    ),
    request_body = BlindStructureRequest,
    responses(
        (status = 200, description = "Structure replaced", body = GameView),
        (status = 403, description = "Caller is not the creator"),
        (status = 409, description = "Tournament already started")
    )
)]
pub async fn replace_blind_levels(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<BlindStructureRequest>>,
) -> Result<Json<GameView>, AppError> {
    let caller = session_identity(&headers);
    let game = game_service::replace_blind_levels(
        state.game_store(),
        id,
        caller.as_deref(),
        payload.blind_levels,
        SystemTime::now(),
    )
    .await?;
    Ok(Json(game))
}

/// Overwrite the timer fields (creator only, last write wins).
#[utoipa::path(
    patch,
    path = "/games/{id}/timer",
    tag = "game",
    params(
        ("id" = String, Path, description = "Identifier of the game"),
        ("X-Session-Identity" = String, Header, description = "Identity of the caller")
    ),
    request_body = TimerUpdateRequest,
    responses(
        (status = 200, description = "Timer stored", body = GameView),
        (status = 400, description = "Level out of range or inconsistent flags"),
        (status = 403, description = "Caller is not the creator"),
        (status = 409, description = "Tournament is not in progress")
    )
)]
pub async fn write_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Valid(Json(payload)): Valid<Json<TimerUpdateRequest>>,
) -> Result<Json<GameView>, AppError> {
    let caller = session_identity(&headers);
    let game = game_service::write_timer(
        state.game_store(),
        id,
        caller.as_deref(),
        payload.into(),
        SystemTime::now(),
    )
    .await?;
    Ok(Json(game.into()))
}

fn session_identity(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
}
