use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the blind clock store.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::list_games,
        crate::routes::game::get_game,
        crate::routes::game::update_status,
        crate::routes::game::replace_blind_levels,
        crate::routes::game::write_timer,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::BlindLevelDto,
            crate::dto::game::BlindStructureRequest,
            crate::dto::game::StatusUpdateRequest,
            crate::dto::game::TimerUpdateRequest,
            crate::dto::game::GameView,
            crate::dto::game::GameListItem,
            crate::dao::models::TournamentStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game records and the replicated tournament clock"),
    )
)]
pub struct ApiDoc;
