/// OpenAPI documentation generation.
pub mod documentation;
/// Game records, tournament lifecycle and timer writes.
pub mod game_service;
/// Health check service.
pub mod health_service;
