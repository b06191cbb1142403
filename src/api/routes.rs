use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        // Event search
        .route("/v1/events/topic", get(handlers::events_by_topic))
        .route("/v1/events/speaker", get(handlers::events_by_speaker))
        .route("/v1/events/suggested", get(handlers::suggested_events))
        .route("/v1/events/music/topic", get(handlers::music_events_by_topic))
        .route("/v1/events/music/artist", get(handlers::music_events_by_artist))
        .route("/v1/events/batch", post(handlers::events_for_ids))
        // Map payload shaping
        .route("/v1/map/features", post(handlers::map_features))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CorsLayer::permissive())
}
