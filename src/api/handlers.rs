use crate::api::AppState;
use crate::chat::{Bounds, FeatureCollection, DEFAULT_BOUNDS_BUFFER};
use crate::error::{AppError, Result};
use crate::models::Event;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Search term plus optional result cap (absent or `<= 0` means no cap)
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestedParams {
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub count: usize,
    pub events: Vec<Event>,
}

impl From<Vec<Event>> for EventsResponse {
    fn from(events: Vec<Event>) -> Self {
        Self {
            count: events.len(),
            events,
        }
    }
}

/// Events by topic
pub async fn events_by_topic(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<EventsResponse>> {
    let events = state
        .store
        .find_events_by_topic(&params.q, params.max.unwrap_or(0))
        .await?;
    Ok(Json(events.into()))
}

/// Events by speaker
pub async fn events_by_speaker(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<EventsResponse>> {
    let events = state
        .store
        .find_events_by_speaker(&params.q, params.max.unwrap_or(0))
        .await?;
    Ok(Json(events.into()))
}

/// Suggested events
pub async fn suggested_events(
    State(state): State<AppState>,
    Query(params): Query<SuggestedParams>,
) -> Result<Json<EventsResponse>> {
    let events = state
        .store
        .find_suggested_events(params.max.unwrap_or(0))
        .await?;
    Ok(Json(events.into()))
}

/// Music events by topic
pub async fn music_events_by_topic(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<EventsResponse>> {
    let events = state
        .store
        .find_music_events_by_topic(&params.q, params.max.unwrap_or(0))
        .await?;
    Ok(Json(events.into()))
}

/// Music events by artist
pub async fn music_events_by_artist(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<EventsResponse>> {
    let events = state
        .store
        .find_music_events_by_artist(&params.q, params.max.unwrap_or(0))
        .await?;
    Ok(Json(events.into()))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<String>,
}

/// Events for a set of ids
pub async fn events_for_ids(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<EventsResponse>> {
    if request.ids.iter().any(|id| id.is_empty()) {
        return Err(AppError::Validation("event ids must not be empty".to_string()));
    }

    let events = state.store.get_events_for_ids(&request.ids).await?;
    Ok(Json(events.into()))
}

#[derive(Debug, Deserialize)]
pub struct MapFeaturesRequest {
    pub points: Vec<Value>,
    #[serde(default)]
    pub buffer: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MapFeaturesResponse {
    pub collection: FeatureCollection,
    pub bounds: Option<Bounds>,
}

/// Shape bot points into a feature collection with padded bounds
pub async fn map_features(Json(request): Json<MapFeaturesRequest>) -> Result<Json<MapFeaturesResponse>> {
    let collection = FeatureCollection::from_points(&request.points);
    let bounds = collection.bounds(request.buffer.unwrap_or(DEFAULT_BOUNDS_BUFFER));

    Ok(Json(MapFeaturesResponse { collection, bounds }))
}
