//! HTTP surface: start matches, read matches, manage models.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use arena_orchestrator::error::ArenaError;

use crate::start;
use crate::store::SqliteStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
}

pub fn router(store: SqliteStore) -> Router {
    Router::new()
        .route("/api/matches/start", post(start_match))
        .route("/api/matches/{id}", get(get_match))
        .route("/api/models", get(list_models).post(create_model))
        .with_state(AppState { store })
}

type ApiError = (StatusCode, String);

fn internal(error: anyhow::Error) -> ApiError {
    error!("request failed: {error:#}");
    (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
}

#[derive(Deserialize)]
pub struct StartMatchRequest {
    pub white_model_id: i64,
    pub black_model_id: i64,
}

#[derive(Serialize)]
pub struct StartMatchResponse {
    pub match_id: i64,
}

async fn start_match(
    State(state): State<AppState>,
    Json(payload): Json<StartMatchRequest>,
) -> Result<Json<StartMatchResponse>, ApiError> {
    match start::start_match(&state.store, payload.white_model_id, payload.black_model_id).await {
        Ok(match_id) => Ok(Json(StartMatchResponse { match_id })),
        Err(ArenaError::Config(message)) => Err((StatusCode::NOT_FOUND, message)),
        Err(ArenaError::Store(error)) => Err(internal(error)),
    }
}

async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let row = state
        .store
        .get_match(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("match {id} not found")))?;
    let moves = state.store.match_moves(id).await.map_err(internal)?;
    Ok(Json(json!({ "match": row, "moves": moves })))
}

async fn list_models(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let models = state.store.list_models().await.map_err(internal)?;
    Ok(Json(json!(models)))
}

#[derive(Deserialize)]
pub struct CreateModelRequest {
    pub name: String,
    pub provider_id: String,
}

async fn create_model(
    State(state): State<AppState>,
    Json(payload): Json<CreateModelRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if payload.name.trim().is_empty() || payload.provider_id.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "name and provider_id are required".to_string(),
        ));
    }
    let model = state
        .store
        .create_model(payload.name.trim(), payload.provider_id.trim())
        .await
        .map_err(|error| {
            // SQLite unique constraint violation. The constraint message
            // sits below the anyhow context, so match on the whole chain.
            if format!("{error:#}").contains("UNIQUE constraint failed") {
                (
                    StatusCode::CONFLICT,
                    "A model with this provider_id already exists".to_string(),
                )
            } else {
                internal(error)
            }
        })?;
    Ok((StatusCode::CREATED, Json(json!(model))))
}
