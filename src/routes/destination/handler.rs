use axum::{
    extract::{Json, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    validation::ValidatedJson,
};

use super::model::{Destination, DestinationInput, DestinationPage, ListQuery};

fn not_found() -> AppError {
    AppError::NotFound("Destination not found".into())
}

#[axum::debug_handler]
pub async fn list_destinations(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<DestinationPage>> {
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    Ok(Json(Destination::list(&state.pool, &query).await?))
}

#[axum::debug_handler]
pub async fn get_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Destination>> {
    Destination::find_by_id(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[axum::debug_handler]
pub async fn create_destination(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<DestinationInput>,
) -> AppResult<(StatusCode, Json<Destination>)> {
    let destination = Destination::create(&state.pool, input).await?;
    tracing::info!("Created destination {}", destination.id);
    Ok((StatusCode::CREATED, Json(destination)))
}

#[axum::debug_handler]
pub async fn update_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<DestinationInput>,
) -> AppResult<Json<Destination>> {
    Destination::update(&state.pool, id, input)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[axum::debug_handler]
pub async fn delete_destination(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if Destination::delete(&state.pool, id).await? {
        tracing::info!("Deleted destination {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
