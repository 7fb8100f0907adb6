use axum::{
    extract::{Extension, Json, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    utils::Claims,
    validation::{FieldError, ValidatedJson},
};

use super::model::{INVALID_STATUS, Trip, TripInput, TripList, TripListQuery, TripPage};

fn not_found() -> AppError {
    AppError::NotFound("Trip not found".into())
}

fn owner(claims: &Claims) -> AppResult<Uuid> {
    claims
        .user_id()
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

#[axum::debug_handler]
pub async fn list_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<TripListQuery>, QueryRejection>,
) -> AppResult<Json<TripPage>> {
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    match Trip::list(&state.pool, owner(&claims)?, &query).await? {
        TripList::Page(page) => Ok(Json(page)),
        TripList::InvalidStatus => Err(AppError::Validation(vec![FieldError::new(
            "status",
            INVALID_STATUS,
        )])),
    }
}

#[axum::debug_handler]
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(input): ValidatedJson<TripInput>,
) -> AppResult<(StatusCode, Json<Trip>)> {
    let trip = Trip::create(&state.pool, owner(&claims)?, input).await?;
    tracing::info!("Created trip {} for user {}", trip.id, trip.user_id);
    Ok((StatusCode::CREATED, Json(trip)))
}

#[axum::debug_handler]
pub async fn get_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Trip>> {
    Trip::find(&state.pool, id, owner(&claims)?)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[axum::debug_handler]
pub async fn update_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<TripInput>,
) -> AppResult<Json<Trip>> {
    Trip::update(&state.pool, id, owner(&claims)?, input)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[axum::debug_handler]
pub async fn delete_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if Trip::delete(&state.pool, id, owner(&claims)?).await? {
        tracing::info!("Deleted trip {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
