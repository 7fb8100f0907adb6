use axum::extract::{Json, Query, State, rejection::QueryRejection};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{AppError, AppResult},
    places::{Place, PlacesError},
    validation::FieldError,
};

const DEFAULT_PLACE_TYPE: &str = "tourist_attraction";

#[derive(Debug, Deserialize)]
pub struct PlaceQuery {
    query: Option<String>,
    #[serde(rename = "type")]
    place_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlacesResponse {
    places: Vec<Place>,
}

#[axum::debug_handler]
pub async fn search_places(
    State(state): State<AppState>,
    params: Result<Query<PlaceQuery>, QueryRejection>,
) -> AppResult<Json<PlacesResponse>> {
    let Query(params) = params.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation(vec![FieldError::new("query", "Required")]))?;
    let place_type = params
        .place_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_PLACE_TYPE);

    match state.places.search(query, place_type).await {
        Ok(Some(places)) if !places.is_empty() => Ok(Json(PlacesResponse { places })),
        Ok(_) => Err(AppError::NotFound("No results found".into())),
        Err(PlacesError::NotConfigured) => Err(AppError::Internal(
            "Google Places API key is not configured".into(),
        )),
        Err(e) => {
            tracing::error!("Places search for {:?} failed: {}", query, e);
            Err(AppError::Internal("Failed to fetch places".into()))
        }
    }
}
