//! Google Places text search, enriched with per-place details.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;

const MAX_PLACES: usize = 5;
const DETAIL_FIELDS: &str = "name,formatted_address,rating,photos,price_level,editorial_summary,formatted_phone_number,website,opening_hours,reviews";

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("places API key is not configured")]
    NotConfigured,
    #[error("places request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub location: PlaceLocation,
    pub rating: Option<f64>,
    pub photos: Vec<PlacePhoto>,
    pub price_level: Option<u8>,
    pub types: Vec<String>,
    pub details: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PlaceLocation {
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlacePhoto {
    pub reference: String,
    pub url: String,
}

#[derive(Deserialize)]
struct TextSearchResponse {
    results: Option<Vec<SearchResult>>,
}

#[derive(Deserialize)]
struct SearchResult {
    place_id: String,
    name: String,
    geometry: Geometry,
    formatted_address: Option<String>,
    rating: Option<f64>,
    #[serde(default)]
    photos: Vec<PhotoRef>,
    price_level: Option<u8>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct PhotoRef {
    photo_reference: String,
}

#[derive(Deserialize)]
struct DetailsResponse {
    result: Option<Value>,
}

impl PlacesClient {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.ai_request_timeout())
            .build()?;
        Ok(Self {
            http,
            api_key: config.places_api_key.clone(),
            base_url: config.places_api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns `Ok(None)` when the provider has no result list for the query.
    pub async fn search(
        &self,
        query: &str,
        place_type: &str,
    ) -> Result<Option<Vec<Place>>, PlacesError> {
        let key = self.api_key.as_deref().ok_or(PlacesError::NotConfigured)?;

        let search: TextSearchResponse = self
            .http
            .get(format!("{}/textsearch/json", self.base_url))
            .query(&[("query", query), ("type", place_type), ("key", key)])
            .send()
            .await?
            .json()
            .await?;

        let Some(results) = search.results else {
            return Ok(None);
        };

        let places = results
            .into_iter()
            .take(MAX_PLACES)
            .map(|result| self.with_details(result, key));
        Ok(Some(join_all(places).await))
    }

    async fn with_details(&self, result: SearchResult, key: &str) -> Place {
        let details = match self.details(&result.place_id, key).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Place details failed for {}: {}", result.place_id, e);
                None
            }
        };

        let photos = result
            .photos
            .into_iter()
            .map(|photo| PlacePhoto {
                url: format!(
                    "{}/photo?maxwidth=800&photo_reference={}&key={}",
                    self.base_url, photo.photo_reference, key
                ),
                reference: photo.photo_reference,
            })
            .collect();

        Place {
            id: result.place_id,
            name: result.name,
            location: PlaceLocation {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
                address: result.formatted_address,
            },
            rating: result.rating,
            photos,
            price_level: result.price_level,
            types: result.types,
            details,
        }
    }

    async fn details(&self, place_id: &str, key: &str) -> Result<Option<Value>, PlacesError> {
        let response: DetailsResponse = self
            .http
            .get(format!("{}/details/json", self.base_url))
            .query(&[("place_id", place_id), ("fields", DETAIL_FIELDS), ("key", key)])
            .send()
            .await?
            .json()
            .await?;
        Ok(response.result)
    }
}
