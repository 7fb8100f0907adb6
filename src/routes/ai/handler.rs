use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{
    AppState,
    ai::{AiError, ItineraryContext, PromptContext, RecommendationContext, TravelTipsContext},
    error::{AppError, AppResult},
    validation::ValidatedJson,
};

use super::model::{
    ContentResponse, ItineraryResponse, PromptRequest, RecommendationsResponse,
    TravelTipsResponse,
};

/// Serves `ctx` from the response cache, generating it on a miss.
async fn generate_cached<C>(state: &AppState, ctx: &C) -> Result<String, AiError>
where
    C: PromptContext + Sync + 'static,
{
    let key = ctx.cache_key();
    let prompt = ctx.prompt();
    let model = Arc::clone(&state.ai);

    state
        .responses
        .get_or_generate(&key, move || async move {
            tracing::info!("Generating {} with AI provider", C::KIND);
            model.generate(&prompt).await
        })
        .await
}

pub async fn recommendations(
    State(state): State<AppState>,
    ValidatedJson(ctx): ValidatedJson<RecommendationContext>,
) -> AppResult<Json<RecommendationsResponse>> {
    let recommendations = generate_cached(&state, &ctx)
        .await
        .map_err(|e| AppError::from_ai(e, "Failed to get recommendations"))?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

pub async fn itinerary(
    State(state): State<AppState>,
    ValidatedJson(ctx): ValidatedJson<ItineraryContext>,
) -> AppResult<Json<ItineraryResponse>> {
    let itinerary = generate_cached(&state, &ctx)
        .await
        .map_err(|e| AppError::from_ai(e, "Failed to generate itinerary"))?;
    Ok(Json(ItineraryResponse { itinerary }))
}

pub async fn travel_tips(
    State(state): State<AppState>,
    ValidatedJson(ctx): ValidatedJson<TravelTipsContext>,
) -> AppResult<Json<TravelTipsResponse>> {
    let tips = generate_cached(&state, &ctx)
        .await
        .map_err(|e| AppError::from_ai(e, "Failed to get travel tips"))?;
    Ok(Json(TravelTipsResponse { tips }))
}

pub async fn generate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PromptRequest>,
) -> AppResult<Json<ContentResponse>> {
    let content = state
        .ai
        .generate(&req.prompt)
        .await
        .map_err(|e| AppError::from_ai(e, "Failed to generate content"))?;
    Ok(Json(ContentResponse { content }))
}
