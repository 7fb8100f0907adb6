use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors, rate_limit},
    routes,
};

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/destinations", get(routes::destination::list_destinations))
        .route("/destinations/{id}", get(routes::destination::get_destination))
        .route("/places", get(routes::place::search_places))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/refresh-token", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/destinations",
            post(routes::destination::create_destination),
        )
        .route(
            "/destinations/{id}",
            put(routes::destination::update_destination)
                .delete(routes::destination::delete_destination),
        )
        .route(
            "/trips",
            get(routes::trip::list_trips).post(routes::trip::create_trip),
        )
        .route(
            "/trips/{id}",
            get(routes::trip::get_trip)
                .put(routes::trip::update_trip)
                .delete(routes::trip::delete_trip),
        )
}

/// AI endpoints. The limiter runs after authentication and before body validation.
fn ai_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/ai/recommendations", post(routes::ai::recommendations))
        .route("/ai/itinerary", post(routes::ai::itinerary))
        .route("/ai/travel-tips", post(routes::ai::travel_tips))
        .route("/ai/generate", post(routes::ai::generate))
        .route_layer(from_fn_with_state(
            Arc::clone(&state.rate_limiter),
            rate_limit,
        ))
}

pub fn create_router(state: AppState) -> Router {
    // Layers added last run first, so authentication wraps the AI limiter.
    let protected = account_routes()
        .merge(ai_routes(&state))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new().merge(public_routes()).merge(protected);

    Router::new()
        .nest(&state.config.api_base_uri, api)
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        ai::AiError,
        middleware::revoked_token_key,
        test_support::{StubModel, test_state},
        utils::generate_token,
    };

    fn token_for(state: &AppState) -> String {
        let (token, _) = generate_token(
            "6f1c1d7e-4b8a-4d3e-9a43-1f6b2f6d9a10",
            "ada@example.com",
            &state.config,
        )
        .unwrap();
        token
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-real-ip", "203.0.113.7");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn beach_week() -> Value {
        json!({
            "budget": "moderate",
            "duration": "week",
            "interests": ["beach"],
            "travelStyle": "relaxation",
            "season": "summer"
        })
    }

    #[tokio::test]
    async fn identical_preferences_generate_once() {
        let model = StubModel::replying("Try Lisbon.");
        let state = test_state(model.clone(), 50);
        let token = token_for(&state);
        let app = create_router(state);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/ai/recommendations", Some(&token), beach_week()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-limit"], "50");
            assert_eq!(
                json_body(response).await,
                json!({ "recommendations": "Try Lisbon." })
            );
        }
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let model = StubModel::replying("unused");
        let state = test_state(model.clone(), 50);
        let token = token_for(&state);
        let app = create_router(state);

        let mut body = beach_week();
        body.as_object_mut().unwrap().remove("travelStyle");
        let response = app
            .oneshot(post_json("/api/ai/recommendations", Some(&token), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["errors"][0]["field"], "travelStyle");
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn ai_routes_require_a_token() {
        let app = create_router(test_state(StubModel::replying("unused"), 50));
        let response = app
            .oneshot(post_json("/api/ai/recommendations", None, beach_week()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let state = test_state(StubModel::replying("unused"), 50);
        let token = token_for(&state);
        state
            .sessions
            .set(&revoked_token_key(&token), "revoked", Duration::from_secs(60))
            .await
            .unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(post_json("/api/ai/recommendations", Some(&token), beach_week()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], "Token has been revoked");
    }

    #[tokio::test]
    async fn logout_revokes_the_presented_token() {
        let state = test_state(StubModel::replying("Pack light."), 50);
        let token = token_for(&state);
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/api/auth/logout", Some(&token), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_json("/api/auth/refresh-token", Some(&token), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn requests_over_the_limit_get_429() {
        let model = StubModel::replying("Try Lisbon.");
        let state = test_state(model.clone(), 2);
        let token = token_for(&state);
        let app = create_router(state);

        for remaining in ["1", "0"] {
            let response = app
                .clone()
                .oneshot(post_json("/api/ai/recommendations", Some(&token), beach_week()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        }

        let response = app
            .oneshot(post_json("/api/ai/recommendations", Some(&token), beach_week()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let body = json_body(response).await;
        assert_eq!(body["error"], "Too many requests");
        assert!(body["retryAfter"].as_u64().unwrap() > 0);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn provider_rate_limit_becomes_429() {
        let model = StubModel::failing(AiError::Provider {
            status: Some(429),
            message: "rate limit exceeded: quota exhausted".into(),
        });
        let state = test_state(model.clone(), 50);
        let token = token_for(&state);
        let app = create_router(state);

        let body = json!({
            "destination": "Kyoto",
            "duration": "5 days",
            "preferences": {"travelStyle": "cultural", "interests": ["temples"], "budget": "luxury"}
        });
        let response = app
            .oneshot(post_json("/api/ai/itinerary", Some(&token), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            json_body(response).await["message"],
            "AI service rate limit exceeded. Please try again later."
        );
    }

    #[tokio::test]
    async fn other_provider_failures_become_500_and_are_not_cached() {
        let model = StubModel::failing(AiError::Transport("connection reset".into()));
        let state = test_state(model.clone(), 50);
        let token = token_for(&state);
        let app = create_router(state);

        let body = json!({
            "destination": "Oslo",
            "preferences": {"travelStyle": "adventure", "budget": "budget", "season": "winter"}
        });
        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/ai/travel-tips", Some(&token), body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(
                json_body(response).await,
                json!({ "error": "Internal server error", "message": "Failed to get travel tips" })
            );
        }
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn free_form_generation_is_not_cached() {
        let model = StubModel::replying("Hello.");
        let state = test_state(model.clone(), 50);
        let token = token_for(&state);
        let app = create_router(state);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json("/api/ai/generate", Some(&token), json!({"prompt": "Hi"})))
                .await
                .unwrap();
            assert_eq!(json_body(response).await, json!({ "content": "Hello." }));
        }
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn places_needs_a_query_and_a_key() {
        let app = create_router(test_state(StubModel::replying("unused"), 50));

        let response = app
            .clone()
            .oneshot(Request::get("/api/places").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(
                Request::get("/api/places?query=museums")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await["message"],
            "Google Places API key is not configured"
        );
    }
}
