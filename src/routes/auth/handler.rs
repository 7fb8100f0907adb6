use std::time::Duration;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, AppResult},
    middleware::revoked_token_key,
    utils::{Claims, generate_token},
    validation::ValidatedJson,
};

use super::model::{
    AuthResponse, LoginRequest, MessageResponse, RegisterRequest, TokenResponse, User,
};

fn issue_token(user_id: Uuid, email: &str, state: &AppState) -> AppResult<(String, i64)> {
    generate_token(&user_id.to_string(), email, &state.config).map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        AppError::Internal("Failed to generate token".into())
    })
}

fn claims_user_id(claims: &Claims) -> AppResult<Uuid> {
    claims
        .user_id()
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = User::create(&state.pool, req).await?;
    let (token, expires_at) = issue_token(user.id, &user.email, &state)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            token,
            expires_at,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = User::find_by_email(&state.pool, &req.email)
        .await?
        .ok_or_else(invalid)?;
    if !user.verify_login(req.password).await? {
        tracing::info!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    let (token, expires_at) = issue_token(user.id, &user.email, &state)?;
    Ok(Json(AuthResponse {
        user,
        token,
        expires_at,
    }))
}

#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<TokenResponse>> {
    let user_id = claims_user_id(&claims)?;
    let (token, expires_at) = issue_token(user_id, &claims.email, &state)?;
    Ok(Json(TokenResponse { token, expires_at }))
}

/// Revokes the presented token until it would have expired anyway.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> AppResult<Json<MessageResponse>> {
    let remaining = (claims.exp - Utc::now().timestamp()).max(1) as u64;

    state
        .sessions
        .set(
            &revoked_token_key(bearer.token()),
            &claims.sub,
            Duration::from_secs(remaining),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to revoke token: {}", e);
            AppError::Internal("Failed to log out".into())
        })?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<User>> {
    let user_id = claims_user_id(&claims)?;
    User::find_by_id(&state.pool, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
