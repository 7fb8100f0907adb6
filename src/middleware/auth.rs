use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{
    AppState,
    error::AppError,
    utils::{token_fingerprint, verify_token},
};

pub fn revoked_token_key(token: &str) -> String {
    format!("auth:revoked:{}", token_fingerprint(token))
}

/// Requires a valid, unrevoked bearer token and exposes its `Claims` to handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| AppError::Unauthorized("Authentication required".into()))?;
    let token = bearer.token();

    let claims = verify_token(token, &state.config).map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    // A revocation store outage must not lock everyone out.
    match state.sessions.get(&revoked_token_key(token)).await {
        Ok(Some(_)) => return Err(AppError::Unauthorized("Token has been revoked".into())),
        Ok(None) => {}
        Err(e) => tracing::warn!("Could not check token revocation: {}", e),
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
