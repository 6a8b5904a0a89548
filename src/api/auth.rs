//! Caller identification for the REST API
//!
//! Every `/download` route needs `Authorization: Bearer <token>`, where the
//! token is the caller's catalog access token. The middleware asks the catalog
//! who the token belongs to and stores the resulting [`Caller`] in the request
//! extensions for the handlers.

use crate::api::AppState;
use crate::error::{ApiError, Error};
use crate::types::Caller;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Middleware that resolves the bearer token to a [`Caller`]
///
/// Returns 401 Unauthorized when the header is missing, malformed, or the
/// catalog rejects the token. Other catalog failures are reported with their
/// own status so an outage is not mistaken for a bad token.
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(token) => token.to_string(),
        Err(message) => return unauthorized_response(message),
    };

    match state.downloader.catalog().current_user(&token).await {
        Ok(user_id) => {
            tracing::debug!(user = %user_id, "Caller identified");
            request
                .extensions_mut()
                .insert(Caller::new(user_id, token));
            next.run(request).await
        }
        Err(Error::Unauthorized(reason)) => {
            tracing::debug!(reason, "Rejected access token");
            unauthorized_response("Invalid or expired access token")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not validate access token");
            e.into_response()
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> std::result::Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Malformed Authorization header")?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or("Authorization header must use the Bearer scheme")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authorization header must use the Bearer scheme");
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("Empty bearer token");
    }
    Ok(token)
}

/// Create a 401 Unauthorized response with a JSON error body
fn unauthorized_response(message: &str) -> Response {
    let error = ApiError::unauthorized(message);

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(error),
    )
        .into_response()
}
