//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use dormduty_core::{
    domain::{Identity, User},
    ports::PortError,
};
use std::sync::Arc;

use crate::web::{response::HttpError, state::AppState};

/// Middleware that validates the bearer token against the auth provider.
///
/// If valid, inserts the caller's `Identity` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(PortError::Unauthorized)?;

    // 2. Verify it with the identity provider
    let identity = state.identity.verify_token(token).await?;

    // 3. Insert the identity into request extensions
    req.extensions_mut().insert(identity);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

/// Loads the stored profile of the authenticated caller.
pub async fn load_caller(state: &AppState, identity: &Identity) -> Result<User, HttpError> {
    state.db.get_user(identity.user_id).await.map_err(|e| match e {
        PortError::NotFound(_) => HttpError::forbidden("register your profile before using DormDuty"),
        other => other.into(),
    })
}
