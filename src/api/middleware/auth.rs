//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it as a session
//! token, loads the account and its linked profiles, and injects the
//! resulting `Caller` into request extensions for downstream handlers.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::authorization::Caller;
use crate::crypto::TokenPurpose;
use crate::db::repository::get_user;

/// Require a valid session token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    // 1. Extract bearer token
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::InvalidCredentials)?;

    // 2. Signature, expiry, purpose
    let claims = ctx.core.tokens.verify(token, TokenPurpose::Session)?;

    // 3. Load the account and its profiles
    let caller = {
        let conn = ctx.core.open_db()?;
        let user = get_user(&conn, &claims.sub)?.ok_or_else(|| ApiError::not_found("User"))?;
        if !user.is_active || user.token_version != claims.ver {
            return Err(ApiError::InvalidCredentials);
        }
        Caller::load(&conn, user)?
    }; // Connection dropped here, before any .await

    // 4. Inject caller for downstream handlers
    req.extensions_mut().insert(caller);

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
