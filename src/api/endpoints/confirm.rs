//! Emailed-link confirmations.
//!
//! - `GET /confirm/registration?token=`
//! - `POST /confirm/reset-password?token=`

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::api::endpoints::auth::hash_blocking;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::api::validation::ValidatedJson;
use crate::crypto::{Claims, TokenPurpose};
use crate::db::repository::{confirm_user, get_user, reset_password};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct NewPasswordRequest {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

fn verify_link_token(
    ctx: &ApiContext,
    query: &TokenQuery,
    purpose: TokenPurpose,
) -> Result<Claims, ApiError> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Invalid("Token is required".into()))?;
    ctx.core
        .tokens
        .verify(token, purpose)
        .map_err(|_| ApiError::Invalid("Invalid or expired token".into()))
}

/// `GET /confirm/registration`: mark the account confirmed.
pub async fn registration(
    State(ctx): State<ApiContext>,
    Query(query): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    let claims = verify_link_token(&ctx, &query, TokenPurpose::Confirm)?;

    let conn = ctx.core.open_db()?;
    let user = get_user(&conn, &claims.sub)?.ok_or_else(|| ApiError::not_found("User"))?;
    if user.is_confirmed {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::new("User is already confirmed")),
        )
            .into_response());
    }
    confirm_user(&conn, &user.id)?;

    tracing::info!(user_id = %user.id, "registration confirmed");
    Ok(Json(MessageResponse::new("Registration confirmed successfully")).into_response())
}

/// `POST /confirm/reset-password`: set a new password. The token carries
/// the account's token version and stops working once the version moves.
pub async fn reset(
    State(ctx): State<ApiContext>,
    Query(query): Query<TokenQuery>,
    ValidatedJson(req): ValidatedJson<NewPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = verify_link_token(&ctx, &query, TokenPurpose::Reset)?;

    {
        let conn = ctx.core.open_db()?;
        let user = get_user(&conn, &claims.sub)?.ok_or_else(|| ApiError::not_found("User"))?;
        if user.token_version != claims.ver {
            return Err(ApiError::Invalid("Reset token has already been used".into()));
        }
    }

    let password_hash = hash_blocking(req.password).await?;
    let conn = ctx.core.open_db()?;
    if !reset_password(&conn, &claims.sub, &password_hash, claims.ver)? {
        return Err(ApiError::Invalid("Reset token has already been used".into()));
    }

    tracing::info!(user_id = %claims.sub, "password reset");
    Ok(Json(MessageResponse::new("Password reset successfully")))
}
