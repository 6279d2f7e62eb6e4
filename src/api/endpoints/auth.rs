//! Account endpoints: registration, login and password-reset requests.
//!
//! - `POST /auth/register`
//! - `POST /auth/login`
//! - `POST /auth/reset-password`

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::api::validation::ValidatedJson;
use crate::authorization::Caller;
use crate::crypto::{hash_password, verify_password, TokenPurpose};
use crate::db::repository::{
    delete_user, get_user_by_email, insert_user, username_taken,
};
use crate::mail::{password_reset_email, registration_email};
use crate::models::User;

const INVALID_LOGIN: &str = "Invalid email or password";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"))]
    pub username: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

/// Hashing runs on the blocking pool.
pub(crate) async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {e}")))
}

async fn verify_blocking(password: String, stored: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("verify task failed: {e}")))?
        .map_err(ApiError::from)
}

/// `POST /auth/register`: create an unconfirmed account and mail a
/// confirmation link.
pub async fn register(
    State(ctx): State<ApiContext>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    {
        let conn = ctx.core.open_db()?;
        if get_user_by_email(&conn, &req.email)?.is_some() {
            return Err(ApiError::Conflict("Email is already registered".into()));
        }
        if username_taken(&conn, &req.username)? {
            return Err(ApiError::Conflict("Username is already taken".into()));
        }
    }

    let password_hash = hash_blocking(req.password).await?;
    let user = User::new(&req.username, &req.email, password_hash);
    {
        let conn = ctx.core.open_db()?;
        insert_user(&conn, &user)?;
    }

    let token = ctx
        .core
        .tokens
        .issue(user.id, Vec::new(), TokenPurpose::Confirm, user.token_version)?;
    let (subject, body) = registration_email(&ctx.core.config.frontend_url, &token);
    if let Err(err) = ctx.core.mailer.send(&user.email, subject, &body).await {
        tracing::error!(user_id = %user.id, error = %err, "confirmation mail failed; rolling back registration");
        let conn = ctx.core.open_db()?;
        delete_user(&conn, &user.id)?;
        return Err(err.into());
    }

    tracing::info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully, please check your email for confirmation.",
            user,
        }),
    ))
}

/// `POST /auth/login`: every failure reads the same to the client.
pub async fn login(
    State(ctx): State<ApiContext>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = {
        let conn = ctx.core.open_db()?;
        get_user_by_email(&conn, &req.email)?
    };
    let user = match user {
        Some(user) if user.is_confirmed && user.is_active => user,
        _ => return Err(ApiError::NotFound(INVALID_LOGIN.into())),
    };

    if !verify_blocking(req.password, user.password_hash.clone()).await? {
        return Err(ApiError::NotFound(INVALID_LOGIN.into()));
    }

    let caller = {
        let conn = ctx.core.open_db()?;
        Caller::load(&conn, user)?
    };
    let token = ctx.core.tokens.issue(
        caller.user.id,
        caller.roles(),
        TokenPurpose::Session,
        caller.user.token_version,
    )?;

    tracing::info!(user_id = %caller.user.id, "login");
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        user: caller.user,
    }))
}

/// `POST /auth/reset-password`: mail a single-use reset link.
pub async fn reset_password(
    State(ctx): State<ApiContext>,
    ValidatedJson(req): ValidatedJson<ResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = {
        let conn = ctx.core.open_db()?;
        get_user_by_email(&conn, &req.email)?
    };
    let user = match user {
        Some(user) if user.is_confirmed => user,
        _ => return Err(ApiError::NotFound("Email not found".into())),
    };

    let token = ctx
        .core
        .tokens
        .issue(user.id, Vec::new(), TokenPurpose::Reset, user.token_version)?;
    let (subject, body) = password_reset_email(&ctx.core.config.frontend_url, &token);
    ctx.core.mailer.send(&user.email, subject, &body).await?;

    Ok(Json(MessageResponse::new(
        "Password reset email sent, please check your email.",
    )))
}
