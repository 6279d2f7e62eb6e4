//! `POST /contact`: forward a contact-form message to the clinic inbox.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::api::validation::ValidatedJson;
use crate::mail::contact_email;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 5000, message = "Message must be between 1 and 5000 characters"))]
    pub message: String,
}

pub async fn send(
    State(ctx): State<ApiContext>,
    ValidatedJson(req): ValidatedJson<ContactRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (subject, body) = contact_email(&req.first_name, &req.last_name, &req.email, &req.message);
    ctx.core
        .mailer
        .send(&ctx.core.config.mail.inbox, &subject, &body)
        .await?;
    Ok(Json(MessageResponse::new("Message sent successfully")))
}
