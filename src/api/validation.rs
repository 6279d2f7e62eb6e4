//! Request validation: the `ValidatedJson` extractor and the custom field
//! validators shared by request schemas.

use std::borrow::Cow;
use std::sync::LazyLock;

use axum::extract::{FromRequest, Request};
use axum::Json;
use regex::Regex;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::api::error::{ApiError, FieldErrors};
use crate::appointment::{parse_date, parse_time};
use crate::models::enums::{AppointmentStatus, Gender, Role};

/// JSON body that has been deserialized and passed `Validate`.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Invalid(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value ({})", e.code),
                })
                .collect();
            fields.insert(camel_case(&field.to_string()), messages);
        }
        ApiError::Validation(fields)
    }
}

/// `medical_record_id` → `medicalRecordId`
fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{10,15}$").unwrap());

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(invalid("phone", "Phone number must be 10 to 15 digits, optionally starting with +"))
    }
}

pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| invalid("date", "Date must be in YYYY-MM-DD format"))
}

pub fn validate_time(value: &str) -> Result<(), ValidationError> {
    parse_time(value)
        .map(|_| ())
        .ok_or_else(|| invalid("time", "Time must be in HH:MM format"))
}

pub fn validate_gender(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Gender>()
        .map(|_| ())
        .map_err(|_| invalid("gender", "Gender must be Male, Female or Other"))
}

pub fn validate_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<AppointmentStatus>()
        .map(|_| ())
        .map_err(|_| invalid("status", "Unknown appointment status"))
}

pub fn validate_role(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Role>()
        .map(|_| ())
        .map_err(|_| invalid("role", "Role must be User, Doctor, Patient or Admin"))
}

pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| invalid("id", "Must be a valid id"))
}
