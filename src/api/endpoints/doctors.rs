//! Doctor profile endpoints.
//!
//! - `POST /doctor`: create the caller's profile (unverified), promote role
//! - `GET /doctor/profile`, `PUT /doctor/profile`
//! - `GET /doctor/all`, `GET /doctor/:doctor_id`: public, verified only

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::api::validation::{validate_phone, ValidatedJson};
use crate::authorization::Caller;
use crate::db::repository::{
    get_doctor, insert_doctor, list_verified_doctors, set_user_role, update_doctor,
};
use crate::models::enums::Role;
use crate::models::{Doctor, DoctorSummary};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Specialization is required"))]
    pub specialization: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

/// Patch of the editable fields. Verification status is not among them.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, message = "Specialization cannot be empty"))]
    pub specialization: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedDoctor {
    pub message: &'static str,
    pub doctor: DoctorSummary,
}

#[derive(Serialize)]
pub struct DoctorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub doctor: Doctor,
}

#[derive(Serialize)]
pub struct DoctorSummaryResponse {
    pub doctor: DoctorSummary,
}

#[derive(Serialize)]
pub struct DoctorListResponse {
    pub doctors: Vec<DoctorSummary>,
}

/// `POST /doctor`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<CreatedDoctor>), ApiError> {
    if caller.doctor().is_some() {
        return Err(ApiError::Conflict(
            "Doctor profile already exists for this user".into(),
        ));
    }

    let doctor = Doctor {
        id: Uuid::new_v4(),
        first_name: req.first_name,
        last_name: req.last_name,
        specialization: req.specialization,
        phone: req.phone,
        is_verified: false,
        user_id: caller.user.id,
    };

    let conn = ctx.core.open_db()?;
    let tx = conn.unchecked_transaction()?;
    insert_doctor(&tx, &doctor)?;
    set_user_role(&tx, &caller.user.id, Role::Doctor)?;
    tx.commit()?;

    tracing::info!(user_id = %caller.user.id, doctor_id = %doctor.id, "doctor profile created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedDoctor {
            message: "Doctor profile created successfully. It will be reviewed for verification.",
            doctor: doctor.summary(),
        }),
    ))
}

/// `GET /doctor/profile`
pub async fn profile(Extension(caller): Extension<Caller>) -> Result<Json<DoctorResponse>, ApiError> {
    let doctor = caller
        .doctor
        .ok_or_else(|| ApiError::not_found("Doctor profile"))?;
    Ok(Json(DoctorResponse {
        message: None,
        doctor,
    }))
}

/// `PUT /doctor/profile`
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<UpdateDoctorRequest>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let mut doctor = caller
        .doctor
        .ok_or_else(|| ApiError::not_found("Doctor profile"))?;

    if let Some(first_name) = req.first_name {
        doctor.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        doctor.last_name = last_name;
    }
    if let Some(specialization) = req.specialization {
        doctor.specialization = specialization;
    }
    if let Some(phone) = req.phone {
        doctor.phone = phone;
    }

    let conn = ctx.core.open_db()?;
    update_doctor(&conn, &doctor)?;

    Ok(Json(DoctorResponse {
        message: Some("Doctor profile updated successfully"),
        doctor,
    }))
}

/// `GET /doctor/all`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<DoctorListResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctors = list_verified_doctors(&conn)?
        .iter()
        .map(Doctor::summary)
        .collect();
    Ok(Json(DoctorListResponse { doctors }))
}

/// `GET /doctor/:doctor_id`: unverified doctors are invisible here.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(doctor_id): Path<String>,
) -> Result<Json<DoctorSummaryResponse>, ApiError> {
    let doctor_id = parse_id(&doctor_id, "Doctor")?;
    let conn = ctx.core.open_db()?;
    let doctor = get_doctor(&conn, &doctor_id)?
        .filter(|d| d.is_verified)
        .ok_or_else(|| ApiError::not_found("Doctor"))?;
    Ok(Json(DoctorSummaryResponse {
        doctor: doctor.summary(),
    }))
}
