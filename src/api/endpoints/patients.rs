//! Patient profile endpoints.
//!
//! - `POST /patient`: create the caller's profile, promote role
//! - `GET /patient/profile`, `PUT /patient/profile`
//! - `GET /patient/medical-data[/:query]`: clinical summary via patient lookup

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::api::validation::{validate_date, validate_gender, validate_phone, ValidatedJson};
use crate::appointment::parse_date;
use crate::authorization::Caller;
use crate::db::repository::{
    find_patients, insert_patient, national_id_taken, set_user_role, update_patient,
};
use crate::models::enums::{Gender, Role};
use crate::models::Patient;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePatientRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(custom(function = "validate_date"))]
    pub birth_date: String,
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "National ID is required"))]
    pub national_id: String,
    pub medical_history: String,
    pub allergies: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Address cannot be empty"))]
    pub address: Option<String>,
    pub medical_history: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPatientView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
pub struct CreatedPatient {
    pub message: &'static str,
    pub patient: CreatedPatientView,
}

#[derive(Serialize)]
pub struct PatientResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub patient: Patient,
}

/// Clinical subset returned by the medical-data lookup.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalData {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub medical_history: String,
    pub allergies: String,
}

impl From<Patient> for MedicalData {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name,
            last_name: p.last_name,
            birth_date: p.birth_date,
            gender: p.gender,
            medical_history: p.medical_history,
            allergies: p.allergies,
        }
    }
}

#[derive(Serialize)]
pub struct MedicalDataResponse {
    pub patient: MedicalData,
}

/// `POST /patient`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<CreatedPatient>), ApiError> {
    let birth_date = parse_date(&req.birth_date)
        .ok_or_else(|| ApiError::field("birthDate", "Date must be in YYYY-MM-DD format"))?;
    let gender: Gender = req
        .gender
        .parse()
        .map_err(|_| ApiError::field("gender", "Gender must be Male, Female or Other"))?;

    let conn = ctx.core.open_db()?;
    if national_id_taken(&conn, &req.national_id)? {
        return Err(ApiError::Conflict(
            "Patient with this national ID already exists".into(),
        ));
    }
    if caller.patient().is_some() {
        return Err(ApiError::Conflict(
            "Patient profile already exists for this user".into(),
        ));
    }

    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        birth_date,
        gender,
        address: req.address,
        national_id: req.national_id,
        medical_history: req.medical_history,
        allergies: req.allergies,
        user_id: caller.user.id,
    };

    let tx = conn.unchecked_transaction()?;
    insert_patient(&tx, &patient)?;
    set_user_role(&tx, &caller.user.id, Role::Patient)?;
    tx.commit()?;

    tracing::info!(user_id = %caller.user.id, patient_id = %patient.id, "patient profile created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedPatient {
            message: "Patient profile created successfully",
            patient: CreatedPatientView {
                id: patient.id,
                first_name: patient.first_name,
                last_name: patient.last_name,
            },
        }),
    ))
}

/// `GET /patient/profile`
pub async fn profile(Extension(caller): Extension<Caller>) -> Result<Json<PatientResponse>, ApiError> {
    let patient = caller
        .patient
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    Ok(Json(PatientResponse {
        message: None,
        patient,
    }))
}

/// `PUT /patient/profile`
pub async fn update_profile(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<UpdatePatientRequest>,
) -> Result<Json<PatientResponse>, ApiError> {
    let mut patient = caller
        .patient
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;

    if let Some(first_name) = req.first_name {
        patient.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        patient.last_name = last_name;
    }
    if let Some(phone) = req.phone {
        patient.phone = phone;
    }
    if let Some(address) = req.address {
        patient.address = address;
    }
    if let Some(medical_history) = req.medical_history {
        patient.medical_history = medical_history;
    }
    if let Some(allergies) = req.allergies {
        patient.allergies = allergies;
    }

    let conn = ctx.core.open_db()?;
    update_patient(&conn, &patient)?;

    Ok(Json(PatientResponse {
        message: Some("Patient profile updated successfully"),
        patient,
    }))
}

/// `GET /patient/medical-data`: the caller's own summary.
pub async fn own_medical_data(
    Extension(caller): Extension<Caller>,
) -> Result<Json<MedicalDataResponse>, ApiError> {
    let patient = caller
        .patient
        .ok_or_else(|| ApiError::not_found("Patient"))?;
    Ok(Json(MedicalDataResponse {
        patient: patient.into(),
    }))
}

/// `GET /patient/medical-data/:query`: first lookup match the caller may see.
pub async fn medical_data(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(query): Path<String>,
) -> Result<Json<MedicalDataResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = find_patients(&conn, &query)?
        .into_iter()
        .find(|p| caller.can_read_patient_data(&p.id, None))
        .ok_or_else(|| ApiError::not_found("Patient"))?;
    Ok(Json(MedicalDataResponse {
        patient: patient.into(),
    }))
}
