//! Medical record endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::api::validation::{validate_uuid, ValidatedJson};
use crate::authorization::Caller;
use crate::db::repository::{
    get_medical_record, get_medical_record_detail, get_patient, insert_medical_record,
    list_patient_records, update_medical_record,
};
use crate::models::{MedicalRecord, MedicalRecordDetail, MedicalRecordEntry};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateRecordRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub patient_id: String,
    #[validate(length(min = 1, message = "Diagnosis is required"))]
    pub diagnosis: String,
    #[validate(length(min = 1, message = "Observations are required"))]
    pub observations: String,
    #[validate(length(min = 1, message = "Recommended treatment is required"))]
    pub recommended_treatment: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[validate(length(min = 1, message = "Diagnosis cannot be empty"))]
    pub diagnosis: Option<String>,
    #[validate(length(min = 1, message = "Observations cannot be empty"))]
    pub observations: Option<String>,
    #[validate(length(min = 1, message = "Recommended treatment cannot be empty"))]
    pub recommended_treatment: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub message: &'static str,
    pub medical_record: MedicalRecord,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordList {
    pub medical_records: Vec<MedicalRecordEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetailResponse {
    pub medical_record: MedicalRecordDetail,
}

fn unverified() -> ApiError {
    ApiError::NotFound("Doctor profile not found or not verified".into())
}

/// `POST /medicalRecord`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<CreateRecordRequest>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiError> {
    let doctor = caller.verified_doctor().ok_or_else(unverified)?;
    let patient_id = parse_id(&req.patient_id, "Patient")?;

    let conn = ctx.core.open_db()?;
    get_patient(&conn, &patient_id)?.ok_or_else(|| ApiError::not_found("Patient"))?;

    let record = MedicalRecord {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id: doctor.id,
        record_date: Utc::now(),
        diagnosis: req.diagnosis,
        observations: req.observations,
        recommended_treatment: req.recommended_treatment,
    };
    insert_medical_record(&conn, &record)?;

    tracing::info!(record_id = %record.id, doctor_id = %doctor.id, "medical record created");
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            message: "Medical record created successfully",
            medical_record: record,
        }),
    ))
}

/// `GET /medicalRecord/patient`
pub async fn list_own(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<RecordList>, ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let conn = ctx.core.open_db()?;
    let medical_records = list_patient_records(&conn, &patient.id)?;
    Ok(Json(RecordList { medical_records }))
}

/// `GET /medicalRecord/patient/:patientId`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(patient_id): Path<String>,
) -> Result<Json<RecordList>, ApiError> {
    caller.verified_doctor().ok_or_else(unverified)?;
    let patient_id = parse_id(&patient_id, "Patient")?;

    let conn = ctx.core.open_db()?;
    get_patient(&conn, &patient_id)?.ok_or_else(|| ApiError::not_found("Patient"))?;
    let medical_records = list_patient_records(&conn, &patient_id)?;
    Ok(Json(RecordList { medical_records }))
}

/// `GET /medicalRecord/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(record_id): Path<String>,
) -> Result<Json<RecordDetailResponse>, ApiError> {
    let record_id = parse_id(&record_id, "Medical record")?;
    let conn = ctx.core.open_db()?;
    let medical_record = get_medical_record_detail(&conn, &record_id)?
        .filter(|d| caller.can_read_patient_data(&d.record.patient_id, Some(&d.record.doctor_id)))
        .ok_or_else(|| ApiError::not_found("Medical record"))?;
    Ok(Json(RecordDetailResponse { medical_record }))
}

/// `PUT /medicalRecord/:id`: only the verified author may edit.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(record_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateRecordRequest>,
) -> Result<Json<RecordResponse>, ApiError> {
    let doctor = caller.verified_doctor().ok_or_else(unverified)?;
    let record_id = parse_id(&record_id, "Medical record")?;

    let conn = ctx.core.open_db()?;
    let mut record = get_medical_record(&conn, &record_id)?
        .filter(|r| r.doctor_id == doctor.id)
        .ok_or_else(|| ApiError::not_found("Medical record"))?;

    if let Some(diagnosis) = req.diagnosis {
        record.diagnosis = diagnosis;
    }
    if let Some(observations) = req.observations {
        record.observations = observations;
    }
    if let Some(treatment) = req.recommended_treatment {
        record.recommended_treatment = treatment;
    }
    update_medical_record(&conn, &record)?;

    Ok(Json(RecordResponse {
        message: "Medical record updated successfully",
        medical_record: record,
    }))
}
