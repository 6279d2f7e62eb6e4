//! Prescription endpoints. A prescription belongs to exactly one medical
//! record and inherits that record's access policy.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::api::validation::{validate_uuid, ValidatedJson};
use crate::authorization::Caller;
use crate::db::repository::{
    get_medical_record, get_prescription, insert_prescription, list_patient_prescriptions,
    record_has_prescription, update_prescription,
};
use crate::models::{PatientPrescription, Prescription};

const DUPLICATE: &str = "A prescription already exists for this medical record";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePrescriptionRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub medical_record_id: String,
    #[validate(length(min = 1, message = "Medications are required"))]
    pub medications: String,
    #[validate(length(min = 1, message = "Dosage is required"))]
    pub dosage: String,
    pub observations: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdatePrescriptionRequest {
    #[validate(length(min = 1, message = "Medications cannot be empty"))]
    pub medications: Option<String>,
    #[validate(length(min = 1, message = "Dosage cannot be empty"))]
    pub dosage: Option<String>,
    pub observations: Option<String>,
}

#[derive(Serialize)]
pub struct PrescriptionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub prescription: Prescription,
}

#[derive(Serialize)]
pub struct PrescriptionList {
    pub prescriptions: Vec<PatientPrescription>,
}

/// `POST /prescription`: verified author of the record only.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<PrescriptionResponse>), ApiError> {
    let doctor = caller
        .verified_doctor()
        .ok_or_else(|| ApiError::NotFound("Doctor profile not found or not verified".into()))?;
    let record_id = parse_id(&req.medical_record_id, "Medical record")?;

    let conn = ctx.core.open_db()?;
    let record = get_medical_record(&conn, &record_id)?
        .filter(|r| r.doctor_id == doctor.id)
        .ok_or_else(|| ApiError::not_found("Medical record"))?;

    if record_has_prescription(&conn, &record.id)? {
        return Err(ApiError::Conflict(DUPLICATE.into()));
    }

    let prescription = Prescription {
        id: Uuid::new_v4(),
        medical_record_id: record.id,
        medications: req.medications,
        dosage: req.dosage,
        observations: req.observations,
    };
    insert_prescription(&conn, &prescription)?;

    tracing::info!(prescription_id = %prescription.id, record_id = %record.id, "prescription created");
    Ok((
        StatusCode::CREATED,
        Json(PrescriptionResponse {
            message: Some("Prescription created successfully"),
            prescription,
        }),
    ))
}

/// `GET /prescription/patient`
pub async fn list_own(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<PrescriptionList>, ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let conn = ctx.core.open_db()?;
    let prescriptions = list_patient_prescriptions(&conn, &patient.id)?;
    Ok(Json(PrescriptionList { prescriptions }))
}

/// `GET /prescription/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(prescription_id): Path<String>,
) -> Result<Json<PrescriptionResponse>, ApiError> {
    let prescription_id = parse_id(&prescription_id, "Prescription")?;
    let conn = ctx.core.open_db()?;

    let prescription = get_prescription(&conn, &prescription_id)?
        .ok_or_else(|| ApiError::not_found("Prescription"))?;
    let record = get_medical_record(&conn, &prescription.medical_record_id)?
        .filter(|r| caller.can_read_patient_data(&r.patient_id, Some(&r.doctor_id)));
    if record.is_none() {
        return Err(ApiError::not_found("Prescription"));
    }

    Ok(Json(PrescriptionResponse {
        message: None,
        prescription,
    }))
}

/// `PUT /prescription/:id`: author of the parent record only.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(prescription_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdatePrescriptionRequest>,
) -> Result<Json<PrescriptionResponse>, ApiError> {
    let doctor_id = caller.doctor().map(|d| d.id);
    let prescription_id = parse_id(&prescription_id, "Prescription")?;
    let conn = ctx.core.open_db()?;

    let mut prescription = get_prescription(&conn, &prescription_id)?
        .ok_or_else(|| ApiError::not_found("Prescription"))?;
    let authored = get_medical_record(&conn, &prescription.medical_record_id)?
        .is_some_and(|r| Some(r.doctor_id) == doctor_id);
    if !authored {
        return Err(ApiError::not_found("Prescription"));
    }

    if let Some(medications) = req.medications {
        prescription.medications = medications;
    }
    if let Some(dosage) = req.dosage {
        prescription.dosage = dosage;
    }
    if let Some(observations) = req.observations {
        prescription.observations = observations;
    }
    update_prescription(&conn, &prescription)?;

    Ok(Json(PrescriptionResponse {
        message: Some("Prescription updated successfully"),
        prescription,
    }))
}
