//! Recommendation endpoints.

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
    get_patient, get_recommendation, insert_recommendation, list_doctor_recommendations,
    list_patient_recommendations, update_recommendation,
};
use crate::models::{DoctorRecommendation, PatientRecommendation, Recommendation};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateRecommendationRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub patient_id: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateRecommendationRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Serialize)]
pub struct RecommendationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub recommendation: Recommendation,
}

#[derive(Serialize)]
pub struct PatientRecommendations {
    pub recommendations: Vec<PatientRecommendation>,
}

#[derive(Serialize)]
pub struct DoctorRecommendations {
    pub recommendations: Vec<DoctorRecommendation>,
}

/// `POST /recommendation`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<CreateRecommendationRequest>,
) -> Result<(StatusCode, Json<RecommendationResponse>), ApiError> {
    let doctor = caller
        .verified_doctor()
        .ok_or_else(|| ApiError::NotFound("Doctor profile not found or not verified".into()))?;
    let patient_id = parse_id(&req.patient_id, "Patient")?;

    let conn = ctx.core.open_db()?;
    get_patient(&conn, &patient_id)?.ok_or_else(|| ApiError::not_found("Patient"))?;

    let recommendation = Recommendation {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id: doctor.id,
        content: req.content,
        issued_date: Utc::now(),
    };
    insert_recommendation(&conn, &recommendation)?;

    Ok((
        StatusCode::CREATED,
        Json(RecommendationResponse {
            message: Some("Recommendation created successfully"),
            recommendation,
        }),
    ))
}

/// `GET /recommendation/patient`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<PatientRecommendations>, ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let conn = ctx.core.open_db()?;
    let recommendations = list_patient_recommendations(&conn, &patient.id)?;
    Ok(Json(PatientRecommendations { recommendations }))
}

/// `GET /recommendation/doctor`
pub async fn list_for_doctor(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<DoctorRecommendations>, ApiError> {
    let doctor = caller
        .verified_doctor()
        .ok_or_else(|| ApiError::NotFound("Doctor profile not found or not verified".into()))?;
    let conn = ctx.core.open_db()?;
    let recommendations = list_doctor_recommendations(&conn, &doctor.id)?;
    Ok(Json(DoctorRecommendations { recommendations }))
}

/// `GET /recommendation/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(recommendation_id): Path<String>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let recommendation_id = parse_id(&recommendation_id, "Recommendation")?;
    let conn = ctx.core.open_db()?;
    let recommendation = get_recommendation(&conn, &recommendation_id)?
        .filter(|r| caller.can_read_patient_data(&r.patient_id, Some(&r.doctor_id)))
        .ok_or_else(|| ApiError::not_found("Recommendation"))?;
    Ok(Json(RecommendationResponse {
        message: None,
        recommendation,
    }))
}

/// `PUT /recommendation/:id`: the author rewrites the content; the issue
/// date moves to now.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(recommendation_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateRecommendationRequest>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let doctor_id = caller.doctor().map(|d| d.id);
    let recommendation_id = parse_id(&recommendation_id, "Recommendation")?;

    let conn = ctx.core.open_db()?;
    let mut recommendation = get_recommendation(&conn, &recommendation_id)?
        .filter(|r| Some(r.doctor_id) == doctor_id)
        .ok_or_else(|| ApiError::not_found("Recommendation"))?;

    recommendation.content = req.content;
    recommendation.issued_date = Utc::now();
    update_recommendation(&conn, &recommendation)?;

    Ok(Json(RecommendationResponse {
        message: Some("Recommendation updated successfully"),
        recommendation,
    }))
}
