//! Appointment endpoints.
//!
//! - `POST /appointment`: patient books with a verified doctor
//! - `POST /appointment/for-patient`: verified doctor books for a patient
//! - `GET /appointment/patient`, `GET /appointment/doctor`
//! - `PUT /appointment/:id/status`, `PUT /appointment/:id/cancel`
//! - `GET /appointment/available-slots?doctorId=&date=`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext};
use crate::api::validation::{
    validate_date, validate_status, validate_time, validate_uuid, ValidatedJson,
};
use crate::appointment::{available_slots, can_cancel, parse_date, starts_in_past};
use crate::authorization::Caller;
use crate::db::repository::{
    booked_times, get_appointment, get_doctor, get_patient, insert_appointment,
    list_doctor_appointments, list_patient_appointments, set_appointment_status, slot_taken,
};
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, DoctorAppointment, PatientAppointment};

const SLOT_TAKEN: &str = "The requested appointment time is already booked";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct BookRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub doctor_id: String,
    #[validate(custom(function = "validate_date"))]
    pub appointment_date: String,
    #[validate(custom(function = "validate_time"))]
    pub time: String,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct BookForPatientRequest {
    #[validate(custom(function = "validate_uuid"))]
    pub patient_id: String,
    #[validate(custom(function = "validate_date"))]
    pub appointment_date: String,
    #[validate(custom(function = "validate_time"))]
    pub time: String,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusRequest {
    #[validate(custom(function = "validate_status"))]
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub doctor_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub message: String,
    pub appointment: Appointment,
}

#[derive(Serialize)]
pub struct PatientAppointments {
    pub appointments: Vec<PatientAppointment>,
}

#[derive(Serialize)]
pub struct DoctorAppointments {
    pub appointments: Vec<DoctorAppointment>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub available_slots: Vec<String>,
}

/// Shared booking path: start time not past, slot free, insert as `Scheduled`.
fn book(
    conn: &Connection,
    patient_id: Uuid,
    doctor_id: Uuid,
    date: &str,
    time: &str,
    notes: String,
) -> Result<Appointment, ApiError> {
    let date = parse_date(date)
        .ok_or_else(|| ApiError::field("appointmentDate", "Date must be in YYYY-MM-DD format"))?;
    let time = time.trim().to_string();
    if starts_in_past(date, &time, Local::now().naive_local()) {
        return Err(ApiError::field(
            "appointmentDate",
            "Appointment date cannot be in the past",
        ));
    }

    if slot_taken(conn, &doctor_id, date, &time)? {
        return Err(ApiError::Conflict(SLOT_TAKEN.into()));
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id,
        date,
        time,
        status: AppointmentStatus::Scheduled,
        notes,
    };
    insert_appointment(conn, &appointment)?;
    Ok(appointment)
}

/// `POST /appointment`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<BookRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let doctor_id = parse_id(&req.doctor_id, "Doctor")?;

    let conn = ctx.core.open_db()?;
    get_doctor(&conn, &doctor_id)?
        .filter(|d| d.is_verified)
        .ok_or_else(|| ApiError::NotFound("Doctor not found or not verified".into()))?;

    let appointment = book(
        &conn,
        patient.id,
        doctor_id,
        &req.appointment_date,
        &req.time,
        req.notes,
    )?;

    tracing::info!(appointment_id = %appointment.id, %doctor_id, "appointment booked");
    Ok((
        StatusCode::CREATED,
        Json(AppointmentResponse {
            message: "Appointment created successfully".into(),
            appointment,
        }),
    ))
}

/// `POST /appointment/for-patient`
pub async fn create_for_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ValidatedJson(req): ValidatedJson<BookForPatientRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let doctor = caller
        .verified_doctor()
        .ok_or_else(|| ApiError::NotFound("Doctor not found or not verified".into()))?;
    let patient_id = parse_id(&req.patient_id, "Patient")?;

    let conn = ctx.core.open_db()?;
    get_patient(&conn, &patient_id)?.ok_or_else(|| ApiError::not_found("Patient"))?;

    let appointment = book(
        &conn,
        patient_id,
        doctor.id,
        &req.appointment_date,
        &req.time,
        req.notes,
    )?;

    tracing::info!(appointment_id = %appointment.id, doctor_id = %doctor.id, "appointment booked by doctor");
    Ok((
        StatusCode::CREATED,
        Json(AppointmentResponse {
            message: "Appointment created successfully".into(),
            appointment,
        }),
    ))
}

/// `GET /appointment/patient`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<PatientAppointments>, ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let conn = ctx.core.open_db()?;
    let appointments = list_patient_appointments(&conn, &patient.id)?;
    Ok(Json(PatientAppointments { appointments }))
}

/// `GET /appointment/doctor`
pub async fn list_for_doctor(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<DoctorAppointments>, ApiError> {
    let doctor = caller
        .doctor()
        .ok_or_else(|| ApiError::not_found("Doctor profile"))?;
    let conn = ctx.core.open_db()?;
    let appointments = list_doctor_appointments(&conn, &doctor.id)?;
    Ok(Json(DoctorAppointments { appointments }))
}

/// `PUT /appointment/:id/status`: the booked doctor sets any status.
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<String>,
    ValidatedJson(req): ValidatedJson<StatusRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let doctor = caller
        .doctor()
        .ok_or_else(|| ApiError::not_found("Doctor profile"))?;
    let appointment_id = parse_id(&appointment_id, "Appointment")?;
    let status: AppointmentStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::field("status", "Unknown appointment status"))?;

    let conn = ctx.core.open_db()?;
    let mut appointment = get_appointment(&conn, &appointment_id)?
        .filter(|a| a.doctor_id == doctor.id)
        .ok_or_else(|| ApiError::not_found("Appointment"))?;

    let reviving = appointment.status == AppointmentStatus::Cancelled
        && status != AppointmentStatus::Cancelled;
    if reviving && slot_taken(&conn, &appointment.doctor_id, appointment.date, &appointment.time)? {
        return Err(ApiError::Conflict(SLOT_TAKEN.into()));
    }

    set_appointment_status(&conn, &appointment.id, status)?;
    appointment.status = status;

    Ok(Json(AppointmentResponse {
        message: format!("Appointment {} successfully", status.as_str().to_lowercase()),
        appointment,
    }))
}

/// `PUT /appointment/:id/cancel`: the booking patient cancels before the start time.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment_id = parse_id(&appointment_id, "Appointment")?;
    let patient_id = caller.patient().map(|p| p.id);

    let conn = ctx.core.open_db()?;
    let mut appointment = get_appointment(&conn, &appointment_id)?
        .filter(|a| Some(a.patient_id) == patient_id)
        .ok_or_else(|| ApiError::not_found("Appointment"))?;

    if !can_cancel(appointment.date, &appointment.time, Local::now().naive_local()) {
        return Err(ApiError::Invalid("Cannot cancel past appointments".into()));
    }

    set_appointment_status(&conn, &appointment.id, AppointmentStatus::Cancelled)?;
    appointment.status = AppointmentStatus::Cancelled;

    tracing::info!(%appointment_id, "appointment cancelled");
    Ok(Json(AppointmentResponse {
        message: "Appointment cancelled successfully".into(),
        appointment,
    }))
}

/// `GET /appointment/available-slots`
pub async fn available(
    State(ctx): State<ApiContext>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let (Some(doctor_id), Some(date)) = (query.doctor_id, query.date) else {
        return Err(ApiError::Invalid("Doctor ID and date are required".into()));
    };
    let date = parse_date(&date)
        .ok_or_else(|| ApiError::Invalid("Date must be in YYYY-MM-DD format".into()))?;
    let doctor_id = parse_id(&doctor_id, "Doctor")?;

    let conn = ctx.core.open_db()?;
    get_doctor(&conn, &doctor_id)?
        .filter(|d| d.is_verified)
        .ok_or_else(|| ApiError::NotFound("Doctor not found or not verified".into()))?;

    let booked = booked_times(&conn, &doctor_id, date)?;
    Ok(Json(SlotsResponse {
        date,
        available_slots: available_slots(&booked),
    }))
}
