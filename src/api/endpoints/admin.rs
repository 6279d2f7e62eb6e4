//! Administration endpoints. Every handler requires the Admin role and
//! reports anything else as not found.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, MessageResponse};
use crate::api::validation::{validate_role, ValidatedJson};
use crate::authorization::Caller;
use crate::db::repository::{
    count_appointments, count_doctors, count_patients, count_users, deactivate_user, get_doctor,
    get_doctor_by_user, get_patient_by_user, get_user, list_doctor_accounts, list_patient_accounts,
    list_users, set_user_role, verify_doctor,
};
use crate::models::enums::Role;
use crate::models::{Doctor, DoctorAccount, Patient, PatientAccount, SystemStats, User};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RoleRequest {
    #[validate(custom(function = "validate_role"))]
    pub role: String,
}

#[derive(Serialize)]
pub struct VerifiedResponse {
    pub message: &'static str,
    pub doctor: Doctor,
}

#[derive(Serialize)]
pub struct DoctorAccounts {
    pub doctors: Vec<DoctorAccount>,
}

#[derive(Serialize)]
pub struct PatientAccounts {
    pub patients: Vec<PatientAccount>,
}

#[derive(Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Serialize)]
pub struct UserDetail {
    pub user: User,
    pub doctor: Option<Doctor>,
    pub patient: Option<Patient>,
}

#[derive(Serialize)]
pub struct RoleResponse {
    pub message: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub stats: SystemStats,
}

fn require_admin(caller: &Caller) -> Result<(), ApiError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::NotFound(
            "You do not have permission to perform this action".into(),
        ))
    }
}

/// `PUT /admin/doctors/:doctorId/verify`
pub async fn verify(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(doctor_id): Path<String>,
) -> Result<Json<VerifiedResponse>, ApiError> {
    require_admin(&caller)?;
    let doctor_id = parse_id(&doctor_id, "Doctor")?;

    let conn = ctx.core.open_db()?;
    if !verify_doctor(&conn, &doctor_id)? {
        return Err(ApiError::not_found("Doctor"));
    }
    let doctor = get_doctor(&conn, &doctor_id)?.ok_or_else(|| ApiError::not_found("Doctor"))?;

    tracing::info!(%doctor_id, admin = %caller.user.id, "doctor verified");
    Ok(Json(VerifiedResponse {
        message: "Doctor has been verified successfully",
        doctor,
    }))
}

/// `GET /admin/doctors`
pub async fn doctors(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<DoctorAccounts>, ApiError> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(DoctorAccounts {
        doctors: list_doctor_accounts(&conn)?,
    }))
}

/// `GET /admin/patients`
pub async fn patients(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<PatientAccounts>, ApiError> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(PatientAccounts {
        patients: list_patient_accounts(&conn)?,
    }))
}

/// `GET /admin/users`
pub async fn users(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<UserList>, ApiError> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(UserList {
        users: list_users(&conn)?,
    }))
}

/// `GET /admin/users/:userId`
pub async fn user_detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    require_admin(&caller)?;
    let user_id = parse_id(&user_id, "User")?;

    let conn = ctx.core.open_db()?;
    let user = get_user(&conn, &user_id)?.ok_or_else(|| ApiError::not_found("User"))?;
    let doctor = get_doctor_by_user(&conn, &user_id)?;
    let patient = get_patient_by_user(&conn, &user_id)?;
    Ok(Json(UserDetail {
        user,
        doctor,
        patient,
    }))
}

/// `PUT /admin/users/:userId/role`
pub async fn set_role(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<String>,
    ValidatedJson(req): ValidatedJson<RoleRequest>,
) -> Result<Json<RoleResponse>, ApiError> {
    require_admin(&caller)?;
    let user_id = parse_id(&user_id, "User")?;
    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::field("role", "Unknown role"))?;

    let conn = ctx.core.open_db()?;
    if !set_user_role(&conn, &user_id, role)? {
        return Err(ApiError::not_found("User"));
    }
    let user = get_user(&conn, &user_id)?.ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(%user_id, %role, admin = %caller.user.id, "user role changed");
    Ok(Json(RoleResponse {
        message: format!("User role updated to {role} successfully"),
        user,
    }))
}

/// `PUT /admin/users/:userId/deactivate`
pub async fn deactivate(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_admin(&caller)?;
    let user_id = parse_id(&user_id, "User")?;

    let conn = ctx.core.open_db()?;
    if !deactivate_user(&conn, &user_id)? {
        return Err(ApiError::not_found("User"));
    }

    tracing::info!(%user_id, admin = %caller.user.id, "user deactivated");
    Ok(Json(MessageResponse::new(
        "User has been deactivated successfully",
    )))
}

/// `GET /admin/stats`
pub async fn stats(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<StatsResponse>, ApiError> {
    require_admin(&caller)?;
    let conn = ctx.core.open_db()?;
    let (doctors, verified_doctors) = count_doctors(&conn)?;
    Ok(Json(StatsResponse {
        stats: SystemStats {
            users: count_users(&conn)?,
            doctors,
            verified_doctors,
            patients: count_patients(&conn)?,
            appointments: count_appointments(&conn)?,
        },
    }))
}
