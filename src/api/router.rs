//! API router.
//!
//! Returns a composable `Router` with every CareLog endpoint mounted at the
//! root. Public routes (account flows, contact, health, the doctor
//! directory) only get the access log; everything else runs behind
//! `require_auth`.
//!
//! Middleware stack (outermost → innermost):
//! CORS → body limit → Extension(ApiContext) → Auth → Audit → Handler

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints::{
    admin, appointments, auth, confirm, contact, doctors, documents, health, medical_records,
    messages, patients, prescriptions, recommendations,
};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::{AppConfig, Environment, MAX_UPLOAD_BYTES};
use crate::core_state::CoreState;

/// Multipart framing overhead allowed on top of the file cap, so oversized
/// files reach the handler and get a clean 413.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let cors = cors_layer(&core.config);
    let ctx = ApiContext::new(core);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        // Profiles
        .route("/doctor", post(doctors::create))
        .route(
            "/doctor/profile",
            get(doctors::profile).put(doctors::update_profile),
        )
        .route("/patient", post(patients::create))
        .route(
            "/patient/profile",
            get(patients::profile).put(patients::update_profile),
        )
        .route("/patient/medical-data", get(patients::own_medical_data))
        .route("/patient/medical-data/:query", get(patients::medical_data))
        // Appointments
        .route("/appointment", post(appointments::create))
        .route(
            "/appointment/for-patient",
            post(appointments::create_for_patient),
        )
        .route("/appointment/patient", get(appointments::list_for_patient))
        .route("/appointment/doctor", get(appointments::list_for_doctor))
        .route(
            "/appointment/available-slots",
            get(appointments::available),
        )
        .route("/appointment/:id/status", put(appointments::update_status))
        .route("/appointment/:id/cancel", put(appointments::cancel))
        // Clinical records
        .route("/medicalRecord", post(medical_records::create))
        .route("/medicalRecord/patient", get(medical_records::list_own))
        .route(
            "/medicalRecord/patient/:patientId",
            get(medical_records::list_for_patient),
        )
        .route(
            "/medicalRecord/:id",
            get(medical_records::detail).put(medical_records::update),
        )
        .route("/prescription", post(prescriptions::create))
        .route("/prescription/patient", get(prescriptions::list_own))
        .route(
            "/prescription/:id",
            get(prescriptions::detail).put(prescriptions::update),
        )
        .route("/recommendation", post(recommendations::create))
        .route(
            "/recommendation/patient",
            get(recommendations::list_for_patient),
        )
        .route(
            "/recommendation/doctor",
            get(recommendations::list_for_doctor),
        )
        .route(
            "/recommendation/:id",
            get(recommendations::detail).put(recommendations::update),
        )
        // Messaging
        .route("/message", post(messages::send))
        .route("/message/conversations", get(messages::conversations))
        .route(
            "/message/conversation/:userId",
            get(messages::conversation),
        )
        .route("/message/:id/read", put(messages::mark_read))
        // Documents
        .route(
            "/document",
            get(documents::list_own).post(documents::upload),
        )
        .route(
            "/document/patient/:query",
            get(documents::list_for_patient),
        )
        .route(
            "/document/:id",
            get(documents::download).delete(documents::delete),
        )
        // Administration
        .route("/admin/doctors", get(admin::doctors))
        .route("/admin/doctors/:doctorId/verify", put(admin::verify))
        .route("/admin/patients", get(admin::patients))
        .route("/admin/users", get(admin::users))
        .route("/admin/users/:userId", get(admin::user_detail))
        .route("/admin/users/:userId/role", put(admin::set_role))
        .route("/admin/users/:userId/deactivate", put(admin::deactivate))
        .route("/admin/stats", get(admin::stats))
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/health", get(health::check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/confirm/registration", get(confirm::registration))
        .route("/confirm/reset-password", post(confirm::reset))
        .route("/contact", post(contact::send))
        .route("/doctor/all", get(doctors::list))
        .route("/doctor/:doctorId", get(doctors::detail))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    let router = Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD));

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Any origin in development; only the configured frontend in production.
fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    match config.environment {
        Environment::Development => Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(methods)
                .allow_headers(Any),
        ),
        Environment::Production => match config.frontend_url.parse::<HeaderValue>() {
            Ok(origin) => Some(
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods(methods)
                    .allow_headers(Any),
            ),
            Err(_) => {
                tracing::warn!(
                    frontend_url = %config.frontend_url,
                    "FRONTEND_URL is not a valid origin; CORS disabled"
                );
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Local, NaiveDate};
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::core_state::testing::test_core_state;
    use crate::db::repository::{insert_appointment, set_user_role, verify_doctor};
    use crate::mail::testing::RecordingMailer;
    use crate::models::enums::{AppointmentStatus, Role};
    use crate::models::Appointment;

    struct TestApp {
        router: Router,
        core: Arc<CoreState>,
        mailer: Arc<RecordingMailer>,
        _tmp: tempfile::TempDir,
    }

    fn test_app() -> TestApp {
        let (core, mailer, tmp) = test_core_state();
        TestApp {
            router: api_router(core.clone()),
            core,
            mailer,
            _tmp: tmp,
        }
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn register(app: &TestApp, username: &str, email: &str) -> StatusCode {
        let body = json!({ "username": username, "email": email, "password": "password123" });
        call(app, request("POST", "/auth/register", None, Some(body))).await.0
    }

    async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
        let body = json!({ "email": email, "password": password });
        call(app, request("POST", "/auth/login", None, Some(body))).await
    }

    /// Register, confirm through the mailed link, log in; returns the session token.
    async fn signup(app: &TestApp, username: &str) -> String {
        let email = format!("{username}@example.com");
        assert_eq!(register(app, username, &email).await, StatusCode::CREATED);
        let token = app.mailer.last_token_to(&email).unwrap();
        let (status, _) = call(
            app,
            request("GET", &format!("/confirm/registration?token={token}"), None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = login(app, &email, "password123").await;
        assert_eq!(status, StatusCode::OK);
        json["token"].as_str().unwrap().to_string()
    }

    async fn create_doctor(app: &TestApp, token: &str, verified: bool) -> Uuid {
        let body = json!({
            "firstName": "Gregory",
            "lastName": "House",
            "specialization": "Diagnostics",
            "phone": "+15551234567"
        });
        let (status, json) = call(app, request("POST", "/doctor", Some(token), Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = Uuid::parse_str(json["doctor"]["id"].as_str().unwrap()).unwrap();
        if verified {
            let conn = app.core.open_db().unwrap();
            assert!(verify_doctor(&conn, &id).unwrap());
        }
        id
    }

    async fn create_patient(app: &TestApp, token: &str, national_id: &str) -> (StatusCode, Value) {
        let body = json!({
            "firstName": "Lisa",
            "lastName": "Cuddy",
            "phone": "+15557654321",
            "birthDate": "1980-05-14",
            "gender": "Female",
            "address": "1 Princeton Way",
            "nationalId": national_id,
            "medicalHistory": "Asthma",
            "allergies": "Penicillin"
        });
        call(app, request("POST", "/patient", Some(token), Some(body))).await
    }

    async fn patient_id(app: &TestApp, token: &str, national_id: &str) -> Uuid {
        let (status, json) = create_patient(app, token, national_id).await;
        assert_eq!(status, StatusCode::CREATED);
        Uuid::parse_str(json["patient"]["id"].as_str().unwrap()).unwrap()
    }

    fn future_date() -> String {
        (Local::now().date_naive() + Duration::days(30))
            .format("%Y-%m-%d")
            .to_string()
    }

    // ── Authentication ──────────────────────────────────────

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app();
        let (status, json) = call(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let app = test_app();
        let (status, _) = call(&app, request("GET", "/doctor/profile", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &app,
            request("GET", "/doctor/profile", Some("not-a-jwt"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_responses_are_not_cached() {
        let app = test_app();
        let token = signup(&app, "cachecheck").await;
        let response = app
            .router
            .clone()
            .oneshot(request("GET", "/message/conversations", Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = test_app();
        let (status, _) = call(&app, request("GET", "/nonexistent", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let app = test_app();
        assert_eq!(
            register(&app, "first", "same@example.com").await,
            StatusCode::CREATED
        );
        assert_eq!(
            register(&app, "second", "SAME@example.com").await,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn invalid_registration_returns_field_map() {
        let app = test_app();
        let body = json!({ "username": "ab", "email": "nope", "password": "short" });
        let (status, json) = call(&app, request("POST", "/auth/register", None, Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["username"].is_array());
        assert!(json["email"].is_array());
        assert!(json["password"].is_array());
    }

    #[tokio::test]
    async fn unconfirmed_login_fails_like_wrong_password() {
        let app = test_app();
        register(&app, "pending", "pending@example.com").await;
        let (unconfirmed_status, unconfirmed) =
            login(&app, "pending@example.com", "password123").await;

        signup(&app, "confirmed").await;
        let (wrong_status, wrong) = login(&app, "confirmed@example.com", "wrongpassword").await;

        assert_eq!(unconfirmed_status, StatusCode::NOT_FOUND);
        assert_eq!(unconfirmed_status, wrong_status);
        assert_eq!(unconfirmed, wrong);
    }

    #[tokio::test]
    async fn failed_confirmation_mail_rolls_back_registration() {
        let app = test_app();
        app.mailer.fail.store(true, Ordering::SeqCst);
        assert_eq!(
            register(&app, "unlucky", "unlucky@example.com").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );

        app.mailer.fail.store(false, Ordering::SeqCst);
        assert_eq!(
            register(&app, "unlucky", "unlucky@example.com").await,
            StatusCode::CREATED
        );
    }

    #[tokio::test]
    async fn confirming_twice_is_rejected() {
        let app = test_app();
        register(&app, "twice", "twice@example.com").await;
        let token = app.mailer.last_token_to("twice@example.com").unwrap();
        let uri = format!("/confirm/registration?token={token}");

        assert_eq!(call(&app, request("GET", &uri, None, None)).await.0, StatusCode::OK);
        let (status, json) = call(&app, request("GET", &uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "User is already confirmed");
    }

    #[tokio::test]
    async fn reset_token_works_once() {
        let app = test_app();
        let old_session = signup(&app, "forgetful").await;

        let body = json!({ "email": "forgetful@example.com" });
        let (status, _) = call(&app, request("POST", "/auth/reset-password", None, Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        let token = app.mailer.last_token_to("forgetful@example.com").unwrap();
        let uri = format!("/confirm/reset-password?token={token}");

        let body = json!({ "password": "brand-new-password" });
        let (status, _) = call(&app, request("POST", &uri, None, Some(body.clone()))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = call(&app, request("POST", &uri, None, Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Reset token has already been used");

        assert_eq!(
            login(&app, "forgetful@example.com", "brand-new-password").await.0,
            StatusCode::OK
        );
        let (status, _) = call(
            &app,
            request("GET", "/message/conversations", Some(&old_session), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // ── Profiles ────────────────────────────────────────────

    #[tokio::test]
    async fn doctor_profile_roundtrip() {
        let app = test_app();
        let token = signup(&app, "house").await;
        create_doctor(&app, &token, false).await;

        let (status, json) = call(&app, request("GET", "/doctor/profile", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["doctor"]["firstName"], "Gregory");
        assert_eq!(json["doctor"]["lastName"], "House");
        assert_eq!(json["doctor"]["specialization"], "Diagnostics");
        assert_eq!(json["doctor"]["isVerified"], false);

        let (status, json) = login(&app, "house@example.com", "password123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["role"], "Doctor");

        let (status, _) = call(
            &app,
            request("POST", "/doctor", Some(&token), Some(json!({
                "firstName": "Again", "lastName": "Again",
                "specialization": "X", "phone": "+15551234567"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unverified_doctors_are_hidden_from_directory() {
        let app = test_app();
        let pending = signup(&app, "pending_doc").await;
        let pending_id = create_doctor(&app, &pending, false).await;
        let verified = signup(&app, "verified_doc").await;
        let verified_id = create_doctor(&app, &verified, true).await;

        let (status, json) = call(&app, request("GET", "/doctor/all", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let doctors = json["doctors"].as_array().unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0]["id"], verified_id.to_string());
        assert!(doctors[0].get("phone").is_none());

        let (status, _) = call(
            &app,
            request("GET", &format!("/doctor/{pending_id}"), None, None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn national_id_must_be_unique() {
        let app = test_app();
        let first = signup(&app, "patient_a").await;
        patient_id(&app, &first, "123").await;

        let second = signup(&app, "patient_b").await;
        let (status, json) = create_patient(&app, &second, "123").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "Patient with this national ID already exists");
    }

    #[tokio::test]
    async fn second_patient_profile_for_same_user_conflicts() {
        let app = test_app();
        let token = signup(&app, "twice").await;
        patient_id(&app, &token, "TW-1").await;

        let (status, json) = create_patient(&app, &token, "TW-2").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["message"], "Patient profile already exists for this user");
    }

    #[tokio::test]
    async fn patient_profile_update_changes_only_supplied_fields() {
        let app = test_app();
        let token = signup(&app, "mover").await;
        let pid = patient_id(&app, &token, "MV-1").await;

        let (status, json) = call(
            &app,
            request("PUT", "/patient/profile", Some(&token), Some(json!({
                "address": "221B Baker Street", "allergies": "None"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Patient profile updated successfully");

        let (status, json) = call(&app, request("GET", "/patient/profile", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let patient = &json["patient"];
        assert_eq!(patient["id"], pid.to_string());
        assert_eq!(patient["address"], "221B Baker Street");
        assert_eq!(patient["allergies"], "None");
        assert_eq!(patient["firstName"], "Lisa");
        assert_eq!(patient["phone"], "+15557654321");
        assert_eq!(patient["medicalHistory"], "Asthma");

        let (status, json) = call(
            &app,
            request("PUT", "/patient/profile", Some(&token), Some(json!({ "firstName": "" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["firstName"].is_array());
    }

    #[tokio::test]
    async fn medical_data_lookup_requires_verified_doctor() {
        let app = test_app();
        let patient = signup(&app, "lookup_patient").await;
        let pid = patient_id(&app, &patient, "LK-1").await;
        let nosy = signup(&app, "nosy").await;
        patient_id(&app, &nosy, "LK-2").await;
        let doctor = signup(&app, "lookup_doc").await;
        create_doctor(&app, &doctor, true).await;

        let (status, json) = call(
            &app,
            request("GET", "/patient/medical-data/LK-1", Some(&doctor), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patient"]["id"], pid.to_string());
        assert_eq!(json["patient"]["allergies"], "Penicillin");

        let (status, _) = call(
            &app,
            request("GET", "/patient/medical-data/LK-1", Some(&nosy), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            request("GET", "/patient/medical-data", Some(&patient), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patient"]["id"], pid.to_string());
    }

    // ── Appointments ────────────────────────────────────────

    #[tokio::test]
    async fn booking_conflicts_and_frees_slot_on_cancel() {
        let app = test_app();
        let doctor = signup(&app, "booked_doc").await;
        let doctor_id = create_doctor(&app, &doctor, true).await;
        let patient = signup(&app, "booker").await;
        patient_id(&app, &patient, "BK-1").await;
        let other = signup(&app, "second_booker").await;
        patient_id(&app, &other, "BK-2").await;
        let date = future_date();

        let booking = json!({
            "doctorId": doctor_id, "appointmentDate": date, "time": "10:00", "notes": "checkup"
        });
        let (status, json) = call(
            &app,
            request("POST", "/appointment", Some(&patient), Some(booking.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["appointment"]["status"], "Scheduled");
        let appointment_id = json["appointment"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            request("POST", "/appointment", Some(&other), Some(booking.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let slots_uri = format!("/appointment/available-slots?doctorId={doctor_id}&date={date}");
        let (status, json) = call(&app, request("GET", &slots_uri, Some(&patient), None)).await;
        assert_eq!(status, StatusCode::OK);
        let slots = json["availableSlots"].as_array().unwrap();
        assert_eq!(slots.len(), 15);
        assert!(!slots.contains(&json!("10:00")));

        let (status, _) = call(
            &app,
            request("PUT", &format!("/appointment/{appointment_id}/cancel"), Some(&other), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            request("PUT", &format!("/appointment/{appointment_id}/cancel"), Some(&patient), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["appointment"]["status"], "Cancelled");

        let (_, json) = call(&app, request("GET", "/appointment/patient", Some(&patient), None)).await;
        assert_eq!(json["appointments"].as_array().unwrap().len(), 1);
        assert_eq!(json["appointments"][0]["status"], "Cancelled");

        let (_, json) = call(&app, request("GET", &slots_uri, Some(&patient), None)).await;
        assert_eq!(json["availableSlots"].as_array().unwrap().len(), 16);

        let (status, _) = call(
            &app,
            request("POST", "/appointment", Some(&other), Some(booking)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        // Reviving the cancelled booking would double-book the slot.
        let (status, _) = call(
            &app,
            request(
                "PUT",
                &format!("/appointment/{appointment_id}/status"),
                Some(&doctor),
                Some(json!({ "status": "Confirmed" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn booking_requires_verified_doctor_and_future_date() {
        let app = test_app();
        let doctor = signup(&app, "unverified_doc").await;
        let doctor_id = create_doctor(&app, &doctor, false).await;
        let patient = signup(&app, "eager").await;
        patient_id(&app, &patient, "EG-1").await;

        let (status, json) = call(
            &app,
            request("POST", "/appointment", Some(&patient), Some(json!({
                "doctorId": doctor_id, "appointmentDate": future_date(), "time": "09:30"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Doctor not found or not verified");

        {
            let conn = app.core.open_db().unwrap();
            verify_doctor(&conn, &doctor_id).unwrap();
        }
        let (status, json) = call(
            &app,
            request("POST", "/appointment", Some(&patient), Some(json!({
                "doctorId": doctor_id, "appointmentDate": "2000-01-01", "time": "09:30"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["appointmentDate"].is_array());
    }

    #[tokio::test]
    async fn booking_earlier_today_is_rejected() {
        let app = test_app();
        let doctor = signup(&app, "early_doc").await;
        let doctor_id = create_doctor(&app, &doctor, true).await;
        let patient = signup(&app, "early_patient").await;
        patient_id(&app, &patient, "ER-1").await;
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

        let (status, json) = call(
            &app,
            request("POST", "/appointment", Some(&patient), Some(json!({
                "doctorId": doctor_id, "appointmentDate": today, "time": "00:00"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["appointmentDate"].is_array());

        let (_, json) = call(&app, request("GET", "/appointment/patient", Some(&patient), None)).await;
        assert!(json["appointments"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn past_appointment_cannot_be_cancelled() {
        let app = test_app();
        let doctor = signup(&app, "past_doc").await;
        let doctor_id = create_doctor(&app, &doctor, true).await;
        let patient = signup(&app, "past_patient").await;
        let pid = patient_id(&app, &patient, "PA-1").await;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: pid,
            doctor_id,
            date: NaiveDate::from_ymd_opt(2020, 3, 2).unwrap(),
            time: "10:00".into(),
            status: AppointmentStatus::Scheduled,
            notes: String::new(),
        };
        {
            let conn = app.core.open_db().unwrap();
            insert_appointment(&conn, &appointment).unwrap();
        }

        let (status, json) = call(
            &app,
            request("PUT", &format!("/appointment/{}/cancel", appointment.id), Some(&patient), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Cannot cancel past appointments");
    }

    #[tokio::test]
    async fn doctor_books_for_patient_and_updates_status() {
        let app = test_app();
        let doctor = signup(&app, "scheduler").await;
        create_doctor(&app, &doctor, true).await;
        let patient = signup(&app, "scheduled").await;
        let pid = patient_id(&app, &patient, "SC-1").await;

        let (status, json) = call(
            &app,
            request("POST", "/appointment/for-patient", Some(&doctor), Some(json!({
                "patientId": pid, "appointmentDate": future_date(), "time": "14:30"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["appointment"]["id"].as_str().unwrap().to_string();

        let (status, json) = call(
            &app,
            request(
                "PUT",
                &format!("/appointment/{id}/status"),
                Some(&doctor),
                Some(json!({ "status": "Confirmed" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Appointment confirmed successfully");

        let (_, json) = call(&app, request("GET", "/appointment/doctor", Some(&doctor), None)).await;
        assert_eq!(json["appointments"][0]["patient"]["firstName"], "Lisa");
        assert_eq!(json["appointments"][0]["status"], "Confirmed");
    }

    #[tokio::test]
    async fn available_slots_requires_params() {
        let app = test_app();
        let token = signup(&app, "slotless").await;
        let (status, json) = call(
            &app,
            request("GET", "/appointment/available-slots", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Doctor ID and date are required");
    }

    // ── Clinical records ────────────────────────────────────

    #[tokio::test]
    async fn record_prescription_flow() {
        let app = test_app();
        let doctor = signup(&app, "prescriber").await;
        create_doctor(&app, &doctor, true).await;
        let patient = signup(&app, "treated").await;
        let pid = patient_id(&app, &patient, "RX-1").await;
        let stranger = signup(&app, "stranger").await;
        patient_id(&app, &stranger, "RX-2").await;

        let (status, json) = call(
            &app,
            request("POST", "/medicalRecord", Some(&doctor), Some(json!({
                "patientId": pid,
                "diagnosis": "Bronchitis",
                "observations": "Persistent cough",
                "recommendedTreatment": "Rest"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let record_id = json["medicalRecord"]["id"].as_str().unwrap().to_string();

        let prescription = json!({
            "medicalRecordId": record_id,
            "medications": "Amoxicillin",
            "dosage": "500mg twice daily",
            "observations": ""
        });
        let (status, json) = call(
            &app,
            request("POST", "/prescription", Some(&doctor), Some(prescription.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let prescription_id = json["prescription"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            request("POST", "/prescription", Some(&doctor), Some(prescription)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = call(&app, request("GET", "/prescription/patient", Some(&patient), None)).await;
        assert_eq!(status, StatusCode::OK);
        let list = json["prescriptions"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["medicalRecord"]["diagnosis"], "Bronchitis");

        let (status, json) = call(
            &app,
            request("GET", &format!("/medicalRecord/{record_id}"), Some(&patient), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["medicalRecord"]["doctor"]["lastName"], "House");

        let (status, _) = call(
            &app,
            request("GET", &format!("/medicalRecord/{record_id}"), Some(&stranger), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            request("GET", &format!("/prescription/{prescription_id}"), Some(&stranger), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            request(
                "PUT",
                &format!("/prescription/{prescription_id}"),
                Some(&doctor),
                Some(json!({ "dosage": "250mg" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["prescription"]["dosage"], "250mg");
        assert_eq!(json["prescription"]["medications"], "Amoxicillin");
    }

    #[tokio::test]
    async fn only_the_author_edits_a_record() {
        let app = test_app();
        let author = signup(&app, "author_doc").await;
        create_doctor(&app, &author, true).await;
        let colleague = signup(&app, "colleague_doc").await;
        create_doctor(&app, &colleague, true).await;
        let patient = signup(&app, "charted").await;
        let pid = patient_id(&app, &patient, "ED-1").await;

        let (_, json) = call(
            &app,
            request("POST", "/medicalRecord", Some(&author), Some(json!({
                "patientId": pid, "diagnosis": "Flu",
                "observations": "Fever", "recommendedTreatment": "Fluids"
            }))),
        )
        .await;
        let uri = format!("/medicalRecord/{}", json["medicalRecord"]["id"].as_str().unwrap());

        let patch = json!({ "diagnosis": "Influenza A" });
        let (status, _) = call(&app, request("PUT", &uri, Some(&colleague), Some(patch.clone()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(&app, request("PUT", &uri, Some(&author), Some(patch))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["medicalRecord"]["diagnosis"], "Influenza A");
        assert_eq!(json["medicalRecord"]["observations"], "Fever");

        let (status, json) = call(
            &app,
            request("GET", &format!("/medicalRecord/patient/{pid}"), Some(&colleague), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["medicalRecords"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recommendation_update_resets_issue_date() {
        let app = test_app();
        let doctor = signup(&app, "advisor").await;
        create_doctor(&app, &doctor, true).await;
        let patient = signup(&app, "advised").await;
        let pid = patient_id(&app, &patient, "RC-1").await;

        let (status, json) = call(
            &app,
            request("POST", "/recommendation", Some(&doctor), Some(json!({
                "patientId": pid, "content": "Walk daily"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = json["recommendation"]["id"].as_str().unwrap().to_string();
        let issued = json["recommendation"]["issuedDate"].as_str().unwrap().to_string();

        let (status, json) = call(
            &app,
            request(
                "PUT",
                &format!("/recommendation/{id}"),
                Some(&doctor),
                Some(json!({ "content": "Walk twice daily" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["recommendation"]["content"], "Walk twice daily");
        assert_ne!(json["recommendation"]["issuedDate"].as_str().unwrap(), issued);

        let (_, json) = call(&app, request("GET", "/recommendation/patient", Some(&patient), None)).await;
        assert_eq!(json["recommendations"][0]["doctor"]["lastName"], "House");
    }

    // ── Messaging ───────────────────────────────────────────

    #[tokio::test]
    async fn only_receiver_marks_message_read() {
        let app = test_app();
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        let (_, bob_login) = login(&app, "bob@example.com", "password123").await;
        let bob_id = bob_login["user"]["id"].as_str().unwrap().to_string();

        let (status, json) = call(
            &app,
            request("POST", "/message", Some(&alice), Some(json!({
                "receiverId": bob_id, "content": "Hello Bob"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(json["sentMessage"]["readAt"].is_null());
        let message_id = json["sentMessage"]["id"].as_str().unwrap().to_string();
        let uri = format!("/message/{message_id}/read");

        let (_, json) = call(&app, request("GET", "/message/conversations", Some(&bob), None)).await;
        assert_eq!(json["conversations"][0]["unreadCount"], 1);
        assert_eq!(json["conversations"][0]["isIncoming"], true);

        let (status, _) = call(&app, request("PUT", &uri, Some(&alice), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(&app, request("PUT", &uri, Some(&bob), None)).await;
        assert_eq!(status, StatusCode::OK);
        let first_read = json["readMessage"]["readAt"].as_str().unwrap().to_string();

        let (_, json) = call(&app, request("PUT", &uri, Some(&bob), None)).await;
        assert_eq!(json["readMessage"]["readAt"], first_read.as_str());

        let (_, json) = call(&app, request("GET", "/message/conversations", Some(&bob), None)).await;
        assert_eq!(json["conversations"][0]["unreadCount"], 0);

        let (status, json) = call(
            &app,
            request("GET", &format!("/message/conversation/{bob_id}"), Some(&alice), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["messages"][0]["content"], "Hello Bob");
    }

    // ── Documents ───────────────────────────────────────────

    fn multipart(token: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "carelogtestboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"documentType\"\r\n\r\nLab result\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/document")
            .header("Authorization", format!("Bearer {token}"))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn upload_dir_entries(app: &TestApp) -> usize {
        std::fs::read_dir(&app.core.config.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn rejected_upload_leaves_no_file() {
        let app = test_app();
        let patient = signup(&app, "uploader").await;
        patient_id(&app, &patient, "UP-1").await;

        let (status, _) = call(&app, multipart(&patient, "notes.txt", "text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(upload_dir_entries(&app), 0);

        let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let (status, _) = call(&app, multipart(&patient, "big.pdf", "application/pdf", &oversized)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(upload_dir_entries(&app), 0);
    }

    #[tokio::test]
    async fn document_upload_download_delete() {
        let app = test_app();
        let patient = signup(&app, "archivist").await;
        patient_id(&app, &patient, "DC-1").await;
        let stranger = signup(&app, "snoop").await;
        patient_id(&app, &stranger, "DC-2").await;

        let pdf = b"%PDF-1.4 test document";
        let (status, json) = call(&app, multipart(&patient, "scan.pdf", "application/pdf", pdf)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(json["document"].get("filePath").is_none());
        let id = json["document"]["id"].as_str().unwrap().to_string();
        assert_eq!(upload_dir_entries(&app), 1);

        let response = app
            .router
            .clone()
            .oneshot(request("GET", &format!("/document/{id}"), Some(&patient), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("Content-Type").unwrap(), "application/pdf");
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], pdf);

        let (status, _) = call(
            &app,
            request("GET", &format!("/document/{id}"), Some(&stranger), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            request("DELETE", &format!("/document/{id}"), Some(&stranger), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            request("DELETE", &format!("/document/{id}"), Some(&patient), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(upload_dir_entries(&app), 0);

        let (_, json) = call(&app, request("GET", "/document", Some(&patient), None)).await;
        assert!(json["documents"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn verified_doctor_lists_documents_by_lookup() {
        let app = test_app();
        let patient = signup(&app, "scanned").await;
        patient_id(&app, &patient, "DL-1").await;
        let (status, _) = call(&app, multipart(&patient, "xray.png", "image/png", b"\x89PNG")).await;
        assert_eq!(status, StatusCode::CREATED);

        let doctor = signup(&app, "radiologist").await;
        create_doctor(&app, &doctor, true).await;
        let (status, json) = call(
            &app,
            request("GET", "/document/patient/DL-1", Some(&doctor), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let documents = json["documents"].as_array().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["originalName"], "xray.png");
        assert_eq!(documents[0]["documentType"], "Lab result");

        let (status, _) = call(
            &app,
            request("GET", "/document/patient/NOPE-9", Some(&doctor), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let pending = signup(&app, "pending_radiologist").await;
        create_doctor(&app, &pending, false).await;
        let (status, _) = call(
            &app,
            request("GET", "/document/patient/DL-1", Some(&pending), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // ── Contact ─────────────────────────────────────────────

    #[tokio::test]
    async fn contact_form_is_mailed_to_inbox() {
        let app = test_app();
        let (status, json) = call(
            &app,
            request("POST", "/contact", None, Some(json!({
                "firstName": "Ana", "lastName": "Lopez",
                "email": "ana@example.com", "message": "Do you take walk-ins?"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Message sent successfully");

        let mail = app.mailer.last_to(&app.core.config.mail.inbox).unwrap();
        assert_eq!(mail.subject, "Contact message from Ana Lopez");
        assert!(mail.body.contains("ana@example.com"));
        assert!(mail.body.contains("Do you take walk-ins?"));

        let (status, json) = call(
            &app,
            request("POST", "/contact", None, Some(json!({
                "firstName": "Ana", "lastName": "Lopez", "email": "nope", "message": "hi"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["email"].is_array());
    }

    // ── Administration ──────────────────────────────────────

    #[tokio::test]
    async fn admin_routes_hidden_from_non_admins() {
        let app = test_app();
        let token = signup(&app, "regular").await;
        let (status, _) = call(&app, request("GET", "/admin/stats", Some(&token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_verifies_doctor_and_deactivates_user() {
        let app = test_app();
        let admin = signup(&app, "root").await;
        let (_, json) = login(&app, "root@example.com", "password123").await;
        let admin_id = Uuid::parse_str(json["user"]["id"].as_str().unwrap()).unwrap();
        {
            let conn = app.core.open_db().unwrap();
            set_user_role(&conn, &admin_id, Role::Admin).unwrap();
        }

        let doctor = signup(&app, "candidate").await;
        let doctor_id = create_doctor(&app, &doctor, false).await;

        let (status, json) = call(
            &app,
            request("PUT", &format!("/admin/doctors/{doctor_id}/verify"), Some(&admin), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["doctor"]["isVerified"], true);

        let (_, json) = call(&app, request("GET", "/admin/stats", Some(&admin), None)).await;
        assert_eq!(json["stats"]["users"], 2);
        assert_eq!(json["stats"]["verifiedDoctors"], 1);

        let (_, json) = call(&app, request("GET", "/admin/users", Some(&admin), None)).await;
        let users = json["users"].as_array().unwrap();
        assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
        let doctor_user = users
            .iter()
            .find(|u| u["username"] == "candidate")
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, json) = call(
            &app,
            request("GET", &format!("/admin/users/{doctor_user}"), Some(&admin), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["doctor"]["id"], doctor_id.to_string());
        assert!(json["patient"].is_null());

        let (status, _) = call(
            &app,
            request("PUT", &format!("/admin/users/{doctor_user}/deactivate"), Some(&admin), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, request("GET", "/doctor/profile", Some(&doctor), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            login(&app, "candidate@example.com", "password123").await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn admin_changes_user_role() {
        let app = test_app();
        let admin = signup(&app, "chief").await;
        let (_, json) = login(&app, "chief@example.com", "password123").await;
        let admin_id = Uuid::parse_str(json["user"]["id"].as_str().unwrap()).unwrap();
        {
            let conn = app.core.open_db().unwrap();
            set_user_role(&conn, &admin_id, Role::Admin).unwrap();
        }
        let deputy = signup(&app, "deputy").await;
        let (_, json) = login(&app, "deputy@example.com", "password123").await;
        let deputy_id = json["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, request("GET", "/admin/stats", Some(&deputy), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            &app,
            request("PUT", &format!("/admin/users/{deputy_id}/role"), Some(&admin), Some(json!({
                "role": "Superuser"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["role"].is_array());

        let (status, json) = call(
            &app,
            request("PUT", &format!("/admin/users/{deputy_id}/role"), Some(&admin), Some(json!({
                "role": "Admin"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "User role updated to Admin successfully");
        assert_eq!(json["user"]["role"], "Admin");

        let (status, _) = call(&app, request("GET", "/admin/stats", Some(&deputy), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            request("PUT", &format!("/admin/users/{}/role", Uuid::new_v4()), Some(&admin), Some(json!({
                "role": "User"
            }))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
