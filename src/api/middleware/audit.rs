//! Access logging middleware.
//!
//! Logs every API request with method, path, response status, latency and,
//! on protected routes, the caller's user id. Runs innermost (after auth
//! has injected `Caller`).

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::authorization::Caller;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req.extensions().get::<Caller>().map(|c| c.user.id.to_string());
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    let user_id = user_id.as_deref().unwrap_or("-");
    if response.status().is_server_error() {
        tracing::warn!(%method, path, status, user_id, latency_ms, "request failed");
    } else {
        tracing::info!(%method, path, status, user_id, latency_ms, "request");
    }

    response
}
