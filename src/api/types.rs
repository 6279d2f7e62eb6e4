//! Shared types for the API layer.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Plain `{message}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Parse an id taken from the URL. A malformed id cannot name an existing
/// entity, so it is reported the same way as a missing one.
pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_id_is_not_found() {
        let err = parse_id("not-a-uuid", "Appointment").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Appointment not found"));
    }

    #[test]
    fn valid_id_parses() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "User").unwrap(), id);
    }
}
