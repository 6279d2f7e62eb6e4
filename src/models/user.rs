use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::enums::Role;

/// Account row. The password hash and token version never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub is_confirmed: bool,
    pub is_active: bool,
    #[serde(skip)]
    pub token_version: i64,
}

impl User {
    pub fn new(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::User,
            created_at: Utc::now(),
            is_confirmed: false,
            is_active: true,
            token_version: 0,
        }
    }
}

/// Entity counts for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub users: i64,
    pub doctors: i64,
    pub verified_doctors: i64,
    pub patients: i64,
    pub appointments: i64,
}
