//! First-run administrator account.
//!
//! When `CARELOG_ADMIN_EMAIL` and `CARELOG_ADMIN_PASSWORD` are set, the
//! account is created confirmed with the Admin role, or an existing account
//! with that email is promoted. The password of an existing account is left
//! untouched.

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::AdminBootstrap;
use crate::crypto::hash_password;
use crate::db::repository::{confirm_user, get_user_by_email, insert_user, set_user_role, username_taken};
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::User;

const ADMIN_USERNAME: &str = "admin";

pub fn ensure_admin(conn: &Connection, admin: &AdminBootstrap) -> Result<Uuid, DatabaseError> {
    if let Some(user) = get_user_by_email(conn, &admin.email)? {
        if user.role != Role::Admin {
            set_user_role(conn, &user.id, Role::Admin)?;
            tracing::info!(user_id = %user.id, "existing account promoted to admin");
        }
        if !user.is_confirmed {
            confirm_user(conn, &user.id)?;
        }
        return Ok(user.id);
    }

    let username = if username_taken(conn, ADMIN_USERNAME)? {
        admin.email.clone()
    } else {
        ADMIN_USERNAME.to_string()
    };
    let mut user = User::new(&username, &admin.email, hash_password(&admin.password));
    user.role = Role::Admin;
    user.is_confirmed = true;
    insert_user(conn, &user)?;

    tracing::info!(user_id = %user.id, "admin account created");
    Ok(user.id)
}
