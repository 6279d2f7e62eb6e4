use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::*;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at,
     is_confirmed, is_active, token_version";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
        is_confirmed: row.get(6)?,
        is_active: row.get(7)?,
        token_version: row.get(8)?,
    })
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            user.id.to_string(),
            user.username,
            user.email,
            user.password_hash,
            user.role,
            user.created_at,
            user.is_confirmed,
            user.is_active,
            user.token_version,
        ],
    )
    .map_err(|e| DatabaseError::unique(e, "User already exists"))?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id.to_string()],
        user_from_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Email lookup is case-insensitive (column collation).
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        user_from_row,
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn username_taken(conn: &Connection, username: &str) -> Result<bool, DatabaseError> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        params![username],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Hard delete, only used to roll back a registration whose mail failed.
pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}

pub fn confirm_user(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_confirmed = 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Store a new password hash and bump `token_version`, but only if the
/// stored version still equals `expected_version`. Returns `false` when the
/// version moved on (the reset token was already spent).
pub fn reset_password(
    conn: &Connection,
    id: &Uuid,
    password_hash: &str,
    expected_version: i64,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?1, token_version = token_version + 1
         WHERE id = ?2 AND token_version = ?3",
        params![password_hash, id.to_string(), expected_version],
    )?;
    Ok(changed == 1)
}

pub fn set_user_role(conn: &Connection, id: &Uuid, role: Role) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role, id.to_string()],
    )?;
    Ok(changed == 1)
}

/// Soft delete. Outstanding tokens are revoked through the version bump.
pub fn deactivate_user(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_active = 0, token_version = token_version + 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}
