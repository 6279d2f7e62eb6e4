use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str =
    "d.id, d.first_name, d.last_name, d.specialization, d.phone, d.is_verified, d.user_id";

fn doctor_from_row(row: &Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: uuid_at(row, 0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        specialization: row.get(3)?,
        phone: row.get(4)?,
        is_verified: row.get(5)?,
        user_id: uuid_at(row, 6)?,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, first_name, last_name, specialization, phone, is_verified, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.first_name,
            doctor.last_name,
            doctor.specialization,
            doctor.phone,
            doctor.is_verified,
            doctor.user_id.to_string(),
        ],
    )
    .map_err(|e| DatabaseError::unique(e, "Doctor profile already exists"))?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE d.id = ?1"),
        params![id.to_string()],
        doctor_from_row,
    );

    match result {
        Ok(doctor) => Ok(Some(doctor)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_doctor_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<Doctor>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE d.user_id = ?1"),
        params![user_id.to_string()],
        doctor_from_row,
    );

    match result {
        Ok(doctor) => Ok(Some(doctor)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write back the editable profile fields. Verification is never touched here.
pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE doctors SET first_name = ?1, last_name = ?2, specialization = ?3, phone = ?4
         WHERE id = ?5",
        params![
            doctor.first_name,
            doctor.last_name,
            doctor.specialization,
            doctor.phone,
            doctor.id.to_string(),
        ],
    )?;
    Ok(())
}

pub fn verify_doctor(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET is_verified = 1 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

pub fn list_verified_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors d WHERE d.is_verified = 1
         ORDER BY d.last_name, d.first_name"
    ))?;
    let doctors = stmt
        .query_map([], doctor_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(doctors)
}

pub fn list_doctor_accounts(conn: &Connection) -> Result<Vec<DoctorAccount>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS}, u.username, u.email
         FROM doctors d JOIN users u ON u.id = d.user_id
         ORDER BY d.is_verified, d.last_name, d.first_name"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DoctorAccount {
                doctor: doctor_from_row(row)?,
                username: row.get(7)?,
                email: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// (all doctors, verified doctors)
pub fn count_doctors(conn: &Connection) -> Result<(i64, i64), DatabaseError> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_verified), 0) FROM doctors",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}
