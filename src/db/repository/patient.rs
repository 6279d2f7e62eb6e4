use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

/// Upper bound on name-prefix lookups.
pub const LOOKUP_LIMIT: usize = 20;

const PATIENT_COLUMNS: &str = "p.id, p.first_name, p.last_name, p.phone, p.birth_date, p.gender,
     p.address, p.national_id, p.medical_history, p.allergies, p.user_id";

fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: uuid_at(row, 0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        birth_date: row.get(4)?,
        gender: row.get(5)?,
        address: row.get(6)?,
        national_id: row.get(7)?,
        medical_history: row.get(8)?,
        allergies: row.get(9)?,
        user_id: uuid_at(row, 10)?,
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, phone, birth_date, gender, address,
         national_id, medical_history, allergies, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.phone,
            patient.birth_date,
            patient.gender,
            patient.address,
            patient.national_id,
            patient.medical_history,
            patient.allergies,
            patient.user_id.to_string(),
        ],
    )
    .map_err(|e| DatabaseError::unique(e, "Patient profile already exists"))?;
    Ok(())
}

fn query_one(
    conn: &Connection,
    filter: &str,
    value: String,
) -> Result<Option<Patient>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE {filter}"),
        params![value],
        patient_from_row,
    );

    match result {
        Ok(patient) => Ok(Some(patient)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    query_one(conn, "p.id = ?1", id.to_string())
}

pub fn get_patient_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<Patient>, DatabaseError> {
    query_one(conn, "p.user_id = ?1", user_id.to_string())
}

pub fn national_id_taken(conn: &Connection, national_id: &str) -> Result<bool, DatabaseError> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE national_id = ?1)",
        params![national_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// Write back the mutable profile fields.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE patients SET first_name = ?1, last_name = ?2, phone = ?3, address = ?4,
         medical_history = ?5, allergies = ?6
         WHERE id = ?7",
        params![
            patient.first_name,
            patient.last_name,
            patient.phone,
            patient.address,
            patient.medical_history,
            patient.allergies,
            patient.id.to_string(),
        ],
    )?;
    Ok(())
}

/// LIKE pattern for a literal prefix. Wildcard characters are dropped.
fn like_prefix(term: &str) -> String {
    let mut pattern: String = term.chars().filter(|c| !matches!(c, '%' | '_')).collect();
    pattern.push('%');
    pattern
}

/// Resolve a free-text query to patients.
///
/// An exact hit on patient id, national id or phone wins outright.
/// Otherwise the query is matched case-insensitively as a name prefix:
/// one token against first or last name, two tokens against first AND
/// last name. Results are ordered by last name, first name and capped at
/// `LOOKUP_LIMIT`.
pub fn find_patients(conn: &Connection, query: &str) -> Result<Vec<Patient>, DatabaseError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients p
         WHERE p.id = ?1 OR p.national_id = ?1 OR p.phone = ?1
         LIMIT 1"
    ))?;
    let exact = stmt
        .query_map(params![query], patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    if !exact.is_empty() {
        return Ok(exact);
    }

    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.iter().any(|t| like_prefix(t) == "%") {
        return Ok(Vec::new());
    }
    let (sql, first, second) = match tokens.as_slice() {
        [first, last] => (
            format!(
                "SELECT {PATIENT_COLUMNS} FROM patients p
                 WHERE p.first_name LIKE ?1 AND p.last_name LIKE ?2
                 ORDER BY p.last_name, p.first_name LIMIT ?3"
            ),
            like_prefix(first),
            like_prefix(last),
        ),
        _ => (
            format!(
                "SELECT {PATIENT_COLUMNS} FROM patients p
                 WHERE p.first_name LIKE ?1 OR p.last_name LIKE ?2
                 ORDER BY p.last_name, p.first_name LIMIT ?3"
            ),
            like_prefix(query),
            like_prefix(query),
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let patients = stmt
        .query_map(params![first, second, LOOKUP_LIMIT as i64], patient_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(patients)
}

pub fn list_patient_accounts(conn: &Connection) -> Result<Vec<PatientAccount>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS}, u.username, u.email
         FROM patients p JOIN users u ON u.id = p.user_id
         ORDER BY p.last_name, p.first_name"
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PatientAccount {
                patient: patient_from_row(row)?,
                username: row.get(11)?,
                email: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
}
