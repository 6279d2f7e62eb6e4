use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const RECOMMENDATION_COLUMNS: &str =
    "rc.id, rc.patient_id, rc.doctor_id, rc.content, rc.issued_date";

fn recommendation_from_row(row: &Row) -> rusqlite::Result<Recommendation> {
    Ok(Recommendation {
        id: uuid_at(row, 0)?,
        patient_id: uuid_at(row, 1)?,
        doctor_id: uuid_at(row, 2)?,
        content: row.get(3)?,
        issued_date: row.get(4)?,
    })
}

pub fn insert_recommendation(conn: &Connection, rec: &Recommendation) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO recommendations (id, patient_id, doctor_id, content, issued_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            rec.id.to_string(),
            rec.patient_id.to_string(),
            rec.doctor_id.to_string(),
            rec.content,
            rec.issued_date,
        ],
    )?;
    Ok(())
}

pub fn get_recommendation(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Recommendation>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {RECOMMENDATION_COLUMNS} FROM recommendations rc WHERE rc.id = ?1"),
        params![id.to_string()],
        recommendation_from_row,
    );

    match result {
        Ok(rec) => Ok(Some(rec)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_recommendation(conn: &Connection, rec: &Recommendation) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE recommendations SET content = ?1, issued_date = ?2 WHERE id = ?3",
        params![rec.content, rec.issued_date, rec.id.to_string()],
    )?;
    Ok(())
}

pub fn list_patient_recommendations(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientRecommendation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECOMMENDATION_COLUMNS}, d.first_name, d.last_name, d.specialization
         FROM recommendations rc JOIN doctors d ON d.id = rc.doctor_id
         WHERE rc.patient_id = ?1
         ORDER BY rc.issued_date DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], |row| {
            let recommendation = recommendation_from_row(row)?;
            Ok(PatientRecommendation {
                doctor: BookedDoctor {
                    id: recommendation.doctor_id,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                    specialization: row.get(7)?,
                },
                recommendation,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_doctor_recommendations(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<DoctorRecommendation>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECOMMENDATION_COLUMNS}, p.first_name, p.last_name
         FROM recommendations rc JOIN patients p ON p.id = rc.patient_id
         WHERE rc.doctor_id = ?1
         ORDER BY rc.issued_date DESC"
    ))?;
    let rows = stmt
        .query_map(params![doctor_id.to_string()], |row| {
            let recommendation = recommendation_from_row(row)?;
            Ok(DoctorRecommendation {
                patient: BookedPatient {
                    id: recommendation.patient_id,
                    first_name: row.get(5)?,
                    last_name: row.get(6)?,
                },
                recommendation,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
