use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const RECORD_COLUMNS: &str = "r.id, r.patient_id, r.doctor_id, r.record_date, r.diagnosis,
     r.observations, r.recommended_treatment";

fn record_from_row(row: &Row) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: uuid_at(row, 0)?,
        patient_id: uuid_at(row, 1)?,
        doctor_id: uuid_at(row, 2)?,
        record_date: row.get(3)?,
        diagnosis: row.get(4)?,
        observations: row.get(5)?,
        recommended_treatment: row.get(6)?,
    })
}

pub fn insert_medical_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (id, patient_id, doctor_id, record_date, diagnosis,
         observations, recommended_treatment)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.doctor_id.to_string(),
            record.record_date,
            record.diagnosis,
            record.observations,
            record.recommended_treatment,
        ],
    )?;
    Ok(())
}

pub fn get_medical_record(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM medical_records r WHERE r.id = ?1"),
        params![id.to_string()],
        record_from_row,
    );

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Record with doctor and patient names populated.
pub fn get_medical_record_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicalRecordDetail>, DatabaseError> {
    let result = conn.query_row(
        &format!(
            "SELECT {RECORD_COLUMNS}, d.first_name, d.last_name, d.specialization,
             p.first_name, p.last_name
             FROM medical_records r
             JOIN doctors d ON d.id = r.doctor_id
             JOIN patients p ON p.id = r.patient_id
             WHERE r.id = ?1"
        ),
        params![id.to_string()],
        |row| {
            let record = record_from_row(row)?;
            Ok(MedicalRecordDetail {
                doctor: BookedDoctor {
                    id: record.doctor_id,
                    first_name: row.get(7)?,
                    last_name: row.get(8)?,
                    specialization: row.get(9)?,
                },
                patient: BookedPatient {
                    id: record.patient_id,
                    first_name: row.get(10)?,
                    last_name: row.get(11)?,
                },
                record,
            })
        },
    );

    match result {
        Ok(detail) => Ok(Some(detail)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_medical_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE medical_records SET diagnosis = ?1, observations = ?2, recommended_treatment = ?3
         WHERE id = ?4",
        params![
            record.diagnosis,
            record.observations,
            record.recommended_treatment,
            record.id.to_string(),
        ],
    )?;
    Ok(())
}

/// A patient's records, newest first, each with its author.
pub fn list_patient_records(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicalRecordEntry>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS}, d.first_name, d.last_name, d.specialization
         FROM medical_records r JOIN doctors d ON d.id = r.doctor_id
         WHERE r.patient_id = ?1
         ORDER BY r.record_date DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], |row| {
            let record = record_from_row(row)?;
            Ok(MedicalRecordEntry {
                doctor: BookedDoctor {
                    id: record.doctor_id,
                    first_name: row.get(7)?,
                    last_name: row.get(8)?,
                    specialization: row.get(9)?,
                },
                record,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
