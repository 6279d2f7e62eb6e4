use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const PRESCRIPTION_COLUMNS: &str =
    "rx.id, rx.medical_record_id, rx.medications, rx.dosage, rx.observations";

fn prescription_from_row(row: &Row) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: uuid_at(row, 0)?,
        medical_record_id: uuid_at(row, 1)?,
        medications: row.get(2)?,
        dosage: row.get(3)?,
        observations: row.get(4)?,
    })
}

pub fn insert_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO prescriptions (id, medical_record_id, medications, dosage, observations)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            rx.id.to_string(),
            rx.medical_record_id.to_string(),
            rx.medications,
            rx.dosage,
            rx.observations,
        ],
    )
    .map_err(|e| {
        DatabaseError::unique(e, "A prescription already exists for this medical record")
    })?;
    Ok(())
}

pub fn get_prescription(conn: &Connection, id: &Uuid) -> Result<Option<Prescription>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions rx WHERE rx.id = ?1"),
        params![id.to_string()],
        prescription_from_row,
    );

    match result {
        Ok(rx) => Ok(Some(rx)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn record_has_prescription(
    conn: &Connection,
    medical_record_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM prescriptions WHERE medical_record_id = ?1)",
        params![medical_record_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn update_prescription(conn: &Connection, rx: &Prescription) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE prescriptions SET medications = ?1, dosage = ?2, observations = ?3 WHERE id = ?4",
        params![rx.medications, rx.dosage, rx.observations, rx.id.to_string()],
    )?;
    Ok(())
}

/// A patient's prescriptions with the parent record's date, diagnosis and
/// author, newest record first.
pub fn list_patient_prescriptions(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientPrescription>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS}, r.record_date, r.diagnosis,
         d.id, d.first_name, d.last_name, d.specialization
         FROM prescriptions rx
         JOIN medical_records r ON r.id = rx.medical_record_id
         JOIN doctors d ON d.id = r.doctor_id
         WHERE r.patient_id = ?1
         ORDER BY r.record_date DESC"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], |row| {
            let prescription = prescription_from_row(row)?;
            Ok(PatientPrescription {
                medical_record: PrescriptionRecord {
                    id: prescription.medical_record_id,
                    record_date: row.get(5)?,
                    diagnosis: row.get(6)?,
                    doctor: BookedDoctor {
                        id: uuid_at(row, 7)?,
                        first_name: row.get(8)?,
                        last_name: row.get(9)?,
                        specialization: row.get(10)?,
                    },
                },
                prescription,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
