use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::*;

const SLOT_TAKEN: &str = "This time slot is already booked";

const APPOINTMENT_COLUMNS: &str =
    "a.id, a.patient_id, a.doctor_id, a.date, a.time, a.status, a.notes";

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_at(row, 0)?,
        patient_id: uuid_at(row, 1)?,
        doctor_id: uuid_at(row, 2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
    })
}

/// Insert a booking. A concurrent booking of the same active slot loses on
/// the partial unique index and surfaces as `ConstraintViolation`.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, date, time, status, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.to_string(),
            appt.date,
            appt.time,
            appt.status,
            appt.notes,
        ],
    )
    .map_err(|e| DatabaseError::unique(e, SLOT_TAKEN))?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"),
        params![id.to_string()],
        appointment_from_row,
    );

    match result {
        Ok(appt) => Ok(Some(appt)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether a non-cancelled appointment already holds the slot.
pub fn slot_taken(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: &str,
) -> Result<bool, DatabaseError> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND time = ?3 AND status != 'Cancelled')",
        params![doctor_id.to_string(), date, time],
        |row| row.get(0),
    )?;
    Ok(taken)
}

/// Times held by non-cancelled appointments for a doctor on a date.
pub fn booked_times(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT time FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND status != 'Cancelled'
         ORDER BY time",
    )?;
    let times = stmt
        .query_map(params![doctor_id.to_string(), date], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(times)
}

pub fn set_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status, id.to_string()],
    )
    .map_err(|e| DatabaseError::unique(e, SLOT_TAKEN))?;
    Ok(())
}

pub fn list_patient_appointments(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS}, d.first_name, d.last_name, d.specialization
         FROM appointments a JOIN doctors d ON d.id = a.doctor_id
         WHERE a.patient_id = ?1
         ORDER BY a.date, a.time"
    ))?;
    let rows = stmt
        .query_map(params![patient_id.to_string()], |row| {
            let appointment = appointment_from_row(row)?;
            Ok(PatientAppointment {
                doctor: BookedDoctor {
                    id: appointment.doctor_id,
                    first_name: row.get(7)?,
                    last_name: row.get(8)?,
                    specialization: row.get(9)?,
                },
                appointment,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_doctor_appointments(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<DoctorAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS}, p.first_name, p.last_name
         FROM appointments a JOIN patients p ON p.id = a.patient_id
         WHERE a.doctor_id = ?1
         ORDER BY a.date, a.time"
    ))?;
    let rows = stmt
        .query_map(params![doctor_id.to_string()], |row| {
            let appointment = appointment_from_row(row)?;
            Ok(DoctorAppointment {
                patient: BookedPatient {
                    id: appointment.patient_id,
                    first_name: row.get(7)?,
                    last_name: row.get(8)?,
                },
                appointment,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?)
}
