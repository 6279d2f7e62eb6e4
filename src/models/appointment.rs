use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(rename = "appointmentDate")]
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub notes: String,
}

/// Counterpart shown to a patient looking at their bookings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedDoctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: BookedDoctor,
}

/// Counterpart shown to a doctor looking at their schedule.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedPatient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: BookedPatient,
}
