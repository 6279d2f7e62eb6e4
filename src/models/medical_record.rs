use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{BookedDoctor, BookedPatient};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub record_date: DateTime<Utc>,
    pub diagnosis: String,
    pub observations: String,
    pub recommended_treatment: String,
}

/// A record with its author, as listed for the patient.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordEntry {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub doctor: BookedDoctor,
}

/// A single record with both parties populated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordDetail {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub doctor: BookedDoctor,
    pub patient: BookedPatient,
}
