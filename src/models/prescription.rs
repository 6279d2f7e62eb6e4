use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::BookedDoctor;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub medications: String,
    pub dosage: String,
    pub observations: String,
}

/// Parent record fields shown alongside a patient's prescription.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRecord {
    pub id: Uuid,
    pub record_date: DateTime<Utc>,
    pub diagnosis: String,
    pub doctor: BookedDoctor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPrescription {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub medical_record: PrescriptionRecord,
}
