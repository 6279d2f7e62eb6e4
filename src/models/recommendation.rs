use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{BookedDoctor, BookedPatient};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub content: String,
    pub issued_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecommendation {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub doctor: BookedDoctor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRecommendation {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub patient: BookedPatient,
}
