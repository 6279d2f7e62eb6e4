use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::enums::Gender;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub national_id: String,
    pub medical_history: String,
    pub allergies: String,
    pub user_id: Uuid,
}

/// Patient profile joined with its account, for admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAccount {
    #[serde(flatten)]
    pub patient: Patient,
    pub username: String,
    pub email: String,
}
