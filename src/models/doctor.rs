use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub phone: String,
    pub is_verified: bool,
    pub user_id: Uuid,
}

impl Doctor {
    pub fn summary(&self) -> DoctorSummary {
        DoctorSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            specialization: self.specialization.clone(),
        }
    }
}

/// Public view of a doctor: no contact data, no account link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
}

/// Doctor profile joined with its account, for admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAccount {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub username: String,
    pub email: String,
}
