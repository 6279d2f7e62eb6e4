//! Capability-based access policy.
//!
//! Capabilities are derived per request from the profiles linked to the
//! caller's account, never from the cached `role` column (Admin excepted):
//! - Admin → `users.role == Admin`
//! - Doctor → a Doctor profile bound to the caller (most actions also need verification)
//! - Patient → a Patient profile bound to the caller
//!
//! Record-level reads (medical records, prescriptions, documents,
//! recommendations) are allowed for the owning patient, the authoring
//! doctor, any verified doctor, or an admin. Default deny.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{get_doctor_by_user, get_patient_by_user};
use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::{Doctor, Patient, User};

/// The authenticated user and the profiles bound to them.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub doctor: Option<Doctor>,
    pub patient: Option<Patient>,
}

impl Caller {
    pub fn load(conn: &Connection, user: User) -> Result<Self, DatabaseError> {
        let doctor = get_doctor_by_user(conn, &user.id)?;
        let patient = get_patient_by_user(conn, &user.id)?;
        Ok(Self {
            user,
            doctor,
            patient,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// Capability set carried in session tokens.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = Vec::with_capacity(3);
        if self.is_admin() {
            roles.push(Role::Admin);
        }
        if self.doctor.is_some() {
            roles.push(Role::Doctor);
        }
        if self.patient.is_some() {
            roles.push(Role::Patient);
        }
        if roles.is_empty() {
            roles.push(Role::User);
        }
        roles
    }

    pub fn doctor(&self) -> Option<&Doctor> {
        self.doctor.as_ref()
    }

    pub fn verified_doctor(&self) -> Option<&Doctor> {
        self.doctor.as_ref().filter(|d| d.is_verified)
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    fn owns_patient(&self, patient_id: &Uuid) -> bool {
        self.patient.as_ref().is_some_and(|p| p.id == *patient_id)
    }

    fn is_doctor(&self, doctor_id: &Uuid) -> bool {
        self.doctor.as_ref().is_some_and(|d| d.id == *doctor_id)
    }

    /// Read access to a patient's data, optionally authored by `author`.
    pub fn can_read_patient_data(&self, patient_id: &Uuid, author: Option<&Uuid>) -> bool {
        self.owns_patient(patient_id)
            || author.is_some_and(|doctor_id| self.is_doctor(doctor_id))
            || self.verified_doctor().is_some()
            || self.is_admin()
    }
}
