//! API endpoint handlers, one module per resource.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod confirm;
pub mod contact;
pub mod doctors;
pub mod documents;
pub mod health;
pub mod medical_records;
pub mod messages;
pub mod patients;
pub mod prescriptions;
pub mod recommendations;
