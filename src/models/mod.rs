pub mod enums;

mod appointment;
mod doctor;
mod document;
mod medical_record;
mod message;
mod patient;
mod prescription;
mod recommendation;
mod user;

pub use appointment::*;
pub use doctor::*;
pub use document::*;
pub use medical_record::*;
pub use message::*;
pub use patient::*;
pub use prescription::*;
pub use recommendation::*;
pub use user::*;
