//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table. Functions take a borrowed `Connection` so
//! callers decide the transaction boundary.

mod appointment;
mod doctor;
mod document;
mod medical_record;
mod message;
mod patient;
mod prescription;
mod recommendation;
mod user;

use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

pub use appointment::*;
pub use doctor::*;
pub use document::*;
pub use medical_record::*;
pub use message::*;
pub use patient::*;
pub use prescription::*;
pub use recommendation::*;
pub use user::*;

/// Read a TEXT id column as a `Uuid`.
pub(crate) fn uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
