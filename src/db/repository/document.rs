use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::uuid_at;
use crate::db::DatabaseError;
use crate::models::*;

const DOCUMENT_COLUMNS: &str =
    "id, patient_id, document_type, file_path, original_name, content_type, uploaded_at";

fn document_from_row(row: &Row) -> rusqlite::Result<Document> {
    Ok(Document {
        id: uuid_at(row, 0)?,
        patient_id: uuid_at(row, 1)?,
        document_type: row.get(2)?,
        file_path: row.get(3)?,
        original_name: row.get(4)?,
        content_type: row.get(5)?,
        uploaded_at: row.get(6)?,
    })
}

pub fn insert_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO documents ({DOCUMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            doc.id.to_string(),
            doc.patient_id.to_string(),
            doc.document_type,
            doc.file_path,
            doc.original_name,
            doc.content_type,
            doc.uploaded_at,
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
    let result = conn.query_row(
        &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
        params![id.to_string()],
        document_from_row,
    );

    match result {
        Ok(doc) => Ok(Some(doc)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_patient_documents(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Document>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE patient_id = ?1
         ORDER BY uploaded_at DESC"
    ))?;
    let docs = stmt
        .query_map(params![patient_id.to_string()], document_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs)
}

pub fn delete_document(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}
