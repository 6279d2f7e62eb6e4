//! Patient document storage.
//!
//! Files live in the configured upload directory under generated names;
//! the database row keeps the original name and the declared content type.
//! A file written to disk whose row insert fails is removed again.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{parse_id, ApiContext, MessageResponse};
use crate::authorization::Caller;
use crate::config::MAX_UPLOAD_BYTES;
use crate::db::repository::{
    delete_document, find_patients, get_document, insert_document, list_patient_documents,
};
use crate::models::Document;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpeg", "jpg", "png", "gif", "pdf"];
const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "application/pdf"];
const REJECTED_TYPE: &str = "Only images (jpeg, jpg, png, gif) and PDF files are allowed";

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub document: Document,
}

#[derive(Serialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
}

struct Upload {
    original_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Lowercased extension when both the name and the declared type are allowed.
fn accepted_extension(file_name: &str, content_type: &str) -> Option<String> {
    let ext = FsPath::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    let content_type = content_type.to_ascii_lowercase();
    (ALLOWED_EXTENSIONS.contains(&ext.as_str())
        && ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()))
    .then_some(ext)
}

/// `{millis}-{random}.{ext}`
fn stored_name(ext: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{suffix}.{ext}", Utc::now().timestamp_millis())
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::Invalid(err.body_text())
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<(Upload, String), ApiError> {
    let mut upload = None;
    let mut document_type = String::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document" => {
                let original_name = field.file_name().unwrap_or("document").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(Upload {
                    original_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "documentType" => {
                document_type = field.text().await.map_err(multipart_error)?;
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::field("document", "No file uploaded"))?;
    let document_type = document_type.trim().to_string();
    if document_type.is_empty() {
        return Err(ApiError::field("documentType", "Document type is required"));
    }
    Ok((upload, document_type))
}

/// Inline disposition naming the original file. Anything outside visible
/// ASCII, plus quote and backslash, becomes `_`.
fn content_disposition(original_name: &str) -> String {
    let name: String = original_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            ' '..='~' => c,
            _ => '_',
        })
        .collect();
    format!("inline; filename=\"{name}\"")
}

fn stored_path(upload_dir: &FsPath, doc: &Document) -> PathBuf {
    upload_dir.join(&doc.file_path)
}

/// `POST /document` (multipart: `document` file, `documentType` text)
pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let (upload, document_type) = read_upload(multipart).await?;

    if upload.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }
    let ext = accepted_extension(&upload.original_name, &upload.content_type)
        .ok_or_else(|| ApiError::Invalid(REJECTED_TYPE.into()))?;

    let upload_dir = &ctx.core.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir).await?;

    let document = Document {
        id: Uuid::new_v4(),
        patient_id: patient.id,
        document_type,
        file_path: stored_name(&ext),
        original_name: upload.original_name,
        content_type: upload.content_type.to_ascii_lowercase(),
        uploaded_at: Utc::now(),
    };
    let path = stored_path(upload_dir, &document);
    tokio::fs::write(&path, &upload.bytes).await?;

    let saved = ctx
        .core
        .open_db()
        .map_err(ApiError::from)
        .and_then(|conn| insert_document(&conn, &document).map_err(ApiError::from));
    if let Err(e) = saved {
        if let Err(io) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %io, "failed to remove orphaned upload");
        }
        return Err(e);
    }

    tracing::info!(document_id = %document.id, size = upload.bytes.len(), "document uploaded");
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Document uploaded successfully",
            document,
        }),
    ))
}

/// `GET /document`
pub async fn list_own(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<DocumentList>, ApiError> {
    let patient = caller
        .patient()
        .ok_or_else(|| ApiError::not_found("Patient profile"))?;
    let conn = ctx.core.open_db()?;
    let documents = list_patient_documents(&conn, &patient.id)?;
    Ok(Json(DocumentList { documents }))
}

/// `GET /document/patient/:query`: verified doctors look a patient up by
/// id, national id, phone or name.
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(query): Path<String>,
) -> Result<Json<DocumentList>, ApiError> {
    caller
        .verified_doctor()
        .ok_or_else(|| ApiError::NotFound("Doctor profile not found or not verified".into()))?;

    let conn = ctx.core.open_db()?;
    let patient = find_patients(&conn, &query)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Patient"))?;
    let documents = list_patient_documents(&conn, &patient.id)?;
    Ok(Json(DocumentList { documents }))
}

/// `GET /document/:id`: file contents with the stored content type.
pub async fn download(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(document_id): Path<String>,
) -> Result<Response, ApiError> {
    let document_id = parse_id(&document_id, "Document")?;
    let conn = ctx.core.open_db()?;
    let document = get_document(&conn, &document_id)?
        .filter(|d| caller.can_read_patient_data(&d.patient_id, None))
        .ok_or_else(|| ApiError::not_found("Document"))?;
    drop(conn);

    let path = stored_path(&ctx.core.config.upload_dir, &document);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::warn!(document_id = %document.id, error = %e, "document file missing");
        ApiError::not_found("Document file")
    })?;

    let content_type = if document.content_type.is_empty() {
        mime_guess::from_path(&document.original_name)
            .first_or_octet_stream()
            .to_string()
    } else {
        document.content_type
    };
    let disposition = content_disposition(&document.original_name);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /document/:id`: owning patient only.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(document_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let patient_id = caller.patient().map(|p| p.id);
    let document_id = parse_id(&document_id, "Document")?;

    let conn = ctx.core.open_db()?;
    let document = get_document(&conn, &document_id)?
        .filter(|d| Some(d.patient_id) == patient_id)
        .ok_or_else(|| ApiError::not_found("Document"))?;

    let path = stored_path(&ctx.core.config.upload_dir, &document);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(document_id = %document.id, "document file already gone");
        }
        Err(e) => return Err(e.into()),
    }
    delete_document(&conn, &document.id)?;

    Ok(Json(MessageResponse::new("Document deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_images_and_pdf() {
        assert_eq!(accepted_extension("scan.PDF", "application/pdf").as_deref(), Some("pdf"));
        assert_eq!(accepted_extension("x.jpg", "image/jpeg").as_deref(), Some("jpg"));
        assert_eq!(accepted_extension("x.gif", "image/gif").as_deref(), Some("gif"));
    }

    #[test]
    fn rejects_mismatched_or_unknown_types() {
        assert!(accepted_extension("notes.txt", "text/plain").is_none());
        assert!(accepted_extension("x.pdf", "text/plain").is_none());
        assert!(accepted_extension("x.exe", "application/pdf").is_none());
        assert!(accepted_extension("noext", "image/png").is_none());
    }

    #[test]
    fn stored_names_are_unique_and_keep_extension() {
        let a = stored_name("png");
        let b = stored_name("png");
        assert!(a.ends_with(".png"));
        assert!(!a.contains('/'));
        assert_ne!(a, b);
    }

    #[test]
    fn disposition_is_always_a_valid_header() {
        for name in ["scan.pdf", "a\"b\\c.pdf", "bell\u{1}.pdf", "del\u{7f}.png", "ré\r\nsumé.pdf"] {
            let value = content_disposition(name);
            assert!(
                header::HeaderValue::from_str(&value).is_ok(),
                "invalid header for {name:?}: {value:?}"
            );
        }
        assert_eq!(content_disposition("scan.pdf"), "inline; filename=\"scan.pdf\"");
        assert_eq!(content_disposition("x\u{1}\"y.pdf"), "inline; filename=\"x__y.pdf\"");
    }
}
