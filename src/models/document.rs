use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Uploaded file metadata. The storage path stays server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub document_type: String,
    #[serde(skip)]
    pub file_path: String,
    pub original_name: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}
