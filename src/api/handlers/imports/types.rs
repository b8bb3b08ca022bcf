use crate::services::import::chunked::StreamChunk;
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

/// Multipart body of the single-request import routes.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct FileUploadForm {
    /// `.xlsx`, `.xls` or `.csv`
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Multipart body of `POST /clients/import/chunked`.
#[derive(ToSchema)]
#[allow(dead_code)]
#[schema(rename_all = "camelCase")]
pub struct FileChunkForm {
    pub session_id: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Raw bytes of this part of the file
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JsonImportRequest {
    /// Row objects keyed by column header
    #[validate(length(min = 1, message = "records must contain at least one row"))]
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunkRequest {
    #[validate(length(min = 10, max = 50, message = "sessionId must be 10-50 characters"))]
    pub session_id: String,
    pub chunk_index: u32,
    #[validate(range(min = 1, message = "totalChunks must be positive"))]
    pub total_chunks: u32,
    #[serde(default)]
    pub is_last_chunk: bool,
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Map<String, Value>>,
}

impl From<StreamChunkRequest> for StreamChunk {
    fn from(req: StreamChunkRequest) -> Self {
        StreamChunk {
            session_id: req.session_id,
            chunk_index: req.chunk_index,
            total_chunks: req.total_chunks,
            is_last_chunk: req.is_last_chunk,
            rows: req.rows,
        }
    }
}
