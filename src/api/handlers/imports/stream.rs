use super::types::StreamChunkRequest;
use super::upload::receive_multipart;
use crate::AppState;
use crate::api::error::AppError;
use crate::services::import::chunked::{ChunkProgress, FileChunk, SessionStatus};
use crate::services::import::error::ImportError;
use crate::services::import::types::Owner;
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::str::FromStr;
use validator::Validate;

fn progress_response(progress: ChunkProgress) -> Response {
    let status = if progress.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(progress)).into_response()
}

fn required_field<T: FromStr>(fields: &HashMap<String, String>, name: &str) -> Result<T, AppError> {
    let raw = fields
        .get(name)
        .ok_or_else(|| AppError::BadRequest(format!("missing field '{}'", name)))?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("field '{}' is not valid: {:?}", name, raw)))
}

#[utoipa::path(
    post,
    path = "/clients/import/stream",
    request_body = StreamChunkRequest,
    params(
        ("x-user-id" = String, Header, description = "Caller user id"),
        ("x-organization-id" = Option<String>, Header, description = "Caller organization id")
    ),
    responses(
        (status = 200, description = "Chunk applied, or already applied earlier", body = ChunkProgress),
        (status = 400, description = "Invalid session id, chunk position or row count"),
        (status = 409, description = "Chunk does not match its session"),
        (status = 500, description = "Every row of the chunk failed; it may be resent", body = ChunkProgress)
    ),
    tag = "imports"
)]
pub async fn import_stream(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Json(req): Json<StreamChunkRequest>,
) -> Result<Response, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let progress = state
        .import_service
        .process_stream_chunk(&owner, req.into())
        .await?;
    Ok(progress_response(progress))
}

#[utoipa::path(
    post,
    path = "/clients/import/chunked",
    request_body(content = FileChunkForm, content_type = "multipart/form-data"),
    params(
        ("x-user-id" = String, Header, description = "Caller user id"),
        ("x-organization-id" = Option<String>, Header, description = "Caller organization id")
    ),
    responses(
        (status = 200, description = "Chunk stored; the summary is present once the file is complete", body = ChunkProgress),
        (status = 400, description = "Invalid session id, chunk position or empty chunk"),
        (status = 409, description = "Chunk does not match its session"),
        (status = 413, description = "Chunk or reassembled file too large"),
        (status = 422, description = "Reassembled file unreadable or without valid records"),
        (status = 500, description = "Every record failed to save", body = ChunkProgress)
    ),
    tag = "imports"
)]
pub async fn import_chunked(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = receive_multipart(&mut multipart, state.config.max_chunk_size).await?;

    let chunk = FileChunk {
        session_id: required_field(&upload.fields, "sessionId")?,
        chunk_index: required_field(&upload.fields, "chunkIndex")?,
        total_chunks: required_field(&upload.fields, "totalChunks")?,
        file: upload.file.ok_or(ImportError::MissingFile)?,
    };

    let progress = state.import_service.process_file_chunk(&owner, chunk).await?;
    Ok(progress_response(progress))
}

#[utoipa::path(
    get,
    path = "/clients/import/sessions/{session_id}",
    params(
        ("session_id" = String, Path, description = "Client-chosen upload session id"),
        ("x-user-id" = String, Header, description = "Caller user id")
    ),
    responses(
        (status = 200, description = "Session progress, or `{ exists: false }`", body = SessionStatus),
        (status = 400, description = "Malformed session id")
    ),
    tag = "imports"
)]
pub async fn session_status(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatus>, AppError> {
    let status = state.import_service.session_status(&owner, &session_id)?;
    Ok(Json(status))
}
