use super::types::JsonImportRequest;
use crate::AppState;
use crate::api::error::AppError;
use crate::services::import::error::ImportError;
use crate::services::import::report::ImportSummary;
use crate::services::import::types::{Owner, SheetLayout, UploadedFile};
use crate::utils::validation::sanitize_filename;
use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::BytesMut;
use std::collections::HashMap;
use validator::Validate;

/// Fields of a multipart import request; the `file` part is buffered.
pub(crate) struct MultipartUpload {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

async fn read_multipart(
    multipart: &mut Multipart,
    max_file_bytes: usize,
) -> Result<MultipartUpload, AppError> {
    let mut upload = MultipartUpload {
        file: None,
        fields: HashMap::new(),
    };

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = sanitize_filename(field.file_name().unwrap_or("upload"));
            let content_type = field.content_type().map(|s| s.to_string());

            // Enforce the route limit while reading, before anything is parsed.
            let mut data = BytesMut::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                let size = data.len() + chunk.len();
                if size > max_file_bytes {
                    return Err(ImportError::FileTooLarge {
                        size,
                        limit: max_file_bytes,
                    }
                    .into());
                }
                data.extend_from_slice(&chunk);
            }

            upload.file = Some(UploadedFile {
                file_name,
                content_type,
                data: data.freeze(),
            });
        } else if !name.is_empty() {
            let text = field.text().await.map_err(multipart_error)?;
            upload.fields.insert(name, text);
        }
    }

    Ok(upload)
}

/// Reads the multipart body. On failure the rest of the stream is drained so
/// the client sees the JSON error instead of a connection reset.
pub(crate) async fn receive_multipart(
    multipart: &mut Multipart,
    max_file_bytes: usize,
) -> Result<MultipartUpload, AppError> {
    match read_multipart(multipart, max_file_bytes).await {
        Ok(upload) => Ok(upload),
        Err(e) => {
            tracing::warn!("Upload failed early: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

/// 200 when anything was saved, 500 with the same body when nothing was.
pub(crate) fn summary_response(summary: ImportSummary) -> Response {
    let status = if summary.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(summary)).into_response()
}

async fn import_upload(
    state: &AppState,
    owner: &Owner,
    multipart: &mut Multipart,
    layout: SheetLayout,
) -> Result<Response, AppError> {
    let limit = match layout {
        SheetLayout::Auto => state.config.max_import_file_size,
        SheetLayout::MultiSheet => state.config.max_multi_sheet_file_size,
    };

    let upload = receive_multipart(multipart, limit).await?;
    let file = upload.file.ok_or(ImportError::MissingFile)?;

    let summary = state.import_service.import_file(owner, file, layout).await?;
    Ok(summary_response(summary))
}

#[utoipa::path(
    post,
    path = "/clients/import",
    request_body(content = FileUploadForm, content_type = "multipart/form-data"),
    params(
        ("x-user-id" = String, Header, description = "Caller user id"),
        ("x-organization-id" = Option<String>, Header, description = "Caller organization id")
    ),
    responses(
        (status = 200, description = "At least one client imported", body = ImportSummary),
        (status = 400, description = "Malformed request or empty file"),
        (status = 401, description = "Missing caller identity"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Unsupported file type"),
        (status = 422, description = "Unreadable file or no valid records"),
        (status = 500, description = "Every record failed to save", body = ImportSummary)
    ),
    tag = "imports"
)]
pub async fn import_clients(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    import_upload(&state, &owner, &mut multipart, SheetLayout::Auto).await
}

#[utoipa::path(
    post,
    path = "/clients/import/multi-sheet",
    request_body(content = FileUploadForm, content_type = "multipart/form-data"),
    params(
        ("x-user-id" = String, Header, description = "Caller user id"),
        ("x-organization-id" = Option<String>, Header, description = "Caller organization id")
    ),
    responses(
        (status = 200, description = "At least one client sheet imported", body = ImportSummary),
        (status = 400, description = "Malformed request or empty file"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not a workbook"),
        (status = 422, description = "Unreadable workbook or no client sheets"),
        (status = 500, description = "Every record failed to save", body = ImportSummary)
    ),
    tag = "imports"
)]
pub async fn import_multi_sheet(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    import_upload(&state, &owner, &mut multipart, SheetLayout::MultiSheet).await
}

#[utoipa::path(
    post,
    path = "/clients/import/json",
    request_body = JsonImportRequest,
    params(
        ("x-user-id" = String, Header, description = "Caller user id"),
        ("x-organization-id" = Option<String>, Header, description = "Caller organization id")
    ),
    responses(
        (status = 200, description = "At least one client imported", body = ImportSummary),
        (status = 400, description = "Empty or oversized record list"),
        (status = 422, description = "No record has a client name"),
        (status = 500, description = "Every record failed to save", body = ImportSummary)
    ),
    tag = "imports"
)]
pub async fn import_json(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Json(req): Json<JsonImportRequest>,
) -> Result<Response, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let summary = state.import_service.import_json(&owner, &req.records).await?;
    Ok(summary_response(summary))
}
