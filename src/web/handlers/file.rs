//! File handlers for Web API.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::{self, Disposition, UploadBatch};
use crate::web::dto::{ApiResponse, DeleteResponse, FileResponse, UploadResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/files - Upload one or more files.
///
/// Every multipart part that carries a filename is stored; the field name is
/// ignored. The filename may be a relative path (browsers fill it from
/// `webkitRelativePath` for directory uploads). Parts that fail are counted
/// in `skipped` and do not fail the request.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let service = state.files();
    let max_age = state.config.retention.max_age();
    let mut batch = UploadBatch::new();
    let mut uploaded = Vec::new();
    let mut skipped = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if uploaded.is_empty() => {
                return Err(multipart_error(e));
            }
            Err(e) => {
                tracing::warn!(batch_id = %batch.id(), error = %e, "Upload ended early");
                break;
            }
        };

        let raw_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        match service.ingest(&mut batch, &raw_name, Box::pin(field)).await {
            Ok(record) => uploaded.push(FileResponse::from_record(&record, max_age)),
            Err(e) => {
                skipped += 1;
                tracing::warn!(batch_id = %batch.id(), file = %raw_name, error = %e, "Skipped uploaded file");
            }
        }
    }

    if uploaded.is_empty() && skipped == 0 {
        return Err(ApiError::bad_request("No file provided"));
    }

    Ok(Json(ApiResponse::new(UploadResponse {
        batch_id: batch.id().to_string(),
        uploaded,
        skipped,
    })))
}

/// GET /api/files - List files inside the retention window, newest first.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let max_age = state.config.retention.max_age();
    let records = state.files().list_recent().await?;

    let files = records
        .iter()
        .map(|record| FileResponse::from_record(record, max_age))
        .collect();

    Ok(Json(ApiResponse::new(files)))
}

/// GET /api/files/:id - Get file metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let record = state.files().get(file_id).await?;

    Ok(Json(ApiResponse::new(FileResponse::from_record(
        &record,
        state.config.retention.max_age(),
    ))))
}

/// GET /api/files/:id/download - Download the whole file as an attachment.
///
/// Range headers are ignored here; use the stream endpoint for partial content.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Response, ApiError> {
    let record = state.files().get(file_id).await?;

    let response = file::serve(
        &state.store,
        &record,
        None,
        Disposition::Attachment,
        state.config.storage.stream_chunk_size(),
    )
    .await?;

    Ok(response)
}

/// GET /api/files/:id/stream - Range-aware inline streaming.
pub async fn stream_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = state.files().get(file_id).await?;

    // A header that is not valid text is malformed, not absent.
    let range = headers
        .get(header::RANGE)
        .map(|value| value.to_str().unwrap_or(""));

    let response = file::serve(
        &state.store,
        &record,
        range,
        Disposition::Inline,
        state.config.storage.stream_chunk_size(),
    )
    .await?;

    Ok(response)
}

/// DELETE /api/files/:id - Delete a file before it expires.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    let record = state.files().delete(file_id).await?;

    Ok(Json(ApiResponse::new(DeleteResponse {
        id: record.id,
        deleted: true,
    })))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Upload exceeds the size limit")
    } else {
        tracing::debug!(error = %e, "Invalid multipart data");
        ApiError::bad_request("Invalid multipart data")
    }
}
