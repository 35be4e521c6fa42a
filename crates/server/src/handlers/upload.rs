//! Upload endpoint.

use crate::error::{ApiError, ApiResult};
use crate::ingest::UploadedArchive;
use crate::state::AppState;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;

/// POST /upload - Publish a site from a multipart form.
///
/// The form carries one file part whose field name is the target hostname
/// and whose content is a `.tar.gz` archive. Non-file parts are ignored.
pub async fn upload_site(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("invalid upload form: {}", e.body_text())))?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            tracing::debug!(field = ?field.name(), "Ignoring non-file form field");
            continue;
        };
        let field_name = field.name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push(UploadedArchive {
            field_name,
            file_name,
            bytes,
        });
    }

    let summary = state.ingestion.ingest(files).await?;
    Ok(format!(
        "uploaded site {} ({} files)\n",
        summary.hostname, summary.files
    ))
}

/// Any other method on /upload.
pub async fn upload_method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("invalid upload form: {}", e.body_text()))
    }
}
