//! Invoice processing HTTP handler.
//!
//! One endpoint: multipart upload in, single-row CSV out. The upload is
//! spooled to a uniquely-named temporary file for the duration of the
//! request; the spool file is removed on drop whether processing succeeds
//! or fails.

use std::io::Write;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use tracing::{debug, info};

use facture_core::{
    defaults, detect_mime_type, flatten_entities, reconcile_entities, render_csv, validate_file,
    Error,
};

use crate::{ApiError, AppState};

/// Process an uploaded invoice document into a tabular result.
///
/// Accepts multipart/form-data with a `file` field and returns the
/// reconciled record as a CSV attachment.
///
/// # Multipart Fields
/// - `file`: Document image or PDF (required)
///
/// # Returns
/// - 200 OK with a `text/csv` body (header row + one data row)
/// - 400 Bad Request if the file is missing, empty, or blocked by safety
///   validation
/// - 500 Internal Server Error if an external backend fails
pub async fn process_invoice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::from("upload");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                if let Some(name) = field.file_name() {
                    filename = name.to_string();
                }
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            _ => {} // ignore unknown fields
        }
    }

    let data = file_data
        .ok_or_else(|| ApiError::BadRequest("Missing file in multipart form".to_string()))?;

    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".into()));
    }

    let max_upload_bytes = std::env::var("MAX_UPLOAD_SIZE_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(defaults::MAX_UPLOAD_SIZE_BYTES);

    let validation = validate_file(&filename, &data, max_upload_bytes as u64);
    if !validation.allowed {
        let reason = validation
            .block_reason
            .unwrap_or_else(|| "File rejected".to_string());
        return Err(ApiError::BadRequest(reason));
    }

    let mime_type = detect_mime_type(&filename, &data);

    // Spool the upload for the lifetime of the request. NamedTempFile
    // unlinks on drop, which covers every early return below.
    let mut spool = tempfile::NamedTempFile::new().map_err(|e| ApiError::from(Error::Io(e)))?;
    spool
        .write_all(&data)
        .map_err(|e| ApiError::from(Error::Io(e)))?;
    spool.flush().map_err(|e| ApiError::from(Error::Io(e)))?;
    debug!(
        filename = %filename,
        mime_type = %mime_type,
        file_size = data.len(),
        spool_path = %spool.path().display(),
        "Upload spooled"
    );

    let file_bytes = tokio::fs::read(spool.path())
        .await
        .map_err(|e| ApiError::from(Error::Io(e)))?;

    let document_entities = state
        .extraction
        .extract_entities(&file_bytes, &mime_type)
        .await?;
    let entities = flatten_entities(&document_entities);

    let record = reconcile_entities(&entities, state.refinement.as_ref()).await?;
    let csv_bytes = render_csv(&record)?;

    info!(
        op = "process_invoice",
        filename = %filename,
        mime_type = %mime_type,
        entity_count = entities.len(),
        field_count = record.populated_fields(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Invoice processed"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", defaults::OUTPUT_FILENAME),
            ),
        ],
        csv_bytes,
    ))
}
