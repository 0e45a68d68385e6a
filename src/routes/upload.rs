use crate::models::{ErrorKind, HealthResponse, ProcessingResult};
use crate::routes::reporter;
use crate::services::{ProcessingJob, RequestDispatcher, UploadStore};
use actix_multipart::Multipart;
use actix_web::{error, http::StatusCode, web, HttpResponse, Responder};
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;

/// Multipart field carrying the photo
pub const IMAGE_FIELD: &str = "image";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RequestDispatcher>,
    pub store: UploadStore,
    pub max_upload_bytes: usize,
    pub keep_uploads: bool,
}

/// Caller-input problems detected before any job is submitted
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file part")]
    NoFilePart,

    #[error("No selected file")]
    NoSelectedFile,

    #[error("Empty file")]
    EmptyFile,

    #[error("File too large")]
    TooLarge,

    #[error("Invalid multipart payload: {0}")]
    Multipart(String),

    #[error("Failed to store upload")]
    Storage(#[from] std::io::Error),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(_) => ErrorKind::InternalError,
            _ => ErrorKind::BadRequestError,
        }
    }

    fn as_result(&self) -> ProcessingResult {
        ProcessingResult::failure(self.kind(), self.to_string())
    }
}

impl error::ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        reporter::report(&self.as_result()).1
    }

    fn error_response(&self) -> HttpResponse {
        reporter::respond(&self.as_result())
    }
}

/// An image pulled out of the multipart body
#[derive(Debug)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Configure upload and health routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/upload", web::post().to(upload_image));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        workers: state.dispatcher.worker_count(),
        pending_jobs: state.dispatcher.pending(),
    })
}

/// Height estimation endpoint
///
/// POST /upload
///
/// Multipart form with a single file field named `image`. Responds with
/// ```json
/// {"status": "success", "height_info": {"height_cm": 208.0, "height_ft": 6, "height_inch": 9.89}}
/// ```
/// or `{"status": "error", "message": "..."}`.
async fn upload_image(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, UploadError> {
    let upload = read_image_field(&mut payload, state.max_upload_bytes)
        .await
        .map_err(|e| {
            tracing::info!("Rejected upload: {}", e);
            e
        })?;

    let path = state.store.save(&upload.filename, &upload.bytes).await.map_err(|e| {
        tracing::error!("Failed to store upload {}: {}", upload.filename, e);
        UploadError::Storage(e)
    })?;

    // Removed by the worker even if the client disconnects
    let job = ProcessingJob::new(&path).with_remove_input(!state.keep_uploads);
    tracing::info!("Image received: {} (job {})", upload.filename, job.id);

    let result = state.dispatcher.submit(job).await;
    Ok(reporter::respond(&result))
}

/// Find the `image` field and buffer its contents
async fn read_image_field(
    payload: &mut Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, UploadError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| UploadError::Multipart(e.to_string()))?;

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            return Err(UploadError::NoSelectedFile);
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            if bytes.len() + chunk.len() > max_bytes {
                return Err(UploadError::TooLarge);
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        return Ok(ImageUpload { filename, bytes });
    }

    Err(UploadError::NoFilePart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    #[actix_web::test]
    async fn test_input_errors_are_bad_requests() {
        for err in [
            UploadError::NoFilePart,
            UploadError::NoSelectedFile,
            UploadError::EmptyFile,
            UploadError::TooLarge,
            UploadError::Multipart("boundary".to_string()),
        ] {
            assert_eq!(err.kind(), ErrorKind::BadRequestError);
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }

        let resp = UploadError::TooLarge.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "error", "message": "File too large"})
        );
    }

    #[test]
    fn test_storage_error_is_internal() {
        let err = UploadError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
