use serde::{Deserialize, Serialize};

/// Height breakdown returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightInfo {
    pub height_cm: f64,
    pub height_ft: u32,
    pub height_inch: f64,
}

/// Response body for the upload endpoint
///
/// Serializes to either
/// `{"status": "success", "height_info": {...}}` or
/// `{"status": "error", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse {
    Success { height_info: HeightInfo },
    Error { message: String },
}

impl ApiResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub workers: usize,
    pub pending_jobs: usize,
}
