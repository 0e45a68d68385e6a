use crate::core::landmarks::DetectorError;
use crate::models::ErrorKind;
use thiserror::Error;

/// Message reported when the pose model finds nobody in the frame
pub const NO_DETECTION_MESSAGE: &str = "No person detected in the image.";

/// Errors raised along the estimation pipeline
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("No person detected in the image.")]
    NoDetection,

    #[error("Invalid geometry: foot (y={foot_y}) is not below head (y={head_y})")]
    InvalidGeometry { head_y: i64, foot_y: i64 },

    #[error("Invalid calibration: pixel_to_physical_unit must be positive, got {0}")]
    InvalidCalibration(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Landmark detector failed: {0}")]
    Detector(#[from] DetectorError),
}

impl EstimationError {
    /// Category reported to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::DecodeError,
            Self::NoDetection => ErrorKind::NoDetectionError,
            Self::InvalidGeometry { .. } => ErrorKind::InvalidGeometryError,
            Self::InvalidCalibration(_) | Self::Io(_) | Self::Detector(_) => {
                ErrorKind::InternalError
            }
        }
    }
}
