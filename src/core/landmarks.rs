use crate::core::preparer::PreparedImage;
use crate::models::LandmarkSet;
use thiserror::Error;

/// Errors raised by a landmark detector backend
///
/// "Nobody in frame" is not an error; detectors return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Pose service returned status {0}")]
    Status(u16),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode image for detection: {0}")]
    Encode(#[from] image::ImageError),
}

/// Pose-detection backend
///
/// Implementations must return a complete [`LandmarkSet`] or `Ok(None)`;
/// partial or empty results are reported as `Ok(None)`, never as zeroed
/// coordinates. Each dispatcher worker owns its own instance, so
/// implementations only need to be `Send`.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, image: &PreparedImage) -> Result<Option<LandmarkSet>, DetectorError>;
}

impl<F> LandmarkDetector for F
where
    F: FnMut(&PreparedImage) -> Result<Option<LandmarkSet>, DetectorError> + Send,
{
    fn detect(&mut self, image: &PreparedImage) -> Result<Option<LandmarkSet>, DetectorError> {
        self(image)
    }
}

/// Detector that always answers with the same landmarks
///
/// Useful for fixed-rig deployments where the subject position is known and
/// for exercising the pipeline without a pose service.
#[derive(Debug, Clone, Copy)]
pub struct FixedDetector {
    landmarks: Option<LandmarkSet>,
}

impl FixedDetector {
    pub fn new(landmarks: Option<LandmarkSet>) -> Self {
        Self { landmarks }
    }
}

impl LandmarkDetector for FixedDetector {
    fn detect(&mut self, _image: &PreparedImage) -> Result<Option<LandmarkSet>, DetectorError> {
        Ok(self.landmarks)
    }
}
