use crate::core::{DetectorError, LandmarkDetector, PreparedImage};
use crate::models::LandmarkSet;
use image::ImageEncoder;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Landmark count of a BlazePose full-body result
pub const BLAZEPOSE_LANDMARK_COUNT: usize = 33;
/// Nose, used as the head proxy
pub const BLAZEPOSE_HEAD: usize = 0;
pub const BLAZEPOSE_LEFT_FOOT_INDEX: usize = 31;
pub const BLAZEPOSE_RIGHT_FOOT_INDEX: usize = 32;

#[derive(Debug, Deserialize)]
struct PoseResponse {
    #[serde(default)]
    landmarks: Option<Vec<RawLandmark>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawLandmark {
    x: f64,
    y: f64,
}

/// Client for an HTTP pose-estimation sidecar
///
/// The prepared frame is POSTed as an RGB PNG. The service answers with
/// `{"landmarks": [{"x": .., "y": .., ...}, ...]}` in BlazePose order
/// (33 points, normalized coordinates). A missing, empty or short list
/// means nobody was detected.
///
/// Uses the blocking reqwest client: detection runs on dispatcher worker
/// threads, never on the async executor.
pub struct RemoteDetector {
    endpoint: String,
    client: Client,
}

impl RemoteDetector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DetectorError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LandmarkDetector for RemoteDetector {
    fn detect(&mut self, image: &PreparedImage) -> Result<Option<LandmarkSet>, DetectorError> {
        let body = encode_png(image)?;

        tracing::debug!(
            "Requesting pose for {}x{} frame from {}",
            image.width(),
            image.height(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(body)
            .send()?;

        if !response.status().is_success() {
            return Err(DetectorError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes()?;
        let parsed: PoseResponse = serde_json::from_slice(&bytes)
            .map_err(|e| DetectorError::InvalidResponse(e.to_string()))?;

        Ok(parsed.landmarks.as_deref().and_then(landmarks_from_blazepose))
    }
}

/// Pick head and feet out of a BlazePose landmark list
fn landmarks_from_blazepose(points: &[RawLandmark]) -> Option<LandmarkSet> {
    if points.len() < BLAZEPOSE_LANDMARK_COUNT {
        return None;
    }

    let head = points[BLAZEPOSE_HEAD];
    let foot_left = points[BLAZEPOSE_LEFT_FOOT_INDEX];
    let foot_right = points[BLAZEPOSE_RIGHT_FOOT_INDEX];

    LandmarkSet::new(
        (head.x, head.y),
        (foot_left.x, foot_left.y),
        (foot_right.x, foot_right.y),
    )
}

fn encode_png(image: &PreparedImage) -> Result<Vec<u8>, DetectorError> {
    let pixels = image.pixels();
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}
