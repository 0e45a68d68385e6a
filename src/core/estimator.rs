use crate::core::error::EstimationError;
use crate::core::preparer::PreparedImage;
use crate::models::{CalibrationConfig, HeightEstimate, LandmarkSet, PixelPoint};

/// Full measurement, including the intermediate pixel geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub head: PixelPoint,
    /// Representative foot point: left foot x, averaged foot y
    pub foot: PixelPoint,
    /// Head-to-foot distance in pixels
    pub pixel_height: i64,
    /// Pixel height after the optional margin adjustment
    pub adjusted_pixel_height: i64,
    pub estimate: HeightEstimate,
}

/// Converts head/foot landmarks into a physical height
///
/// # Algorithm
/// 1. Landmarks to pixel coordinates on the prepared image
/// 2. Foot y = rounded mean of both feet
/// 3. Pixel height = foot y - head y, must be positive
/// 4. Optional margin adjustment adds the head-to-top and foot-to-bottom gaps
/// 5. Multiply by the calibration factor (centimetres)
/// 6. Imperial breakdown
#[derive(Debug, Clone, Copy)]
pub struct HeightEstimator {
    calibration: CalibrationConfig,
}

impl HeightEstimator {
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    pub fn estimate(
        &self,
        image: &PreparedImage,
        landmarks: &LandmarkSet,
    ) -> Result<HeightEstimate, EstimationError> {
        self.measure(image.width(), image.height(), landmarks)
            .map(|m| m.estimate)
    }

    /// Run the estimation on raw image dimensions
    ///
    /// Fails with `InvalidCalibration` unless the factor is positive and finite.
    pub fn measure(
        &self,
        width: u32,
        height: u32,
        landmarks: &LandmarkSet,
    ) -> Result<Measurement, EstimationError> {
        let factor = self.calibration.pixel_to_physical_unit;
        if !(factor.is_finite() && factor > 0.0) {
            return Err(EstimationError::InvalidCalibration(factor));
        }

        let head = landmarks.head.to_pixel(width, height);
        let foot_left = landmarks.foot_left.to_pixel(width, height);
        let foot_right = landmarks.foot_right.to_pixel(width, height);

        let foot_y = ((foot_left.y + foot_right.y) as f64 / 2.0).round() as i64;
        let foot = PixelPoint {
            x: foot_left.x,
            y: foot_y,
        };

        let pixel_height = foot.y - head.y;
        if pixel_height <= 0 {
            return Err(EstimationError::InvalidGeometry {
                head_y: head.y,
                foot_y: foot.y,
            });
        }

        let adjusted_pixel_height = if self.calibration.apply_margin_adjustment {
            let top_margin = head.y;
            let bottom_margin = i64::from(height) - foot.y;
            pixel_height + top_margin + bottom_margin
        } else {
            pixel_height
        };

        let value_physical = adjusted_pixel_height as f64 * factor;

        Ok(Measurement {
            head,
            foot,
            pixel_height,
            adjusted_pixel_height,
            estimate: HeightEstimate::from_centimeters(value_physical),
        })
    }
}
