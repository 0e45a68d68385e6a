use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Centimetres to inches
pub const CM_TO_INCHES: f64 = 0.393701;

/// Anatomical landmark names the pipeline depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkName {
    /// Nose / crown proxy
    Head,
    FootLeft,
    FootRight,
}

/// A named point in image-relative coordinates, both axes in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: LandmarkName,
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    /// Build a landmark, clamping finite coordinates into `[0, 1]`.
    ///
    /// Returns `None` for NaN or infinite coordinates.
    pub fn new(name: LandmarkName, x: f64, y: f64) -> Option<Self> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Self {
            name,
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        })
    }

    /// Convert to absolute pixel coordinates for a `width` x `height` image
    pub fn to_pixel(&self, width: u32, height: u32) -> PixelPoint {
        PixelPoint {
            x: scale_axis(self.x, width),
            y: scale_axis(self.y, height),
        }
    }
}

#[inline]
fn scale_axis(norm: f64, extent: u32) -> i64 {
    let max = i64::from(extent.saturating_sub(1));
    ((norm * f64::from(extent)).round() as i64).clamp(0, max)
}

/// Absolute pixel position, origin top-left, y growing downward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

/// Complete head + feet landmark set for one person
///
/// There is no way to build a partial set: either all three landmarks are
/// present or the detector reports no detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub head: Landmark,
    pub foot_left: Landmark,
    pub foot_right: Landmark,
}

impl LandmarkSet {
    pub fn new(head: (f64, f64), foot_left: (f64, f64), foot_right: (f64, f64)) -> Option<Self> {
        Some(Self {
            head: Landmark::new(LandmarkName::Head, head.0, head.1)?,
            foot_left: Landmark::new(LandmarkName::FootLeft, foot_left.0, foot_left.1)?,
            foot_right: Landmark::new(LandmarkName::FootRight, foot_right.0, foot_right.1)?,
        })
    }

    /// Assemble a set from an arbitrary list of named landmarks.
    ///
    /// Returns `None` when any of the required names is missing.
    pub fn from_landmarks<I>(landmarks: I) -> Option<Self>
    where
        I: IntoIterator<Item = Landmark>,
    {
        let mut head = None;
        let mut foot_left = None;
        let mut foot_right = None;

        for landmark in landmarks {
            match landmark.name {
                LandmarkName::Head => head = Some(landmark),
                LandmarkName::FootLeft => foot_left = Some(landmark),
                LandmarkName::FootRight => foot_right = Some(landmark),
            }
        }

        Some(Self {
            head: head?,
            foot_left: foot_left?,
            foot_right: foot_right?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        [&self.head, &self.foot_left, &self.foot_right].into_iter()
    }
}

/// Per-deployment pixel-to-centimetre calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct CalibrationConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub pixel_to_physical_unit: f64,
    #[serde(default)]
    pub apply_margin_adjustment: bool,
}

impl CalibrationConfig {
    pub fn new(pixel_to_physical_unit: f64, apply_margin_adjustment: bool) -> Self {
        Self {
            pixel_to_physical_unit,
            apply_margin_adjustment,
        }
    }
}

/// Estimated standing height, centimetres plus imperial breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightEstimate {
    pub value_physical: f64,
    pub feet: u32,
    pub inches: f64,
}

impl HeightEstimate {
    /// Derive the imperial breakdown from a height in centimetres
    ///
    /// `value_physical` must be non-negative; [`HeightEstimator`] never
    /// produces anything else.
    ///
    /// [`HeightEstimator`]: crate::core::HeightEstimator
    pub fn from_centimeters(value_physical: f64) -> Self {
        debug_assert!(value_physical >= 0.0, "negative height {}", value_physical);
        let inches_total = value_physical * CM_TO_INCHES;
        let feet = (inches_total / 12.0).floor() as u32;
        let inches = inches_total.rem_euclid(12.0);

        Self {
            value_physical,
            feet,
            inches,
        }
    }

    pub fn total_inches(&self) -> f64 {
        f64::from(self.feet) * 12.0 + self.inches
    }
}

impl fmt::Display for HeightEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} cm ({} ft {:.1} inches)",
            self.value_physical, self.feet, self.inches
        )
    }
}

/// Failure categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DecodeError,
    NoDetectionError,
    InvalidGeometryError,
    InternalError,
    /// Caller input rejected at the upload boundary
    BadRequestError,
}

/// Outcome of one processing job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessingResult {
    Success(HeightEstimate),
    Failure { kind: ErrorKind, message: String },
}

impl ProcessingResult {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn estimate(&self) -> Option<&HeightEstimate> {
        match self {
            Self::Success(estimate) => Some(estimate),
            Self::Failure { .. } => None,
        }
    }
}
