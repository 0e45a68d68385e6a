// Core pipeline exports
pub mod annotate;
pub mod error;
pub mod estimator;
pub mod landmarks;
pub mod preparer;

pub use error::{EstimationError, NO_DETECTION_MESSAGE};
pub use estimator::{HeightEstimator, Measurement};
pub use landmarks::{DetectorError, FixedDetector, LandmarkDetector};
pub use preparer::{prepare, PreparedImage};
