// Model exports
pub mod domain;
pub mod responses;

pub use domain::{
    CalibrationConfig, ErrorKind, HeightEstimate, Landmark, LandmarkName, LandmarkSet, PixelPoint,
    ProcessingResult, CM_TO_INCHES,
};
pub use responses::{ApiResponse, HealthResponse, HeightInfo};
