//! Stature - single-photo standing height estimation service
//!
//! This library provides the height estimation pipeline (decode, pose
//! landmarks, pixel-to-centimetre conversion) and the bounded worker pool
//! that serves it over HTTP.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{prepare, EstimationError, HeightEstimator, LandmarkDetector, PreparedImage};
pub use models::{CalibrationConfig, HeightEstimate, LandmarkSet, ProcessingResult};
pub use services::{HeightPipeline, ProcessingJob, RequestDispatcher};
