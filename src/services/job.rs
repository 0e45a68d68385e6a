use crate::core::{
    annotate, prepare, EstimationError, HeightEstimator, LandmarkDetector, Measurement,
};
use crate::models::{CalibrationConfig, ProcessingResult};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Static per-deployment pipeline settings shared by every job
#[derive(Debug, Clone)]
pub struct HeightPipeline {
    pub estimator: HeightEstimator,
    pub target_reference_height: Option<u32>,
    /// Where to write keypoint overlays, if anywhere
    pub annotate_dir: Option<PathBuf>,
}

impl HeightPipeline {
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self {
            estimator: HeightEstimator::new(calibration),
            target_reference_height: None,
            annotate_dir: None,
        }
    }

    pub fn with_target_height(mut self, target_reference_height: Option<u32>) -> Self {
        self.target_reference_height = target_reference_height;
        self
    }

    pub fn with_annotate_dir(mut self, annotate_dir: Option<PathBuf>) -> Self {
        self.annotate_dir = annotate_dir;
        self
    }
}

/// One height-estimation request: an image on disk to measure
#[derive(Debug, Clone)]
pub struct ProcessingJob {
    pub id: Uuid,
    pub image_path: PathBuf,
    /// Delete `image_path` once the job has run, whatever the outcome
    pub remove_input: bool,
}

impl ProcessingJob {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_path: image_path.into(),
            remove_input: false,
        }
    }

    pub fn with_remove_input(mut self, remove_input: bool) -> Self {
        self.remove_input = remove_input;
        self
    }

    /// Run load → prepare → detect → estimate
    ///
    /// Every stage failure is folded into `ProcessingResult::Failure`.
    /// Input removal happens here rather than at the caller, so it still
    /// runs when the caller stops waiting for the result.
    pub fn run(
        &self,
        pipeline: &HeightPipeline,
        detector: &mut dyn LandmarkDetector,
    ) -> ProcessingResult {
        tracing::debug!("Job {} started for {}", self.id, self.image_path.display());
        // Dropped on return and on unwind
        let _cleanup = self.remove_input.then(|| InputCleanup {
            job_id: self.id,
            path: &self.image_path,
        });

        match self.measure(pipeline, detector) {
            Ok(measurement) => {
                tracing::info!(
                    "Job {}: estimated height {} (pixel height {}, adjusted {})",
                    self.id,
                    measurement.estimate,
                    measurement.pixel_height,
                    measurement.adjusted_pixel_height
                );
                ProcessingResult::Success(measurement.estimate)
            }
            Err(e) => {
                tracing::warn!("Job {} failed: {}", self.id, e);
                ProcessingResult::failure(e.kind(), e.to_string())
            }
        }
    }

    fn measure(
        &self,
        pipeline: &HeightPipeline,
        detector: &mut dyn LandmarkDetector,
    ) -> Result<Measurement, EstimationError> {
        let bytes = std::fs::read(&self.image_path)?;
        let image = prepare(&bytes, pipeline.target_reference_height)?;

        let landmarks = detector
            .detect(&image)?
            .ok_or(EstimationError::NoDetection)?;

        let measurement = pipeline
            .estimator
            .measure(image.width(), image.height(), &landmarks)?;

        if let Some(dir) = &pipeline.annotate_dir {
            self.write_annotation(dir, image.pixels(), &measurement);
        }

        Ok(measurement)
    }

    fn write_annotation(&self, dir: &Path, pixels: &image::RgbImage, measurement: &Measurement) {
        let path = dir.join(format!("{}.png", self.id));
        let result = std::fs::create_dir_all(dir)
            .map_err(image::ImageError::IoError)
            .and_then(|_| annotate::save_annotated(pixels, measurement, &path));

        match result {
            Ok(()) => tracing::debug!("Job {}: annotation written to {}", self.id, path.display()),
            Err(e) => tracing::warn!("Job {}: failed to write annotation: {}", self.id, e),
        }
    }
}

struct InputCleanup<'a> {
    job_id: Uuid,
    path: &'a Path,
}

impl Drop for InputCleanup<'_> {
    fn drop(&mut self) {
        match std::fs::remove_file(self.path) {
            Ok(()) => tracing::debug!("Job {}: removed {}", self.job_id, self.path.display()),
            Err(e) => tracing::warn!(
                "Job {}: failed to remove {}: {}",
                self.job_id,
                self.path.display(),
                e
            ),
        }
    }
}
