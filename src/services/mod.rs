// Service exports
pub mod detector;
pub mod dispatcher;
pub mod job;
pub mod storage;

pub use detector::RemoteDetector;
pub use dispatcher::{DetectorFactory, DispatcherError, RequestDispatcher, DEFAULT_WORKERS};
pub use job::{HeightPipeline, ProcessingJob};
pub use storage::UploadStore;
