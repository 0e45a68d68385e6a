use crate::core::{DetectorError, LandmarkDetector};
use crate::models::{ErrorKind, ProcessingResult};
use crate::services::job::{HeightPipeline, ProcessingJob};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::oneshot;

/// Default worker count when none is configured
pub const DEFAULT_WORKERS: usize = 4;

/// Builds one detector per worker, invoked on the worker thread itself
pub type DetectorFactory =
    Arc<dyn Fn() -> Result<Box<dyn LandmarkDetector>, DetectorError> + Send + Sync>;

/// Errors that can occur while starting the worker pool
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker {index} failed to initialize its detector: {source}")]
    DetectorInit {
        index: usize,
        #[source]
        source: DetectorError,
    },

    #[error("A worker exited during startup")]
    WorkerExited,
}

struct QueuedJob {
    job: ProcessingJob,
    reply: oneshot::Sender<ProcessingResult>,
}

/// Bounded worker pool executing [`ProcessingJob`]s
///
/// # Guarantees
/// - Exactly `workers` OS threads, each owning its own detector instance
/// - One shared FIFO queue; jobs start in submission order
/// - Each caller gets back the result of the job it submitted
/// - A panicking job yields `InternalError` for that job only; the worker
///   keeps serving the queue
///
/// There are no timeouts: a job that hangs keeps its worker busy until it
/// returns.
pub struct RequestDispatcher {
    sender: Option<mpsc::Sender<QueuedJob>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
}

impl RequestDispatcher {
    /// Start `workers` threads (at least one) and wait until every detector
    /// is initialized.
    pub fn new(
        workers: usize,
        pipeline: HeightPipeline,
        detector_factory: DetectorFactory,
    ) -> Result<Self, DispatcherError> {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<QueuedJob>();
        let receiver = Arc::new(Mutex::new(receiver));
        let pipeline = Arc::new(pipeline);
        let pending = Arc::new(AtomicUsize::new(0));
        let (ready_tx, ready_rx) = mpsc::channel::<(usize, Result<(), DetectorError>)>();

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let receiver = Arc::clone(&receiver);
            let pipeline = Arc::clone(&pipeline);
            let pending = Arc::clone(&pending);
            let factory = Arc::clone(&detector_factory);
            let ready_tx = ready_tx.clone();

            let handle = std::thread::Builder::new()
                .name(format!("height-worker-{}", index))
                .spawn(move || {
                    let detector = match factory() {
                        Ok(detector) => {
                            let _ = ready_tx.send((index, Ok(())));
                            detector
                        }
                        Err(e) => {
                            let _ = ready_tx.send((index, Err(e)));
                            return;
                        }
                    };
                    drop(ready_tx);
                    worker_loop(index, detector, &receiver, &pipeline, &pending);
                })?;
            handles.push(handle);
        }
        drop(ready_tx);

        let mut dispatcher = Self {
            sender: Some(sender),
            workers: handles,
            pending,
        };

        for _ in 0..workers {
            match ready_rx.recv() {
                Ok((_, Ok(()))) => {}
                Ok((index, Err(source))) => {
                    dispatcher.shutdown();
                    return Err(DispatcherError::DetectorInit { index, source });
                }
                Err(_) => {
                    dispatcher.shutdown();
                    return Err(DispatcherError::WorkerExited);
                }
            }
        }

        tracing::info!("Request dispatcher started with {} workers", workers);
        Ok(dispatcher)
    }

    /// Queue a job and wait for its result
    pub async fn submit(&self, job: ProcessingJob) -> ProcessingResult {
        match self.enqueue(job) {
            Ok(rx) => rx.await.unwrap_or_else(|_| worker_lost()),
            Err(result) => result,
        }
    }

    /// Queue a job and block the current thread until it completes
    ///
    /// Must not be called from within an async executor; use [`submit`] there.
    ///
    /// [`submit`]: RequestDispatcher::submit
    pub fn submit_blocking(&self, job: ProcessingJob) -> ProcessingResult {
        match self.enqueue(job) {
            Ok(rx) => rx.blocking_recv().unwrap_or_else(|_| worker_lost()),
            Err(result) => result,
        }
    }

    /// Jobs queued or currently running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    fn enqueue(
        &self,
        job: ProcessingJob,
    ) -> Result<oneshot::Receiver<ProcessingResult>, ProcessingResult> {
        let Some(sender) = &self.sender else {
            return Err(pool_closed());
        };

        let (reply, rx) = oneshot::channel();
        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(QueuedJob { job, reply }).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(pool_closed());
        }
        Ok(rx)
    }

    /// Close the queue and join every worker; queued jobs still run first
    pub fn shutdown(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked outside of a job");
            }
        }
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    index: usize,
    mut detector: Box<dyn LandmarkDetector>,
    receiver: &Mutex<mpsc::Receiver<QueuedJob>>,
    pipeline: &HeightPipeline,
    pending: &AtomicUsize,
) {
    loop {
        // Lock is released as soon as a job is dequeued
        let next = receiver.lock().recv();
        let Ok(QueuedJob { job, reply }) = next else {
            tracing::debug!("Worker {} stopping: queue closed", index);
            break;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run(pipeline, &mut *detector)));
        let result = outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!("Worker {} caught panic in job {}: {}", index, job.id, message);
            ProcessingResult::failure(
                ErrorKind::InternalError,
                format!("Internal error while processing image: {}", message),
            )
        });

        pending.fetch_sub(1, Ordering::SeqCst);
        if reply.send(result).is_err() {
            tracing::debug!("Caller for job {} went away before the result", job.id);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn pool_closed() -> ProcessingResult {
    ProcessingResult::failure(ErrorKind::InternalError, "Processing pool is shut down")
}

fn worker_lost() -> ProcessingResult {
    ProcessingResult::failure(ErrorKind::InternalError, "Worker dropped the job")
}
