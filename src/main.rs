use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use stature::config::Settings;
use stature::core::LandmarkDetector;
use stature::routes::{self, AppState};
use stature::services::{DetectorFactory, HeightPipeline, RemoteDetector, RequestDispatcher, UploadStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging, RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if settings.logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Stature height estimation service...");
    info!(
        "Calibration: {} cm/px, margin adjustment {}",
        settings.calibration.pixel_to_physical_unit,
        if settings.calibration.apply_margin_adjustment { "on" } else { "off" }
    );

    let pipeline = HeightPipeline::new(settings.calibration)
        .with_target_height(settings.pipeline.target_reference_height)
        .with_annotate_dir(settings.pipeline.annotate_dir.clone());

    // One detector client per worker, built on the worker thread
    let endpoint = settings.detector.endpoint.clone();
    let timeout = Duration::from_secs(settings.detector.timeout_secs);
    let factory: DetectorFactory = Arc::new(move || {
        RemoteDetector::new(endpoint.clone(), timeout)
            .map(|d| Box::new(d) as Box<dyn LandmarkDetector>)
    });

    let dispatcher = RequestDispatcher::new(settings.pipeline.workers, pipeline, factory)
        .map_err(|e| {
            error!("Failed to start worker pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;

    info!(
        "Pose detector at {} ({} workers)",
        settings.detector.endpoint,
        dispatcher.worker_count()
    );

    let app_state = AppState {
        dispatcher: Arc::new(dispatcher),
        store: UploadStore::new(&settings.pipeline.upload_dir),
        max_upload_bytes: settings.pipeline.max_upload_bytes,
        keep_uploads: settings.pipeline.keep_uploads,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
