// Integration tests for Stature

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use futures_util::future::{select, Either};
use image::{ImageEncoder, RgbImage};
use parking_lot::Mutex;
use stature::core::{DetectorError, FixedDetector, LandmarkDetector, PreparedImage};
use stature::models::{CalibrationConfig, ErrorKind, LandmarkSet, ProcessingResult};
use stature::routes::{self, AppState};
use stature::services::{
    DetectorFactory, HeightPipeline, ProcessingJob, RequestDispatcher, UploadStore,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::task::{Context, Poll};
use std::time::Duration;

const BOUNDARY: &str = "stature-test-boundary";

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stature-{}-{}", tag, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::new(width, height);
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buffer
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).unwrap();
    path
}

fn standing_pose() -> LandmarkSet {
    LandmarkSet::new((0.5, 0.1), (0.4, 0.9), (0.6, 0.9)).unwrap()
}

fn pipeline(apply_margin_adjustment: bool) -> HeightPipeline {
    HeightPipeline::new(CalibrationConfig::new(0.26, apply_margin_adjustment))
}

fn fixed_factory(landmarks: Option<LandmarkSet>) -> DetectorFactory {
    Arc::new(move || Ok(Box::new(FixedDetector::new(landmarks)) as Box<dyn LandmarkDetector>))
}

fn multipart_body(field: &str, filename: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                field, name
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
        ),
    }
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn app_state(landmarks: Option<LandmarkSet>, upload_dir: &Path, keep_uploads: bool) -> AppState {
    let dispatcher = RequestDispatcher::new(2, pipeline(false), fixed_factory(landmarks)).unwrap();
    AppState {
        dispatcher: Arc::new(dispatcher),
        store: UploadStore::new(upload_dir),
        max_upload_bytes: 1024 * 1024,
        keep_uploads,
    }
}

fn upload_request(body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/upload")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

async fn post_upload(state: AppState, body: Vec<u8>) -> (StatusCode, serde_json::Value) {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let req = upload_request(body).to_request();
    let resp = test::call_service(&app, req).await;
    let status = resp.status();
    let json: serde_json::Value = test::read_body_json(resp).await;
    (status, json)
}

#[actix_web::test]
async fn test_upload_end_to_end() {
    let dir = scratch_dir("upload");
    let state = app_state(Some(standing_pose()), &dir, true);

    let (status, json) =
        post_upload(state, multipart_body("image", Some("person.png"), &png_bytes(500, 1000))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    let cm = json["height_info"]["height_cm"].as_f64().unwrap();
    assert!((cm - 208.0).abs() < 1e-6, "Expected 208 cm, got {}", cm);
    assert_eq!(json["height_info"]["height_ft"], 6);
    let inch = json["height_info"]["height_inch"].as_f64().unwrap();
    assert!((inch - 9.89).abs() < 0.01);

    // Upload persisted under a unique key
    let stored: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(stored.len(), 1);
}

#[actix_web::test]
async fn test_upload_without_image_field() {
    let dir = scratch_dir("nofield");
    let state = app_state(Some(standing_pose()), &dir, true);

    let (status, json) = post_upload(state, multipart_body("note", None, b"hello")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({"status": "error", "message": "No file part"}));
}

#[actix_web::test]
async fn test_upload_with_empty_filename() {
    let dir = scratch_dir("noname");
    let state = app_state(Some(standing_pose()), &dir, true);

    let (status, json) =
        post_upload(state, multipart_body("image", Some(""), &png_bytes(4, 4))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "No selected file");
}

#[actix_web::test]
async fn test_upload_no_person_detected() {
    let dir = scratch_dir("nobody");
    let state = app_state(None, &dir, false);

    let (status, json) =
        post_upload(state, multipart_body("image", Some("empty.png"), &png_bytes(40, 80))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        serde_json::json!({"status": "error", "message": "No person detected in the image."})
    );

    // keep_uploads = false removes the stored file
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[actix_web::test]
async fn test_upload_not_an_image() {
    let dir = scratch_dir("garbage");
    let state = app_state(Some(standing_pose()), &dir, true);

    let (status, json) =
        post_upload(state, multipart_body("image", Some("notes.png"), b"plain text")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
}

#[actix_web::test]
async fn test_upload_empty_file() {
    let dir = scratch_dir("emptyfile");
    let state = app_state(Some(standing_pose()), &dir, true);

    let (status, json) = post_upload(state, multipart_body("image", Some("empty.png"), b"")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({"status": "error", "message": "Empty file"}));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[actix_web::test]
async fn test_upload_too_large() {
    let dir = scratch_dir("toolarge");
    let state = app_state(Some(standing_pose()), &dir, true);
    let oversized = vec![0u8; 1024 * 1024 + 1];

    let (status, json) =
        post_upload(state, multipart_body("image", Some("huge.png"), &oversized)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({"status": "error", "message": "File too large"}));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[actix_web::test]
async fn test_upload_malformed_multipart() {
    let dir = scratch_dir("malformed");
    let state = app_state(Some(standing_pose()), &dir, true);

    let (status, json) =
        post_upload(state, b"this is not a multipart body\r\n".to_vec()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], "error");
    let message = json["message"].as_str().unwrap();
    assert!(
        message.starts_with("Invalid multipart payload"),
        "unexpected message: {}",
        message
    );
}

#[actix_web::test]
async fn test_disconnected_client_does_not_leave_upload() {
    let dir = scratch_dir("disconnect");
    let factory: DetectorFactory = Arc::new(|| {
        Ok(Box::new(|_: &PreparedImage| -> Result<Option<LandmarkSet>, DetectorError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Some(standing_pose()))
        }) as Box<dyn LandmarkDetector>)
    });
    let dispatcher = Arc::new(RequestDispatcher::new(1, pipeline(false), factory).unwrap());
    let state = AppState {
        dispatcher: Arc::clone(&dispatcher),
        store: UploadStore::new(&dir),
        max_upload_bytes: 1024 * 1024,
        keep_uploads: false,
    };
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let req = upload_request(multipart_body("image", Some("person.png"), &png_bytes(500, 1000)))
        .to_request();
    let call = Box::pin(test::call_service(&app, req));
    let queued = Box::pin(async {
        while dispatcher.pending() == 0 {
            actix_web::rt::time::sleep(Duration::from_millis(5)).await;
        }
    });

    // Client goes away while its job is in the pool
    match select(call, queued).await {
        Either::Left(_) => panic!("request completed before the job was observed"),
        Either::Right(((), call)) => drop(call),
    }

    while dispatcher.pending() > 0 {
        actix_web::rt::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[actix_web::test]
async fn test_health_endpoint() {
    let dir = scratch_dir("health");
    let state = app_state(Some(standing_pose()), &dir, true);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["workers"], 2);
    assert_eq!(json["pending_jobs"], 0);
}

#[::core::prelude::v1::test]
fn test_concurrent_jobs_keep_identity() {
    let dir = scratch_dir("concurrent");
    // Detector is slow enough that jobs pile up behind the 3 workers
    let factory: DetectorFactory = Arc::new(|| {
        Ok(Box::new(|_: &PreparedImage| -> Result<Option<LandmarkSet>, DetectorError> {
            std::thread::sleep(Duration::from_millis(10));
            Ok(Some(standing_pose()))
        }) as Box<dyn LandmarkDetector>)
    });
    let dispatcher = RequestDispatcher::new(3, pipeline(false), factory).unwrap();

    let heights: Vec<u32> = (1..=12).map(|i| i * 50).collect();
    let paths: Vec<PathBuf> = heights
        .iter()
        .map(|h| write_png(&dir, &format!("h{}.png", h), 10, *h))
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = heights
            .iter()
            .zip(&paths)
            .map(|(height, path)| {
                let dispatcher = &dispatcher;
                scope.spawn(move || {
                    let result = dispatcher.submit_blocking(ProcessingJob::new(path));
                    (*height, result)
                })
            })
            .collect();

        for handle in handles {
            let (height, result) = handle.join().unwrap();
            let estimate = result.estimate().expect("every job succeeds");
            // head at 10%, feet at 90%: 80% of the frame
            let expected_px = (0.9 * height as f64).round() - (0.1 * height as f64).round();
            let expected_cm = expected_px * 0.26;
            assert!(
                (estimate.value_physical - expected_cm).abs() < 1e-9,
                "job for height {} got {} cm, expected {}",
                height,
                estimate.value_physical,
                expected_cm
            );
        }
    });

    assert_eq!(dispatcher.pending(), 0);
}

#[::core::prelude::v1::test]
fn test_queue_is_fifo() {
    let dir = scratch_dir("fifo");
    let gate = Arc::new(Barrier::new(2));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let factory: DetectorFactory = {
        let gate = Arc::clone(&gate);
        let seen = Arc::clone(&seen);
        Arc::new(move || {
            let gate = Arc::clone(&gate);
            let seen = Arc::clone(&seen);
            Ok(Box::new(move |image: &PreparedImage| -> Result<Option<LandmarkSet>, DetectorError> {
                if image.height() == 10 {
                    gate.wait();
                }
                seen.lock().push(image.height());
                Ok(Some(standing_pose()))
            }) as Box<dyn LandmarkDetector>)
        })
    };
    let dispatcher = RequestDispatcher::new(1, pipeline(false), factory).unwrap();

    let heights = [10u32, 100, 200, 300, 400, 500];
    let mut futures: Vec<_> = heights
        .iter()
        .map(|h| {
            let path = write_png(&dir, &format!("q{}.png", h), 10, *h);
            Box::pin(dispatcher.submit(ProcessingJob::new(path)))
        })
        .collect();

    // First poll enqueues each job, in this order
    let waker = futures_util::task::noop_waker();
    let mut cx = Context::from_waker(&waker);
    for future in futures.iter_mut() {
        assert!(matches!(future.as_mut().poll(&mut cx), Poll::Pending));
    }

    gate.wait();

    for future in futures {
        assert!(tokio_test::block_on(future).is_success());
    }

    assert_eq!(*seen.lock(), heights.to_vec());
}

#[::core::prelude::v1::test]
fn test_failures_do_not_leak_between_jobs() {
    let dir = scratch_dir("mixed");
    let dispatcher =
        RequestDispatcher::new(2, pipeline(true), fixed_factory(Some(standing_pose()))).unwrap();

    let good = write_png(&dir, "good.png", 500, 1000);
    let bad = dir.join("bad.png");
    std::fs::write(&bad, b"not an image").unwrap();

    let results: Vec<ProcessingResult> = [&good, &bad, &good]
        .iter()
        .map(|path| dispatcher.submit_blocking(ProcessingJob::new(*path)))
        .collect();

    assert!((results[0].estimate().unwrap().value_physical - 260.0).abs() < 1e-9);
    assert!(matches!(
        results[1],
        ProcessingResult::Failure { kind: ErrorKind::DecodeError, .. }
    ));
    assert!((results[2].estimate().unwrap().value_physical - 260.0).abs() < 1e-9);
}
