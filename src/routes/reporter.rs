use crate::models::{ApiResponse, ErrorKind, HeightInfo, ProcessingResult};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;

/// Map a processing result to the client-facing payload and status
pub fn report(result: &ProcessingResult) -> (ApiResponse, StatusCode) {
    match result {
        ProcessingResult::Success(estimate) => (
            ApiResponse::Success {
                height_info: HeightInfo {
                    height_cm: estimate.value_physical,
                    height_ft: estimate.feet,
                    height_inch: estimate.inches,
                },
            },
            StatusCode::OK,
        ),
        ProcessingResult::Failure { kind, message } => {
            (ApiResponse::error(message.clone()), status_for(*kind))
        }
    }
}

/// Build the HTTP response for a processing result
pub fn respond(result: &ProcessingResult) -> HttpResponse {
    let (payload, status) = report(result);
    HttpResponse::build(status).json(payload)
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequestError => StatusCode::BAD_REQUEST,
        ErrorKind::DecodeError
        | ErrorKind::NoDetectionError
        | ErrorKind::InvalidGeometryError
        | ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
