// Route exports
pub mod reporter;
pub mod upload;

use actix_web::web;

pub use upload::{AppState, UploadError};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(upload::configure)
        .service(web::scope("/api/v1").configure(upload::configure));
}
