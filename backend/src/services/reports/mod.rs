//! # Report Service Module
//!
//! Everything between a `GeneratedReport` record and its rendered artifact.
//!
//! ## Registered Routes (under `/api/reports`):
//!
//! *   **`POST /`**: registers a pending report for a template, returns its id.
//! *   **`POST /generate`**: runs generation for a report and returns the rows.
//! *   **`GET /{report_id}`**: the stored record plus the number of runs in flight.

pub mod binder;
mod create;
pub mod engine;
pub mod executor;
pub mod filters;
mod generate;
mod get;
pub mod masking;
pub mod projection;
pub mod render;
pub mod store;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/reports";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("/generate", post().to(generate::process))
        .route("/{report_id}", get().to(get::process))
}
