//! Data source registry: the whitelist of tables and fields reports may read.
//!
//! Routes under `/api/data_sources`:
//! - `POST /save`: insert or replace a `DataSource` entry.
//! - `GET /{code}`: fetch one entry.

pub mod get;
pub mod registry;
pub mod save;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/data_sources";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/save", post().to(save::process))
        .route("/{code}", get().to(get::process))
}
