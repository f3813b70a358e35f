mod config;
mod db;
mod error;
mod job_controller;
mod services;
#[cfg(test)]
mod test_support;

use crate::config::{AppConfig, ParamBinding};
use crate::db::SqliteDb;
use crate::services::artifacts::FsArtifactStore;
use crate::services::reports::engine::{Collaborators, EngineSettings, ReportEngine};
use actix_web::{App, HttpServer};
use env_logger::Env;
use log::{info, warn};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config =
        AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let db = SqliteDb::new(config.db_path.clone());
    db.init_schema().map_err(io::Error::other)?;
    std::fs::create_dir_all(&config.storage_dir)?;

    if config.param_binding == ParamBinding::Inline {
        warn!("custom SQL parameters are inlined as literals (REPORTS_PARAM_BINDING=inline)");
    }

    let artifacts = Arc::new(FsArtifactStore::new(
        config.storage_dir.clone(),
        config.public_base_url.clone(),
    ));
    let engine = ReportEngine::new(
        Collaborators::sqlite(db.clone(), artifacts),
        EngineSettings::from_config(&config),
    );

    info!(
        "Report engine running at http://{}:{} (db {}, storage {}, deadline {}s)",
        config.host,
        config.port,
        db.path().display(),
        config.storage_dir.display(),
        config.exec_timeout.as_secs()
    );

    let storage_dir = config.storage_dir.clone();
    HttpServer::new(move || {
        let engine = engine.clone();
        let db = db.clone();
        let storage_dir = storage_dir.clone();
        App::new().configure(move |cfg| services::configure(cfg, engine, db, storage_dir))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
