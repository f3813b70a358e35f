//! # Artifact Store
//!
//! Rendered reports are written under a deterministic key,
//! `reports/<report id>.<extension>`, so a rerun overwrites the previous
//! artifact of the same report. The filesystem store is also mounted at
//! `/files` so published URLs resolve against this service.

use actix_files::Files;
use common::model::report::OutputFormat;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const FILES_PATH: &str = "/files";

/// Blob storage consumed by the engine. Upload failures are never fatal to a run.
pub trait ArtifactStore: Send + Sync {
    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), String>;
    /// Retrieval URL for a stored key, when the store publishes one.
    fn public_url(&self, key: &str) -> Option<String>;
}

pub fn artifact_key(report_id: &str, format: OutputFormat) -> String {
    format!("reports/{}.{}", report_id, format.extension())
}

pub struct FsArtifactStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        FsArtifactStore {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolves a key below the root. Keys that could escape it are refused.
    fn path_for(&self, key: &str) -> Result<PathBuf, String> {
        let relative = Path::new(key);
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !only_normal {
            return Err(format!("invalid artifact key {:?}", key));
        }
        Ok(self.root.join(relative))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn upload(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<(), String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }
        fs::write(&path, bytes).map_err(|e| format!("failed to write {}: {}", path.display(), e))
    }

    fn public_url(&self, key: &str) -> Option<String> {
        if self.public_base_url.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.public_base_url, key))
    }
}

/// Serves stored artifacts read-only.
pub fn configure_routes(root: impl Into<PathBuf>) -> Files {
    Files::new(FILES_PATH, root.into())
}
