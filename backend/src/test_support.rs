//! Shared fixtures for unit and HTTP tests.

use crate::config::ParamBinding;
use crate::db::SqliteDb;
use crate::services::artifacts::{ArtifactStore, FsArtifactStore};
use crate::services::data_sources::save::save_data_source;
use crate::services::reports::binder::BoundQuery;
use crate::services::reports::engine::{Collaborators, EngineSettings, ReportEngine};
use crate::services::reports::executor::QueryBackend;
use crate::services::reports::store::ReportStore;
use crate::services::templates::save::save_template;
use common::model::datasource::{DataSource, FieldDescriptor};
use common::model::field_type::FieldType;
use common::model::report::{GeneratedReport, OutputFormat};
use common::model::row::Row;
use common::model::template::{PageSettings, ReportLayout, ReportTemplate};
use common::model::value::{FieldValue, ParamValue};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const PUBLIC_BASE_URL: &str = "http://localhost:8080/files";

/// A scratch database and storage directory, removed on drop.
pub struct Fixture {
    pub dir: TempDir,
    pub db: SqliteDb,
    pub storage: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDb::new(dir.path().join("reports.sqlite"));
        db.init_schema().unwrap();
        let storage = dir.path().join("storage");
        Fixture { dir, db, storage }
    }

    pub fn exec(&self, sql: &str) {
        self.db.open().unwrap().execute_batch(sql).unwrap();
    }

    /// Creates `employees` if needed and appends `count` rows dated in 2024.
    pub fn seed_employees(&self, count: usize) {
        self.exec(&format!(
            "CREATE TABLE IF NOT EXISTS employees (
                employee_id TEXT, full_name TEXT, email TEXT,
                department TEXT, active INTEGER, created_at TEXT
             );
             WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < {count})
             INSERT INTO employees
             SELECT 'E' || n, 'Employee ' || n, 'employee' || n || '@example.com',
                    CASE WHEN n % 2 = 0 THEN 'HR' ELSE 'Engineering' END,
                    n % 2,
                    '2024-' || printf('%02d', (n % 12) + 1) || '-15'
             FROM seq;"
        ));
    }

    pub fn insert_data_source(&self, data_source: &DataSource) {
        save_data_source(&self.db, data_source).unwrap();
    }

    pub fn insert_template(&self, template: &ReportTemplate) {
        save_template(&self.db, template).unwrap();
    }

    pub fn insert_report(
        &self,
        id: &str,
        template_id: &str,
        parameters: BTreeMap<String, ParamValue>,
        format: OutputFormat,
    ) {
        self.db
            .create(&GeneratedReport::pending(id, template_id, parameters, format))
            .unwrap();
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.dir.path().join("fonts")
    }
}

pub fn employees_source() -> DataSource {
    let field = |name: &str, label: &str, field_type| FieldDescriptor {
        name: name.to_string(),
        label: label.to_string(),
        field_type,
    };
    DataSource {
        code: "employees".to_string(),
        base_table: "employees".to_string(),
        fields: vec![
            field("employee_id", "Employee ID", FieldType::Text),
            field("full_name", "Full Name", FieldType::Text),
            field("email", "Email", FieldType::Text),
            field("department", "Department", FieldType::Text),
            field("active", "Active", FieldType::Boolean),
            field("created_at", "Created At", FieldType::Date),
        ],
        joins: vec![],
    }
}

pub fn standard_template(id: &str, data_source: &str) -> ReportTemplate {
    ReportTemplate {
        id: id.to_string(),
        name: format!("Report {}", id),
        data_source: data_source.to_string(),
        sql_query: None,
        fields: vec![],
        layout: ReportLayout::default(),
        page_settings: PageSettings::default(),
    }
}

pub fn custom_template(id: &str, data_source: &str, sql: &str) -> ReportTemplate {
    ReportTemplate {
        sql_query: Some(sql.to_string()),
        ..standard_template(id, data_source)
    }
}

/// Builds an engine on a fixture's database, with overridable parts.
pub struct EngineBuilder {
    collaborators: Collaborators,
    settings: EngineSettings,
}

impl EngineBuilder {
    pub fn new(fx: &Fixture) -> Self {
        let artifacts = Arc::new(FsArtifactStore::new(fx.storage.clone(), PUBLIC_BASE_URL));
        EngineBuilder {
            collaborators: Collaborators::sqlite(fx.db.clone(), artifacts),
            settings: EngineSettings {
                exec_timeout: Duration::from_secs(5),
                standard_row_limit: 1000,
                param_binding: ParamBinding::Parameterized,
                fonts_dir: fx.fonts_dir(),
            },
        }
    }

    pub fn row_limit(mut self, limit: usize) -> Self {
        self.settings.standard_row_limit = limit;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.exec_timeout = timeout;
        self
    }

    pub fn binding(mut self, binding: ParamBinding) -> Self {
        self.settings.param_binding = binding;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.collaborators.backend = backend;
        self
    }

    pub fn artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.collaborators.artifacts = artifacts;
        self
    }

    pub fn build(self) -> ReportEngine {
        ReportEngine::new(self.collaborators, self.settings)
    }
}

/// Storage that rejects every upload.
pub struct FailingArtifacts;

impl ArtifactStore for FailingArtifacts {
    fn upload(&self, _key: &str, _bytes: &[u8], _content_type: &str) -> Result<(), String> {
        Err("storage unavailable".to_string())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        Some(format!("{}/{}", PUBLIC_BASE_URL, key))
    }
}

/// Answers every query with one row, after a delay.
pub struct SlowBackend(pub Duration);

impl QueryBackend for SlowBackend {
    fn execute(&self, _query: &BoundQuery) -> Result<Vec<Row>, String> {
        std::thread::sleep(self.0);
        Ok(vec![[("employee_id".to_string(), FieldValue::from("E1"))]
            .into_iter()
            .collect()])
    }
}
