//! # Report Generation Engine
//!
//! Drives one generation run for an existing `GeneratedReport`:
//!
//! 1.  Loads the report record, its template and the template's data source.
//! 2.  Plans the query (custom SQL or standard read) and executes it on a
//!     blocking thread under the configured deadline.
//! 3.  Coerces, projects and masks the rows, then renders the artifact in the
//!     report's format.
//! 4.  Uploads the artifact. An upload failure only costs the file URL.
//! 5.  Records the terminal status.
//!
//! Every failure after the report record is found is written back as
//! `failed` with the error's message before it is returned to the caller.

use crate::config::{AppConfig, ParamBinding};
use crate::db::SqliteDb;
use crate::error::ReportError;
use crate::job_controller::state::RunTracker;
use crate::services::artifacts::{artifact_key, ArtifactStore};
use crate::services::data_sources::registry::DataSourceRegistry;
use crate::services::reports::executor::{coerce_rows, plan_query, Branch, QueryBackend};
use crate::services::reports::filters::FilterRegistry;
use crate::services::reports::masking::PiiPolicy;
use crate::services::reports::projection::project;
use crate::services::reports::render::{RenderContext, RenderedArtifact, Renderer};
use crate::services::reports::store::ReportStore;
use crate::services::templates::TemplateStore;
use chrono::Utc;
use common::model::permission::PermissionContext;
use common::model::report::{GeneratedReport, OutputFormat};
use common::model::row::Row;
use common::responses::{FieldLabel, GenerateReportResponse};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub exec_timeout: Duration,
    pub standard_row_limit: usize,
    pub param_binding: ParamBinding,
    pub fonts_dir: PathBuf,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        EngineSettings {
            exec_timeout: config.exec_timeout,
            standard_row_limit: config.standard_row_limit,
            param_binding: config.param_binding,
            fonts_dir: config.fonts_dir.clone(),
        }
    }
}

/// The stores and backends a run reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub templates: Arc<dyn TemplateStore>,
    pub registry: Arc<dyn DataSourceRegistry>,
    pub reports: Arc<dyn ReportStore>,
    pub backend: Arc<dyn QueryBackend>,
    pub artifacts: Arc<dyn ArtifactStore>,
}

impl Collaborators {
    /// Catalog, report records and query execution all on one SQLite database.
    pub fn sqlite(db: SqliteDb, artifacts: Arc<dyn ArtifactStore>) -> Self {
        let db = Arc::new(db);
        Collaborators {
            templates: db.clone(),
            registry: db.clone(),
            reports: db.clone(),
            backend: db,
            artifacts,
        }
    }
}

/// Result of a completed run, as returned to the caller.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub report_id: String,
    pub format: OutputFormat,
    pub row_count: u64,
    pub file_url: Option<String>,
    pub fields: Vec<FieldLabel>,
    pub rows: Vec<Row>,
    pub masked_values: usize,
}

impl GenerationOutcome {
    pub fn into_response(self) -> GenerateReportResponse {
        GenerateReportResponse {
            success: true,
            report_id: self.report_id,
            row_count: self.row_count,
            file_url: self.file_url,
            data: self.rows,
            field_labels: self.fields,
            format: self.format,
        }
    }
}

struct EngineInner {
    collaborators: Collaborators,
    filters: FilterRegistry,
    masking: PiiPolicy,
    renderer: Renderer,
    settings: EngineSettings,
}

/// Output of the CPU-bound half of a run.
struct Shaped {
    fields: Vec<FieldLabel>,
    rows: Vec<Row>,
    masked_values: usize,
    artifact: RenderedArtifact,
}

#[derive(Clone)]
pub struct ReportEngine {
    inner: Arc<EngineInner>,
    runs: RunTracker,
}

impl ReportEngine {
    pub fn new(collaborators: Collaborators, settings: EngineSettings) -> Self {
        Self::with_policies(
            collaborators,
            settings,
            FilterRegistry::standard(),
            PiiPolicy::default(),
        )
    }

    pub fn with_policies(
        collaborators: Collaborators,
        settings: EngineSettings,
        filters: FilterRegistry,
        masking: PiiPolicy,
    ) -> Self {
        let renderer = Renderer::new(settings.fonts_dir.clone());
        ReportEngine {
            inner: Arc::new(EngineInner {
                collaborators,
                filters,
                masking,
                renderer,
                settings,
            }),
            runs: RunTracker::new(),
        }
    }

    pub fn runs(&self) -> &RunTracker {
        &self.runs
    }

    pub fn reports(&self) -> Arc<dyn ReportStore> {
        Arc::clone(&self.inner.collaborators.reports)
    }

    pub async fn generate(
        &self,
        report_id: &str,
        permissions: &PermissionContext,
    ) -> Result<GenerationOutcome, ReportError> {
        let run = self.runs.begin(report_id);
        let reports = self.reports();
        let lookup = report_id.to_string();
        let report = blocking(move || reports.get(&lookup))
            .await?
            .ok_or_else(|| ReportError::ReportNotFound(report_id.to_string()))?;

        info!(
            "generating report {} (run {}, template {}, format {})",
            report.id,
            run.run_id(),
            report.template_id,
            report.format.as_str()
        );

        if !permissions.accessible_company_ids.is_empty() {
            debug!(
                "report {} requested with company scope {:?}; scope is not enforced here",
                report.id, permissions.accessible_company_ids
            );
        }

        match self.run(&report, permissions).await {
            Ok(outcome) => {
                info!(
                    "report {} completed: {} row(s), {} value(s) masked",
                    outcome.report_id, outcome.row_count, outcome.masked_values
                );
                Ok(outcome)
            }
            Err(err) => {
                error!("report {} failed: {}", report.id, err);
                self.record_failure(&report.id, &err).await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        report: &GeneratedReport,
        permissions: &PermissionContext,
    ) -> Result<GenerationOutcome, ReportError> {
        let inner = Arc::clone(&self.inner);
        let template_id = report.template_id.clone();
        let (template, data_source) = blocking(move || {
            let template = inner
                .collaborators
                .templates
                .template(&template_id)?
                .ok_or(ReportError::TemplateNotFound(template_id))?;
            let data_source = inner.collaborators.registry.resolve(&template.data_source)?;
            Ok((template, data_source))
        })
        .await?;

        let settings = &self.inner.settings;
        let plan = plan_query(
            &template,
            &data_source,
            &report.parameters,
            settings.param_binding,
            settings.standard_row_limit,
            &self.inner.filters,
        )?;
        debug!(
            "report {} {:?} query: {} ({} bound value(s))",
            report.id,
            plan.branch,
            plan.query.sql,
            plan.query.params.len()
        );

        let backend = Arc::clone(&self.inner.collaborators.backend);
        let query = plan.query;
        let execution = tokio::task::spawn_blocking(move || backend.execute(&query));
        let rows = match tokio::time::timeout(settings.exec_timeout, execution).await {
            Err(_) => return Err(ReportError::ExecutionTimeout(settings.exec_timeout)),
            Ok(Err(join)) => {
                return Err(ReportError::Internal(format!("query task failed: {}", join)))
            }
            Ok(Ok(Err(message))) => return Err(ReportError::SqlExecution(message)),
            Ok(Ok(Ok(rows))) => rows,
        };
        if plan.branch == Branch::Standard && rows.len() > settings.standard_row_limit {
            warn!(
                "backend returned {} row(s) for a standard read capped at {}",
                rows.len(),
                settings.standard_row_limit
            );
        }

        let inner = Arc::clone(&self.inner);
        let permissions = permissions.clone();
        let parameters = report.parameters.clone();
        let format = report.format;
        let row_limit = settings.standard_row_limit;
        let branch = plan.branch;
        let shaped = blocking(move || {
            let mut rows = coerce_rows(rows, &data_source);
            if branch == Branch::Standard {
                rows.truncate(row_limit);
            }
            let mut projection = project(&template, &data_source, rows);
            let masked_values =
                inner
                    .masking
                    .apply(&permissions, &projection.fields, &mut projection.rows);
            let ctx = RenderContext {
                template: &template,
                parameters: &parameters,
                fields: &projection.fields,
                rows: &projection.rows,
                generated_at: Utc::now(),
            };
            let artifact = inner.renderer.render(format, &ctx)?;
            Ok(Shaped {
                fields: projection.fields,
                rows: projection.rows,
                masked_values,
                artifact,
            })
        })
        .await?;

        let file_url = self.publish(&report.id, &shaped.artifact).await;
        let row_count = shaped.rows.len() as u64;

        let reports = self.reports();
        let id = report.id.clone();
        let url = file_url.clone();
        blocking(move || reports.mark_completed(&id, row_count, url.as_deref())).await?;

        Ok(GenerationOutcome {
            report_id: report.id.clone(),
            format,
            row_count,
            file_url,
            fields: shaped.fields,
            rows: shaped.rows,
            masked_values: shaped.masked_values,
        })
    }

    /// Uploads the artifact and returns its URL; `None` on any storage failure.
    async fn publish(&self, report_id: &str, artifact: &RenderedArtifact) -> Option<String> {
        let key = artifact_key(report_id, artifact.format);
        let artifacts = Arc::clone(&self.inner.collaborators.artifacts);
        let bytes = artifact.bytes.clone();
        let content_type = artifact.content_type();
        let upload_key = key.clone();
        let uploaded = tokio::task::spawn_blocking(move || {
            artifacts.upload(&upload_key, &bytes, content_type)
        })
        .await;

        match uploaded {
            Ok(Ok(())) => {
                let url = self.inner.collaborators.artifacts.public_url(&key);
                debug!("report {} stored at {} ({:?})", report_id, key, url);
                url
            }
            Ok(Err(message)) => {
                warn!("upload of {} failed, continuing without a file URL: {}", key, message);
                None
            }
            Err(join) => {
                warn!("upload task for {} failed: {}", key, join);
                None
            }
        }
    }

    async fn record_failure(&self, report_id: &str, err: &ReportError) {
        let reports = self.reports();
        let id = report_id.to_string();
        let message = err.to_string();
        if let Err(store_err) = blocking(move || reports.mark_failed(&id, &message)).await {
            error!(
                "could not record failure of report {}: {}",
                report_id, store_err
            );
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, ReportError>
where
    F: FnOnce() -> Result<T, ReportError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ReportError::Internal(format!("blocking task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reports::masking::REDACTION_MARKER;
    use crate::test_support::{
        custom_template, employees_source, standard_template, EngineBuilder, FailingArtifacts,
        Fixture, SlowBackend,
    };
    use common::jobs::ReportStatus;
    use common::model::value::{FieldValue, ParamValue};
    use std::collections::BTreeMap;

    fn year(y: i64) -> BTreeMap<String, ParamValue> {
        BTreeMap::from([("report_year".to_string(), ParamValue::from(y))])
    }

    #[actix_web::test]
    async fn custom_sql_run_masks_pii_and_stores_the_artifact() {
        let fx = Fixture::new();
        fx.seed_employees(3);
        fx.insert_data_source(&employees_source());
        fx.insert_template(&custom_template(
            "t1",
            "employees",
            "SELECT employee_id, email FROM employees \
             WHERE CAST(strftime('%Y', created_at) AS INTEGER) = {{report_year}};",
        ));
        fx.insert_report("r1", "t1", year(2024), OutputFormat::Csv);

        let engine = EngineBuilder::new(&fx).build();
        let outcome = engine
            .generate("r1", &PermissionContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.row_count, 3);
        assert_eq!(outcome.masked_values, 3);
        assert!(outcome
            .rows
            .iter()
            .all(|r| r.get("email") == Some(&FieldValue::from(REDACTION_MARKER))));

        let stored = fx.db.get("r1").unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
        assert_eq!(stored.row_count, Some(3));
        let url = stored.file_url.unwrap();
        assert!(url.ends_with("/reports/r1.csv"), "{}", url);

        let csv = std::fs::read_to_string(fx.storage.join("reports/r1.csv")).unwrap();
        assert!(csv.starts_with("Employee ID,Email\n"), "{}", csv);
    }

    #[actix_web::test]
    async fn standard_run_is_capped() {
        let fx = Fixture::new();
        fx.seed_employees(30);
        fx.insert_data_source(&employees_source());
        fx.insert_template(&standard_template("t1", "employees"));
        fx.insert_report("r1", "t1", BTreeMap::new(), OutputFormat::Json);

        let engine = EngineBuilder::new(&fx).row_limit(25).build();
        let outcome = engine
            .generate("r1", &PermissionContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.row_count, 25);
        assert_eq!(outcome.rows.len(), 25);
    }

    #[actix_web::test]
    async fn unknown_report_is_not_recorded() {
        let fx = Fixture::new();
        let engine = EngineBuilder::new(&fx).build();
        let err = engine
            .generate("ghost", &PermissionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::ReportNotFound(_)));
    }

    #[actix_web::test]
    async fn execution_errors_mark_the_report_failed() {
        let fx = Fixture::new();
        fx.insert_data_source(&employees_source());
        fx.insert_template(&custom_template("t1", "employees", "SELECT * FROM nowhere"));
        fx.insert_report("r1", "t1", BTreeMap::new(), OutputFormat::Csv);

        let engine = EngineBuilder::new(&fx).build();
        let err = engine
            .generate("r1", &PermissionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::SqlExecution(_)));

        let stored = fx.db.get("r1").unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        assert_eq!(stored.error_message, Some(err.to_string()));
        assert!(err.to_string().contains("no such table: nowhere"));
        assert_eq!(stored.row_count, None);
    }

    #[actix_web::test]
    async fn missing_template_marks_the_report_failed() {
        let fx = Fixture::new();
        fx.insert_report("r1", "gone", BTreeMap::new(), OutputFormat::Csv);
        let engine = EngineBuilder::new(&fx).build();
        let err = engine
            .generate("r1", &PermissionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::TemplateNotFound(_)));
        let stored = fx.db.get("r1").unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        assert_eq!(
            stored.error_message.as_deref(),
            Some("Report template not found")
        );
    }

    #[actix_web::test]
    async fn slow_queries_hit_the_deadline() {
        let fx = Fixture::new();
        fx.insert_data_source(&employees_source());
        fx.insert_template(&custom_template("t1", "employees", "SELECT 1 AS employee_id"));
        fx.insert_report("r1", "t1", BTreeMap::new(), OutputFormat::Csv);

        let engine = EngineBuilder::new(&fx)
            .backend(Arc::new(SlowBackend(Duration::from_millis(500))))
            .timeout(Duration::from_millis(50))
            .build();
        let err = engine
            .generate("r1", &PermissionContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::ExecutionTimeout(_)));
        let stored = fx.db.get("r1").unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        assert!(stored
            .error_message
            .unwrap()
            .starts_with("SQL execution failed: execution exceeded"));
    }

    #[actix_web::test]
    async fn upload_failure_still_completes() {
        let fx = Fixture::new();
        fx.seed_employees(2);
        fx.insert_data_source(&employees_source());
        fx.insert_template(&standard_template("t1", "employees"));
        fx.insert_report("r1", "t1", BTreeMap::new(), OutputFormat::Csv);

        let engine = EngineBuilder::new(&fx)
            .artifacts(Arc::new(FailingArtifacts))
            .build();
        let outcome = engine
            .generate("r1", &PermissionContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.file_url, None);
        assert_eq!(outcome.row_count, 2);

        let stored = fx.db.get("r1").unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
        assert_eq!(stored.file_url, None);
        assert_eq!(stored.row_count, Some(2));
    }

    #[actix_web::test]
    async fn runs_are_released_after_completion() {
        let fx = Fixture::new();
        let engine = EngineBuilder::new(&fx).build();
        let _ = engine.generate("ghost", &PermissionContext::default()).await;
        assert_eq!(engine.runs().in_flight("ghost"), 0);
    }
}
