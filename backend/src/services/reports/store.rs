//! Persistence of `GeneratedReport` records and their status transitions.
//!
//! Terminal writes are last-write-wins: two runs for the same report may
//! overlap and whichever finishes last decides the stored outcome. Each
//! terminal write bumps `run_count`, so overlaps can be spotted afterwards.

use crate::db::SqliteDb;
use crate::error::ReportError;
use chrono::{DateTime, Utc};
use common::jobs::ReportStatus;
use common::model::report::{GeneratedReport, OutputFormat};
use rusqlite::{params, OptionalExtension};

pub trait ReportStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<GeneratedReport>, ReportError>;
    fn create(&self, report: &GeneratedReport) -> Result<(), ReportError>;
    fn mark_completed(
        &self,
        id: &str,
        row_count: u64,
        file_url: Option<&str>,
    ) -> Result<(), ReportError>;
    /// Clears `row_count` and `file_url` so a failed rerun never shows a
    /// previous run's results.
    fn mark_failed(&self, id: &str, message: &str) -> Result<(), ReportError>;
}

impl ReportStore for SqliteDb {
    fn get(&self, id: &str) -> Result<Option<GeneratedReport>, ReportError> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, template_id, parameters, format, status, row_count, file_url,
                        error_message, run_count, created_at, updated_at
                 FROM generated_reports WHERE id = ?1",
                params![id],
                |row| {
                    Ok(StoredReport {
                        id: row.get(0)?,
                        template_id: row.get(1)?,
                        parameters: row.get(2)?,
                        format: row.get(3)?,
                        status: row.get(4)?,
                        row_count: row.get(5)?,
                        file_url: row.get(6)?,
                        error_message: row.get(7)?,
                        run_count: row.get(8)?,
                        created_at: row.get(9)?,
                        updated_at: row.get(10)?,
                    })
                },
            )
            .optional()?;
        row.map(StoredReport::into_report).transpose()
    }

    fn create(&self, report: &GeneratedReport) -> Result<(), ReportError> {
        let parameters = serde_json::to_string(&report.parameters)
            .map_err(|e| ReportError::Internal(e.to_string()))?;
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO generated_reports
                (id, template_id, parameters, format, status, row_count, file_url,
                 error_message, run_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &report.id,
                &report.template_id,
                parameters,
                report.format.as_str(),
                report.status.as_str(),
                report.row_count.map(|n| n as i64),
                &report.file_url,
                &report.error_message,
                report.run_count,
                report.created_at.to_rfc3339(),
                report.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn mark_completed(
        &self,
        id: &str,
        row_count: u64,
        file_url: Option<&str>,
    ) -> Result<(), ReportError> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE generated_reports
             SET status = ?1, row_count = ?2, file_url = ?3, error_message = NULL,
                 run_count = run_count + 1, updated_at = ?4
             WHERE id = ?5",
            params![
                ReportStatus::Completed.as_str(),
                row_count as i64,
                file_url,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        expect_one(updated, id)
    }

    fn mark_failed(&self, id: &str, message: &str) -> Result<(), ReportError> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE generated_reports
             SET status = ?1, row_count = NULL, file_url = NULL, error_message = ?2,
                 run_count = run_count + 1, updated_at = ?3
             WHERE id = ?4",
            params![
                ReportStatus::Failed.as_str(),
                message,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;
        expect_one(updated, id)
    }
}

fn expect_one(updated: usize, id: &str) -> Result<(), ReportError> {
    if updated == 0 {
        return Err(ReportError::ReportNotFound(id.to_string()));
    }
    Ok(())
}

struct StoredReport {
    id: String,
    template_id: String,
    parameters: String,
    format: String,
    status: String,
    row_count: Option<i64>,
    file_url: Option<String>,
    error_message: Option<String>,
    run_count: u32,
    created_at: String,
    updated_at: String,
}

impl StoredReport {
    fn into_report(self) -> Result<GeneratedReport, ReportError> {
        let corrupt = |what: &str, value: &str| {
            ReportError::Store(format!("report {} has invalid {}: {:?}", self.id, what, value))
        };
        let parameters = serde_json::from_str(&self.parameters)
            .map_err(|_| corrupt("parameters", &self.parameters))?;
        let format =
            OutputFormat::parse(&self.format).ok_or_else(|| corrupt("format", &self.format))?;
        let status =
            ReportStatus::parse(&self.status).ok_or_else(|| corrupt("status", &self.status))?;
        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| corrupt("created_at", &self.created_at))?;
        let updated_at = parse_timestamp(&self.updated_at)
            .ok_or_else(|| corrupt("updated_at", &self.updated_at))?;

        Ok(GeneratedReport {
            parameters,
            format,
            status,
            row_count: self.row_count.map(|n| n.max(0) as u64),
            created_at,
            updated_at,
            id: self.id,
            template_id: self.template_id,
            file_url: self.file_url,
            error_message: self.error_message,
            run_count: self.run_count,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
