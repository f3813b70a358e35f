//! Serialization of projected, masked rows into an artifact.
//!
//! CSV and JSON are pure functions of their inputs. PDF additionally reads
//! fonts from the configured directory.

mod to_csv;
mod to_json;
mod to_pdf;

use crate::error::ReportError;
use chrono::{DateTime, Utc};
use common::model::report::OutputFormat;
use common::model::row::Row;
use common::model::template::ReportTemplate;
use common::model::value::ParamValue;
use common::responses::FieldLabel;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use self::to_csv::render_csv;
pub use self::to_json::render_json;

/// Everything a renderer may look at.
pub struct RenderContext<'a> {
    pub template: &'a ReportTemplate,
    pub parameters: &'a BTreeMap<String, ParamValue>,
    pub fields: &'a [FieldLabel],
    pub rows: &'a [Row],
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct RenderedArtifact {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

impl RenderedArtifact {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

pub struct Renderer {
    fonts_dir: PathBuf,
}

impl Renderer {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Renderer {
            fonts_dir: fonts_dir.into(),
        }
    }

    pub fn render(
        &self,
        format: OutputFormat,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedArtifact, ReportError> {
        let bytes = match format {
            OutputFormat::Csv => render_csv(ctx.fields, ctx.rows)?.into_bytes(),
            OutputFormat::Json => render_json(ctx)?.into_bytes(),
            OutputFormat::Pdf => to_pdf::render_pdf(&self.fonts_dir, ctx)?,
        };
        Ok(RenderedArtifact { format, bytes })
    }
}
