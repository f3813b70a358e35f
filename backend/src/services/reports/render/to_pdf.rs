//! Tabular PDF output built with genpdf.

use crate::error::ReportError;
use crate::services::reports::render::RenderContext;
use common::model::template::{Orientation, PageSettings, PageSize};
use common::model::value::FieldValue;
use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::style::{Style, StyledString};
use genpdf::{Document, Element, PaperSize, Size};
use std::path::Path;

/// Approximates an 11px preview font: 11px ≈ 8.25pt.
const FONT_SIZE_PT: u8 = 8;

pub fn render_pdf(fonts_dir: &Path, ctx: &RenderContext<'_>) -> Result<Vec<u8>, ReportError> {
    let mut doc = configure_document(fonts_dir, &ctx.template.name, &ctx.template.page_settings)?;

    let mut title = Paragraph::new("");
    title.push(StyledString::new(ctx.template.name.clone(), Style::new().bold()));
    doc.push(title);
    doc.push(Paragraph::new(format!(
        "Generated {} | {} row(s)",
        ctx.generated_at.format("%Y-%m-%d %H:%M UTC"),
        ctx.rows.len()
    )));
    doc.push(Break::new(1));

    if ctx.fields.is_empty() {
        doc.push(Paragraph::new("No columns to display"));
    } else {
        doc.push(build_table(ctx)?);
    }

    let mut out = Vec::new();
    doc.render(&mut out)
        .map_err(|e| ReportError::Render(format!("PDF rendering failed: {}", e)))?;
    Ok(out)
}

fn build_table(ctx: &RenderContext<'_>) -> Result<TableLayout, ReportError> {
    let mut table = TableLayout::new(vec![1; ctx.fields.len()]);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for field in ctx.fields {
        let mut cell = Paragraph::new("");
        cell.push(StyledString::new(field.label.clone(), Style::new().bold()));
        header.push_element(cell.padded(1));
    }
    header.push().map_err(table_err)?;

    for row in ctx.rows {
        let mut line = table.row();
        for field in ctx.fields {
            let text = row
                .get(&field.field)
                .and_then(FieldValue::to_text)
                .unwrap_or_default();
            line.push_element(Paragraph::new(text).padded(1));
        }
        line.push().map_err(table_err)?;
    }
    Ok(table)
}

fn table_err(e: genpdf::error::Error) -> ReportError {
    ReportError::Render(format!("PDF table layout failed: {}", e))
}

/// Families tried in order; each needs `-Regular`, `-Bold`, `-Italic` and
/// `-BoldItalic` TTF files in the fonts directory.
const FONT_FAMILIES: &[&str] = &["Arial", "LiberationSans", "DejaVuSans"];

fn load_font(
    fonts_dir: &Path,
) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, ReportError> {
    let mut last_error = None;
    for family in FONT_FAMILIES {
        match genpdf::fonts::from_files(fonts_dir, family, None) {
            Ok(fonts) => return Ok(fonts),
            Err(e) => last_error = Some(e),
        }
    }
    Err(ReportError::Render(format!(
        "failed to load fonts from {}: {}",
        fonts_dir.display(),
        last_error.map_or_else(|| "no font family configured".to_string(), |e| e.to_string())
    )))
}

fn configure_document(
    fonts_dir: &Path,
    title: &str,
    settings: &PageSettings,
) -> Result<Document, ReportError> {
    let font_family = load_font(fonts_dir)?;
    let mut doc = Document::new(font_family);
    doc.set_title(title);
    doc.set_font_size(FONT_SIZE_PT);
    doc.set_line_spacing(1.0f64);
    doc.set_paper_size(paper_size(settings));

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(i32::from(settings.margin_mm));
    doc.set_page_decorator(decorator);
    Ok(doc)
}

fn paper_size(settings: &PageSettings) -> Size {
    let size: Size = match settings.size {
        PageSize::A4 => PaperSize::A4.into(),
        PageSize::Letter => PaperSize::Letter.into(),
        PageSize::Legal => PaperSize::Legal.into(),
    };
    match settings.orientation {
        Orientation::Portrait => size,
        Orientation::Landscape => Size::new(size.height, size.width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::standard_template;
    use chrono::Utc;
    use common::model::row::Row;
    use common::responses::FieldLabel;
    use std::collections::BTreeMap;

    #[test]
    fn landscape_swaps_page_dimensions() {
        let portrait = paper_size(&PageSettings::default());
        let landscape = paper_size(&PageSettings {
            orientation: Orientation::Landscape,
            ..PageSettings::default()
        });
        assert_eq!(portrait.width, landscape.height);
        assert_eq!(portrait.height, landscape.width);
    }

    #[test]
    fn missing_fonts_are_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let template = standard_template("t1", "employees");
        let params = BTreeMap::new();
        let ctx = RenderContext {
            template: &template,
            parameters: &params,
            fields: &[],
            rows: &[],
            generated_at: Utc::now(),
        };
        let err = render_pdf(&dir.path().join("no-fonts"), &ctx).unwrap_err();
        assert!(matches!(err, ReportError::Render(ref m) if m.contains("failed to load fonts")));
    }

    #[test]
    fn tables_render_with_header_and_null_cells() {
        let fonts_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("fonts");
        let mut template = standard_template("t1", "employees");
        template.page_settings.orientation = Orientation::Landscape;
        let fields = vec![
            FieldLabel {
                field: "employee_id".into(),
                label: "Employee ID".into(),
            },
            FieldLabel {
                field: "manager".into(),
                label: "Manager".into(),
            },
        ];
        let rows: Vec<Row> = (1..=40)
            .map(|i| {
                let manager = if i % 3 == 0 {
                    FieldValue::Null
                } else {
                    FieldValue::from(format!("M{}", i))
                };
                vec![
                    ("employee_id".to_string(), FieldValue::Integer(i)),
                    ("manager".to_string(), manager),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        let params = BTreeMap::new();
        let ctx = RenderContext {
            template: &template,
            parameters: &params,
            fields: &fields,
            rows: &rows,
            generated_at: Utc::now(),
        };

        let bytes = render_pdf(&fonts_dir, &ctx).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
