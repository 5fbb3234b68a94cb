pub mod types;

pub use types::{CellValue, Column, RunMetadata, Sheet};

use crate::flatten::HEURISTIC_METHOD;
use crate::review::{CodeReviewResponse, CodebaseIssue};
use chrono::{DateTime, Local};
use colored::Colorize;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

pub const REVIEW_SHEET: &str = "Review";
pub const ABOUT_SHEET: &str = "ABOUT";

const HEURISTIC_NOTE: &str =
    "Token count is an approximation based on XML size (\u{2248} 1 token per 4 chars).";
const TIKTOKEN_NOTE: &str =
    "Token count computed with tiktoken (o200k_base, falling back to cl100k_base).";

fn token_note(method: &str) -> &'static str {
    if method == HEURISTIC_METHOD {
        HEURISTIC_NOTE
    } else {
        TIKTOKEN_NOTE
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to prepare output directory: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to write Excel file: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Fill color (RGB) for a severity or effort label. Exact match only.
pub fn fill_for(label: &str) -> Option<u32> {
    match label.trim() {
        "Low" => Some(0xC6EFCE),
        "Medium" => Some(0xFFEB9C),
        "High" => Some(0xF8CBAD),
        "Critical" | "Very High" => Some(0xFFC7CE),
        _ => None,
    }
}

/// Timestamped spreadsheet name, e.g. `code_review_03-14-2025_09-05.xlsx`.
pub fn output_file_name(prefix: &str, now: &DateTime<Local>) -> String {
    format!("{prefix}_{}.xlsx", now.format("%m-%d-%Y_%H-%M"))
}

/// Markdown summary of an issue, ready to paste into a tracker.
pub fn copy_paste_markdown(issue: &CodebaseIssue) -> String {
    format!(
        "### [{}] {}\n- Severity: {}\n- Location: {}\n- Effort: {}\n- Rationale: {}\n- Implementation plan: {}\n\n{}",
        issue.category,
        issue.title,
        issue.severity,
        issue.location,
        issue.estimated_effort,
        issue.rationale,
        issue.implementation_plan,
        issue.detailed_description,
    )
}

/// Flatten the model response into the Review sheet, one row per issue.
pub fn review_sheet(response: &CodeReviewResponse) -> Sheet {
    let columns = vec![
        Column::new("category", 15.0),
        Column::new("title", 40.0),
        Column::new("severity", 10.0).highlighted(),
        Column::new("location", 25.0),
        Column::new("estimated_effort", 15.0).highlighted(),
        Column::new("rationale", 40.0),
        Column::new("detailed_description", 60.0),
        Column::new("implementation_plan", 60.0),
        Column::new("copy_paste", 20.0).no_wrap(),
    ];

    let rows = response
        .issues
        .iter()
        .map(|issue| {
            vec![
                issue.category.as_str().into(),
                issue.title.as_str().into(),
                issue.severity.as_str().into(),
                issue.location.as_str().into(),
                issue.estimated_effort.as_str().into(),
                issue.rationale.as_str().into(),
                issue.detailed_description.as_str().into(),
                issue.implementation_plan.as_str().into(),
                copy_paste_markdown(issue).into(),
            ]
        })
        .collect();

    Sheet {
        name: REVIEW_SHEET,
        columns,
        rows,
        // header row and the category/title columns
        freeze_panes: Some((1, 2)),
    }
}

/// Build the ABOUT sheet from run metadata.
pub fn about_sheet(metadata: &RunMetadata) -> Sheet {
    let field = |name: &str, value: CellValue| vec![CellValue::from(name), value];

    let rows = vec![
        field(
            "Generated At",
            metadata
                .generated_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .into(),
        ),
        field(
            "Repository Path",
            metadata.repo_path.display().to_string().into(),
        ),
        field("Output File", metadata.output_file.as_str().into()),
        field(
            "Token Count",
            CellValue::Number(metadata.token_count as f64),
        ),
        field(
            "Token Count Method",
            metadata.token_count_method.as_str().into(),
        ),
        field(
            "Issues Requested",
            CellValue::Number(f64::from(metadata.issues_requested)),
        ),
        field(
            "Issues Returned",
            CellValue::Number(metadata.issues_returned as f64),
        ),
        field(
            "User Instructions",
            metadata
                .user_instructions
                .clone()
                .unwrap_or_default()
                .into(),
        ),
        field("Model", metadata.model.as_str().into()),
        field("Notes", token_note(&metadata.token_count_method).into()),
    ];

    Sheet {
        name: ABOUT_SHEET,
        columns: vec![Column::new("Field", 24.0), Column::new("Value", 90.0)],
        rows,
        freeze_panes: None,
    }
}

/// Assemble the two-sheet workbook (Review + ABOUT).
pub fn build_workbook(
    response: &CodeReviewResponse,
    metadata: &RunMetadata,
) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    render_sheet(&mut workbook, &review_sheet(response))?;
    render_sheet(&mut workbook, &about_sheet(metadata))?;
    Ok(workbook)
}

/// Write the workbook to `path`, creating its parent directory if needed.
#[instrument(skip(response, metadata), fields(path = %path.display(), issues = response.issues.len()))]
pub fn write_workbook(
    path: &Path,
    response: &CodeReviewResponse,
    metadata: &RunMetadata,
) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut workbook = build_workbook(response, metadata)?;
    workbook.save(path)?;
    debug!("workbook saved");
    Ok(())
}

fn column_format(column: &Column) -> Format {
    let format = Format::new().set_align(FormatAlign::Top);
    if column.wrap {
        format.set_text_wrap()
    } else {
        format
    }
}

/// Column format plus the palette fill for highlighted label cells.
fn cell_format(column: &Column, value: &CellValue) -> Format {
    let format = column_format(column);
    if !column.highlight {
        return format;
    }
    match value.as_text().and_then(fill_for) {
        Some(rgb) => format.set_background_color(Color::RGB(rgb)),
        None => format,
    }
}

fn render_sheet(workbook: &mut Workbook, sheet: &Sheet) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet.name)?;

    for (col, column) in sheet.columns.iter().enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, column.width)?;
        worksheet.write_string_with_format(0, col, column.header, &column_format(column).set_bold())?;
    }

    for (index, row) in sheet.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, (value, column)) in row.iter().zip(&sheet.columns).enumerate() {
            let col = col as u16;
            let format = cell_format(column, value);
            match value {
                CellValue::Text(text) => {
                    worksheet.write_string_with_format(row_num, col, text, &format)?;
                }
                CellValue::Number(number) => {
                    worksheet.write_number_with_format(row_num, col, *number, &format)?;
                }
            }
        }
    }

    if let Some((row, col)) = sheet.freeze_panes {
        worksheet.set_freeze_panes(row, col)?;
    }
    Ok(())
}

/// Print a short colored summary of the issues to stderr.
/// Stdout is reserved for the JSON dump.
pub fn print_summary(response: &CodeReviewResponse, output_path: &Path) {
    eprintln!();
    eprintln!("═══ Code Review: {} issues ═══", response.issues.len());
    for issue in &response.issues {
        eprintln!(
            "  • [{}] [{}] {} ({}) effort: {}",
            colorize_label(&issue.severity),
            issue.category,
            issue.title,
            issue.location,
            colorize_label(&issue.estimated_effort),
        );
    }
    eprintln!();
    eprintln!("Report written to {}", output_path.display().to_string().bold());
    eprintln!();
}

/// Helper to colorize a severity/effort label for terminal output.
fn colorize_label(label: &str) -> colored::ColoredString {
    match label.trim() {
        "Critical" | "Very High" => label.red().bold(),
        "High" => label.red(),
        "Medium" => label.yellow(),
        "Low" => label.green(),
        _ => label.normal(),
    }
}

/// Pretty JSON of the response, echoed to stdout at the end of a run.
pub fn render_json(response: &CodeReviewResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(response)
}
