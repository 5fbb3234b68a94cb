use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Per-run facts shown on the ABOUT sheet. Never persisted elsewhere.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    /// When the report was generated
    pub generated_at: DateTime<Local>,
    /// Repository that was reviewed
    pub repo_path: PathBuf,
    /// File name of the spreadsheet
    pub output_file: String,
    /// Estimated tokens in the flattened repository
    pub token_count: usize,
    /// How `token_count` was obtained
    pub token_count_method: String,
    /// Issues asked of the model
    pub issues_requested: u32,
    /// Issues the model returned
    pub issues_returned: usize,
    /// Free-form user instructions, if any
    pub user_instructions: Option<String>,
    /// Model that produced the review
    pub model: String,
}

/// A single spreadsheet cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            CellValue::Number(_) => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Layout and styling of one column.
#[derive(Debug, Clone)]
pub struct Column {
    pub header: &'static str,
    pub width: f64,
    /// Wrap long text inside the cell
    pub wrap: bool,
    /// Color-code the cell by its label (severity/effort)
    pub highlight: bool,
}

impl Column {
    pub fn new(header: &'static str, width: f64) -> Self {
        Self {
            header,
            width,
            wrap: true,
            highlight: false,
        }
    }

    pub fn no_wrap(mut self) -> Self {
        self.wrap = false;
        self
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }
}

/// A worksheet before it is handed to the xlsx writer: a header row built
/// from `columns` followed by `rows`.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
    /// First unfrozen (row, column), if panes are frozen
    pub freeze_panes: Option<(u32, u16)>,
}

impl Sheet {
    /// Header row plus data rows.
    pub fn total_rows(&self) -> usize {
        self.rows.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builders() {
        let column = Column::new("severity", 10.0).highlighted();
        assert!(column.wrap);
        assert!(column.highlight);

        let column = Column::new("copy_paste", 20.0).no_wrap();
        assert!(!column.wrap);
        assert!(!column.highlight);
    }

    #[test]
    fn test_sheet_counts_header_row() {
        let sheet = Sheet {
            name: "Review",
            columns: vec![Column::new("title", 40.0)],
            rows: vec![vec!["a".into()], vec!["b".into()]],
            freeze_panes: None,
        };
        assert_eq!(sheet.total_rows(), 3);
    }

    #[test]
    fn test_cell_value_text() {
        assert_eq!(CellValue::from("High").as_text(), Some("High"));
        assert_eq!(CellValue::Number(3.0).as_text(), None);
    }
}
