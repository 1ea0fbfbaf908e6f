use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Label of the column appended in single-sheet mode to record each row's source file.
pub const PROVENANCE_COLUMN: &str = "Data Source";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Bool(bool),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Interprets a 1900-system serial number as a timestamp.
    pub fn from_excel_serial(serial: f64) -> Option<Self> {
        let millis = (serial * 86_400_000.0).round();
        if !millis.is_finite() || millis < 0.0 {
            return None;
        }
        excel_epoch()
            .checked_add_signed(Duration::milliseconds(millis as i64))
            .map(CellValue::DateTime)
    }

    pub fn excel_serial(value: &NaiveDateTime) -> f64 {
        (*value - excel_epoch()).num_milliseconds() as f64 / 86_400_000.0
    }
}

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::DateTime(dt) if dt.num_seconds_from_midnight() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
            CellValue::Null => Ok(()),
        }
    }
}

/// A rectangular table with named columns.
///
/// Every row holds exactly one value per column; absent cells are
/// [`CellValue::Null`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedTable {
    source: Option<String>,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl NormalizedTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            source: None,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Appends a row, padding with nulls or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(col))
    }

    /// Values of one column in row order.
    pub fn column_values(&self, column: &str) -> Vec<&CellValue> {
        match self.column_index(column) {
            Some(col) => self.rows.iter().map(|row| &row[col]).collect(),
            None => Vec::new(),
        }
    }

    /// Rebuilds the table with `order` as its column list. Unknown names become null columns.
    pub fn select_columns(&self, order: &[String]) -> NormalizedTable {
        let mapping: Vec<Option<usize>> =
            order.iter().map(|name| self.column_index(name)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(CellValue::Null))
                    .collect()
            })
            .collect();
        NormalizedTable {
            source: self.source.clone(),
            columns: order.to_vec(),
            rows,
        }
    }

    /// Moves `name` to the last position, if present.
    pub fn move_column_last(&mut self, name: &str) {
        let Some(idx) = self.column_index(name) else {
            return;
        };
        if idx + 1 == self.columns.len() {
            return;
        }
        let column = self.columns.remove(idx);
        self.columns.push(column);
        for row in &mut self.rows {
            let value = row.remove(idx);
            row.push(value);
        }
    }

    /// Appends rows of `other`, aligning by column name.
    pub fn extend_from(&mut self, other: &NormalizedTable) {
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|name| other.column_index(name))
            .collect();
        for row in &other.rows {
            self.rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(CellValue::Null))
                    .collect(),
            );
        }
    }

    pub fn truncate_rows(&mut self, limit: usize) {
        self.rows.truncate(limit);
    }
}

/// One selected input: a workbook, the sheet to read, and an optional output sheet name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceDescriptor {
    pub path: PathBuf,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl SourceDescriptor {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: Some(sheet.into()),
            custom_name: None,
        }
    }

    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
}

/// Outcome of one merge call, as handed to interactive or scheduled callers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sheets: Vec<SheetSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub style_issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<NormalizedTable>,
}

impl MergeResult {
    pub fn failure(error: &crate::errors::MergeError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            error_code: Some(error.code().to_string()),
            ..Default::default()
        }
    }
}
