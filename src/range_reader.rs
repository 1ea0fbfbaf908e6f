//! Loads a sheet from a workbook and slices it to a header row plus a
//! row/column window.

use crate::config::RangeSpec;
use crate::errors::{BoxedSource, MergeError};
use crate::model::{CellValue, NormalizedTable, PROVENANCE_COLUMN};
use crate::utils::file_base_name;
use std::collections::HashSet;
use std::io;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// Names of every sheet in `path`, in workbook order.
pub fn list_sheets(path: &Path) -> Result<Vec<String>, MergeError> {
    let file = file_base_name(path);
    let book = open_workbook(path).map_err(|source| MergeError::Open {
        file: file.clone(),
        source,
    })?;
    let names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();
    if names.is_empty() {
        return Err(MergeError::NoSheets { file });
    }
    Ok(names)
}

/// Reads `sheet_name` from `path` and slices it to `range`.
///
/// When `add_provenance` is set a trailing [`PROVENANCE_COLUMN`] holds the
/// file's base name on every row. An empty window yields an empty table.
pub fn read_range(
    path: &Path,
    sheet_name: &str,
    range: &RangeSpec,
    add_provenance: bool,
) -> Result<NormalizedTable, MergeError> {
    let file = file_base_name(path);
    tracing::debug!(file = %file, sheet = sheet_name, "reading range");

    let book =
        open_workbook(path).map_err(|source| MergeError::range_read(&file, sheet_name, source))?;
    let sheet = book.get_sheet_by_name(sheet_name).ok_or_else(|| {
        MergeError::range_read(
            &file,
            sheet_name,
            MergeError::SheetNotFound {
                file: file.clone(),
                sheet: sheet_name.to_string(),
            },
        )
    })?;

    Ok(table_from_sheet(sheet, &file, range, add_provenance))
}

/// Same contract as [`read_range`] without provenance, optionally capped at `limit` rows.
pub fn preview_range(
    path: &Path,
    sheet_name: &str,
    range: &RangeSpec,
    limit: Option<usize>,
) -> Result<NormalizedTable, MergeError> {
    let mut table = read_range(path, sheet_name, range, false)?;
    if let Some(limit) = limit {
        table.truncate_rows(limit);
    }
    Ok(table)
}

pub(crate) fn open_workbook(path: &Path) -> Result<Spreadsheet, BoxedSource> {
    if !path.is_file() {
        return Err(Box::new(io::Error::new(
            io::ErrorKind::NotFound,
            format!("file '{}' does not exist", path.display()),
        )));
    }
    umya_spreadsheet::reader::xlsx::read(path).map_err(|err| Box::new(err) as BoxedSource)
}

/// Zero-based, end-exclusive column window clamped to the sheet's used width.
pub(crate) fn column_window(sheet: &Worksheet, range: &RangeSpec) -> (u32, u32) {
    let (max_col, _) = sheet.get_highest_column_and_row();
    let start = range.start_col.unwrap_or(0);
    let end = range
        .end_col
        .map(|col| col + 1)
        .unwrap_or(max_col)
        .min(max_col);
    (start, end.max(start))
}

pub(crate) fn table_from_sheet(
    sheet: &Worksheet,
    file: &str,
    range: &RangeSpec,
    add_provenance: bool,
) -> NormalizedTable {
    let (_, max_row) = sheet.get_highest_column_and_row();
    let (col_start, col_end) = column_window(sheet, range);

    let reserved: &[&str] = if add_provenance {
        &[PROVENANCE_COLUMN]
    } else {
        &[]
    };
    let mut columns = header_labels(sheet, range.header_row, col_start, col_end, reserved);
    if add_provenance {
        columns.push(PROVENANCE_COLUMN.to_string());
    }

    let mut table = NormalizedTable::new(columns).with_source(file);
    if col_start >= col_end {
        return table;
    }

    let first_row = range.start_row.unwrap_or(range.header_row + 1);
    let last_row = range.end_row.unwrap_or(max_row).min(max_row);
    for row in first_row..=last_row {
        let mut cells: Vec<CellValue> = (col_start..col_end)
            .map(|col| read_cell(sheet, col + 1, row))
            .collect();
        if add_provenance {
            cells.push(CellValue::Text(file.to_string()));
        }
        table.push_row(cells);
    }
    table
}

/// Labels for zero-based columns `start..end` taken from `header_row`.
///
/// Blank header cells become `Column_<n>` (n = one-based sheet column).
/// Repeated labels, and labels equal to a `reserved` name, get `_1`, `_2`, ...
pub(crate) fn header_labels(
    sheet: &Worksheet,
    header_row: u32,
    start: u32,
    end: u32,
    reserved: &[&str],
) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|name| name.to_string()).collect();
    let mut labels = Vec::with_capacity(end.saturating_sub(start) as usize);

    for col in start..end {
        let raw = read_cell(sheet, col + 1, header_row).to_string();
        let trimmed = raw.trim();
        let label = if trimmed.is_empty() {
            format!("Column_{}", col + 1)
        } else {
            trimmed.to_string()
        };
        let label = if taken.contains(&label) {
            unique_label(&label, &taken)
        } else {
            label
        };
        taken.insert(label.clone());
        labels.push(label);
    }
    labels
}

fn unique_label(base: &str, taken: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Typed value of the cell at one-based `(col, row)`; missing cells are null.
pub(crate) fn read_cell(sheet: &Worksheet, col: u32, row: u32) -> CellValue {
    let Some(cell) = sheet.get_cell((col, row)) else {
        return CellValue::Null;
    };
    let raw = cell.get_value();
    if raw.is_empty() {
        return CellValue::Null;
    }

    match cell.get_data_type() {
        "b" => CellValue::Bool(raw.eq_ignore_ascii_case("true") || raw == "1"),
        "s" | "str" | "inlineStr" | "e" => CellValue::Text(raw.to_string()),
        _ => match raw.parse::<f64>() {
            Ok(number) => {
                let is_date = cell
                    .get_style()
                    .get_number_format()
                    .map(|fmt| is_date_format(fmt.get_format_code()))
                    .unwrap_or(false);
                if is_date {
                    CellValue::from_excel_serial(number).unwrap_or(CellValue::Number(number))
                } else {
                    CellValue::Number(number)
                }
            }
            Err(_) => {
                if raw.eq_ignore_ascii_case("true") {
                    CellValue::Bool(true)
                } else if raw.eq_ignore_ascii_case("false") {
                    CellValue::Bool(false)
                } else {
                    CellValue::Text(raw.to_string())
                }
            }
        },
    }
}

/// Whether a number format code renders dates or times.
pub(crate) fn is_date_format(code: &str) -> bool {
    if code.eq_ignore_ascii_case("general") {
        return false;
    }
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for c in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            ';' if !in_quotes && !in_brackets => break,
            _ if in_quotes || in_brackets => {}
            'y' | 'Y' | 'd' | 'D' | 'm' | 'M' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}
