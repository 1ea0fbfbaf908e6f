//! Output workbook assembly: values-only sheet writes and the atomic save.

use crate::errors::MergeError;
use crate::model::{CellValue, NormalizedTable};
use crate::sheet_names::fold_case;
use std::path::Path;
use umya_spreadsheet::{Spreadsheet, Worksheet};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATE_TIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Checks that `dest` is an `.xlsx` path inside an existing directory.
pub fn validate_destination(dest: &Path) -> Result<(), MergeError> {
    let is_xlsx = dest
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        return Err(MergeError::write(dest, "destination must end in .xlsx"));
    }
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
        && !parent.is_dir()
    {
        return Err(MergeError::write(
            dest,
            format!("directory {} does not exist", parent.display()),
        ));
    }
    if dest.is_dir() {
        return Err(MergeError::write(dest, "destination is a directory"));
    }
    Ok(())
}

/// A workbook with no sheets; every sheet is added by name.
pub fn new_output_workbook() -> Spreadsheet {
    umya_spreadsheet::new_file_empty_worksheet()
}

pub fn add_sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet, MergeError> {
    let key = fold_case(name);
    if book
        .get_sheet_collection()
        .iter()
        .any(|sheet| fold_case(sheet.get_name()) == key)
    {
        return Err(MergeError::SheetNameConflict(name.to_string()));
    }
    book.new_sheet(name)
        .map_err(|err| MergeError::SheetNameConflict(format!("{name} ({err})")))
}

/// Writes `table` from A1. Row 1 holds the column labels when
/// `include_header` is set. Returns the last row written.
pub fn write_table(sheet: &mut Worksheet, table: &NormalizedTable, include_header: bool) -> u32 {
    let mut row: u32 = 0;
    if include_header {
        row += 1;
        for (idx, label) in table.columns().iter().enumerate() {
            sheet
                .get_cell_mut((idx as u32 + 1, row))
                .set_value_string(label.clone());
        }
    }

    for values in table.rows() {
        row += 1;
        for (idx, value) in values.iter().enumerate() {
            write_cell(sheet, idx as u32 + 1, row, value);
        }
    }
    row
}

fn write_cell(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    match value {
        CellValue::Null => {}
        CellValue::Text(text) => {
            sheet.get_cell_mut((col, row)).set_value_string(text.clone());
        }
        CellValue::Number(number) => {
            sheet.get_cell_mut((col, row)).set_value_number(*number);
        }
        CellValue::Bool(flag) => {
            sheet.get_cell_mut((col, row)).set_value_bool(*flag);
        }
        CellValue::DateTime(dt) => {
            let serial = CellValue::excel_serial(dt);
            sheet.get_cell_mut((col, row)).set_value_number(serial);
            let code = if serial.fract() == 0.0 {
                DATE_FORMAT
            } else {
                DATE_TIME_FORMAT
            };
            sheet
                .get_style_mut((col, row))
                .get_number_format_mut()
                .set_format_code(code);
        }
    }
}

/// Writes `book` next to `dest` and renames it into place, so a failure never
/// leaves a partial file at `dest`.
pub fn save_workbook(book: &Spreadsheet, dest: &Path) -> Result<(), MergeError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().map_err(|err| MergeError::write(dest, err.to_string()))?,
    };

    let staged = tempfile::Builder::new()
        .prefix(".sheet-merge-")
        .suffix(".xlsx")
        .tempfile_in(&dir)
        .map_err(|err| MergeError::write(dest, format!("failed to stage output: {err}")))?;

    umya_spreadsheet::writer::xlsx::write(book, staged.path())
        .map_err(|err| MergeError::write(dest, err.to_string()))?;

    staged
        .persist(dest)
        .map_err(|err| MergeError::write(dest, err.error.to_string()))?;
    tracing::debug!(path = %dest.display(), "output persisted");
    Ok(())
}
