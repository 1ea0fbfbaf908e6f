use crate::errors::MergeError;
use std::path::Path;

/// Highest zero-based column index a worksheet can hold (`XFD`).
pub const MAX_COLUMN_INDEX: u32 = 16_383;

/// Highest one-based row number a worksheet can hold.
pub const MAX_ROW_NUMBER: u32 = 1_048_576;

/// Converts column letters (`"A"`, `"ab"`) to a zero-based column index.
///
/// Letters form a bijective base-26 numeral (`A=1 .. Z=26, AA=27`), so the
/// returned index is that value minus one.
pub fn column_letters_to_index(letters: &str) -> Result<u32, MergeError> {
    let letters = letters.trim();
    if letters.is_empty() {
        return Err(MergeError::InvalidRange(
            "column letters must not be empty".to_string(),
        ));
    }

    let mut value: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(MergeError::InvalidRange(format!(
                "invalid column letters '{letters}'"
            )));
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| {
                MergeError::InvalidRange(format!("column letters '{letters}' are out of range"))
            })?;
    }
    Ok(value - 1)
}

/// Inverse of [`column_letters_to_index`].
pub fn column_index_to_letters(index: u32) -> String {
    column_number_to_name(index + 1)
}

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

/// A1-style address for a one-based column and row.
pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

/// One-based rectangular block of cells, e.g. a merged region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl CellSpan {
    /// Parses `"B1:D1"` or a single `"C3"` reference. `$` anchors are ignored.
    pub fn parse(reference: &str) -> Option<Self> {
        let cleaned = reference.trim().replace('$', "");
        let (start, end) = match cleaned.split_once(':') {
            Some((start, end)) => (start.to_string(), end.to_string()),
            None => (cleaned.clone(), cleaned.clone()),
        };
        let (start_col, start_row) = parse_cell_ref(&start)?;
        let (end_col, end_row) = parse_cell_ref(&end)?;
        Some(Self {
            start_col: start_col.min(end_col),
            start_row: start_row.min(end_row),
            end_col: start_col.max(end_col),
            end_row: start_row.max(end_row),
        })
    }

    pub fn to_reference(&self) -> String {
        let start = cell_address(self.start_col, self.start_row);
        let end = cell_address(self.end_col, self.end_row);
        if start == end {
            start
        } else {
            format!("{start}:{end}")
        }
    }
}

/// Splits `"AB12"` into a one-based `(column, row)` pair.
fn parse_cell_ref(s: &str) -> Option<(u32, u32)> {
    let split_idx = s.find(|c: char| c.is_ascii_digit())?;
    let (col_str, row_str) = s.split_at(split_idx);
    let row = row_str.parse::<u32>().ok().filter(|row| *row > 0)?;
    let col = column_letters_to_index(col_str).ok()? + 1;
    Some((col, row))
}

/// File name including its extension, used to label rows and diagnostics.
pub fn file_base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// File name without its extension.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| file_base_name(path))
}
