#![allow(dead_code)]
use umya_spreadsheet::{NumberingFormat, PatternValues, Worksheet};

#[derive(Clone, Debug)]
pub enum CellVal {
    Text(String),
    Num(f64),
    Date(f64),
    Bool(bool),
    Empty,
}

impl From<&str> for CellVal {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellVal::Empty
        } else {
            CellVal::Text(s.to_string())
        }
    }
}

impl From<String> for CellVal {
    fn from(s: String) -> Self {
        CellVal::from(s.as_str())
    }
}

impl From<f64> for CellVal {
    fn from(n: f64) -> Self {
        CellVal::Num(n)
    }
}

impl From<i32> for CellVal {
    fn from(n: i32) -> Self {
        CellVal::Num(n as f64)
    }
}

impl From<bool> for CellVal {
    fn from(b: bool) -> Self {
        CellVal::Bool(b)
    }
}

fn col_index(col_letter: &str) -> u32 {
    let mut result = 0u32;
    for c in col_letter.chars() {
        result = result * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    result
}

pub fn parse_cell_ref(cell_ref: &str) -> (u32, u32) {
    let mut col_part = String::new();
    let mut row_part = String::new();
    for c in cell_ref.chars() {
        if c.is_ascii_alphabetic() {
            col_part.push(c);
        } else {
            row_part.push(c);
        }
    }
    let col = col_index(&col_part);
    let row: u32 = row_part.parse().unwrap_or(1);
    (col, row)
}

fn set_cell(sheet: &mut Worksheet, col: u32, row: u32, val: &CellVal) {
    match val {
        CellVal::Text(s) => {
            sheet.get_cell_mut((col, row)).set_value_string(s.clone());
        }
        CellVal::Num(n) => {
            sheet.get_cell_mut((col, row)).set_value_number(*n);
        }
        CellVal::Date(serial) => {
            sheet.get_cell_mut((col, row)).set_value_number(*serial);
            sheet
                .get_style_mut((col, row))
                .get_number_format_mut()
                .set_format_code(NumberingFormat::FORMAT_DATE_YYYYMMDD2);
        }
        CellVal::Bool(b) => {
            sheet.get_cell_mut((col, row)).set_value_bool(*b);
        }
        CellVal::Empty => {}
    }
}

/// Writes `headers` at `start` and `rows` below it. Header cells are bold.
pub fn fill_table<H, R, V>(sheet: &mut Worksheet, start: &str, headers: &[H], rows: &[R])
where
    H: AsRef<str>,
    R: AsRef<[V]>,
    V: Into<CellVal> + Clone,
{
    let (start_col, start_row) = parse_cell_ref(start);

    for (i, header) in headers.iter().enumerate() {
        let col = start_col + i as u32;
        if !header.as_ref().is_empty() {
            sheet
                .get_cell_mut((col, start_row))
                .set_value_string(header.as_ref().to_string());
        }
        let style = sheet.get_style_mut((col, start_row));
        style.get_font_mut().set_bold(true);
    }

    for (row_idx, row_data) in rows.iter().enumerate() {
        let row = start_row + 1 + row_idx as u32;
        for (col_idx, val) in row_data.as_ref().iter().enumerate() {
            let col = start_col + col_idx as u32;
            let cell_val: CellVal = val.clone().into();
            set_cell(sheet, col, row, &cell_val);
        }
    }
}

/// Fills a `rows` x `cols` block from A1 with `"r{row}c{col}"` text.
pub fn fill_grid(sheet: &mut Worksheet, rows: u32, cols: u32) {
    for row in 1..=rows {
        for col in 1..=cols {
            sheet
                .get_cell_mut((col, row))
                .set_value_string(format!("r{row}c{col}"));
        }
    }
}

pub fn fill_sparse(sheet: &mut Worksheet, cells: &[(&str, CellVal)]) {
    for (cell_ref, val) in cells {
        let (col, row) = parse_cell_ref(cell_ref);
        set_cell(sheet, col, row, val);
    }
}

pub fn set_solid_fill(sheet: &mut Worksheet, range: &str, argb: &str) {
    for (col, row) in cells_in(range) {
        sheet
            .get_style_mut((col, row))
            .get_fill_mut()
            .get_pattern_fill_mut()
            .set_pattern_type(PatternValues::Solid)
            .get_foreground_color_mut()
            .set_argb(argb);
    }
}

pub fn set_bottom_border(sheet: &mut Worksheet, range: &str, border_style: &str) {
    for (col, row) in cells_in(range) {
        sheet
            .get_style_mut((col, row))
            .get_borders_mut()
            .get_bottom_border_mut()
            .set_border_style(border_style);
    }
}

pub fn apply_number_format(sheet: &mut Worksheet, range: &str, code: &str) {
    for (col, row) in cells_in(range) {
        sheet
            .get_style_mut((col, row))
            .get_number_format_mut()
            .set_format_code(code);
    }
}

fn cells_in(range: &str) -> Vec<(u32, u32)> {
    let parts: Vec<&str> = range.split(':').collect();
    let (start_col, start_row) = parse_cell_ref(parts[0]);
    let (end_col, end_row) = if parts.len() > 1 {
        parse_cell_ref(parts[1])
    } else {
        (start_col, start_row)
    };

    let mut cells = Vec::new();
    for row in start_row..=end_row {
        for col in start_col..=end_col {
            cells.push((col, row));
        }
    }
    cells
}
