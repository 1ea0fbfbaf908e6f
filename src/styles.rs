//! Per-column style templates: captured from a template sheet's header row and
//! first data row, then painted column-wise onto freshly written output sheets.

use crate::config::{RangeSpec, StyleFlags};
use crate::errors::MergeError;
use crate::model::NormalizedTable;
use crate::range_reader::{column_window, header_labels, open_workbook};
use crate::utils::{CellSpan, MAX_COLUMN_INDEX, MAX_ROW_NUMBER, cell_address, file_base_name};
use std::collections::BTreeMap;
use std::path::Path;
use umya_spreadsheet::{
    Alignment, Borders, Color, Fill, Font, Protection, Spreadsheet, Style, Worksheet,
};

/// The formatting parts of one template cell.
#[derive(Debug, Clone, Default)]
pub struct CapturedStyle {
    pub font: Option<Font>,
    pub fill: Option<Fill>,
    pub borders: Option<Borders>,
    pub alignment: Option<Alignment>,
    pub number_format: Option<String>,
    pub protection: Option<Protection>,
}

impl CapturedStyle {
    pub fn from_style(style: &Style) -> Self {
        Self {
            font: style.get_font().cloned(),
            fill: style.get_fill().cloned(),
            borders: style.get_borders().cloned(),
            alignment: style.get_alignment().cloned(),
            number_format: style.get_number_format().and_then(|fmt| {
                let code = fmt.get_format_code();
                if code.eq_ignore_ascii_case("general") {
                    None
                } else {
                    Some(code.to_string())
                }
            }),
            protection: style.get_protection().cloned(),
        }
    }

    fn from_cell(sheet: &Worksheet, col: u32, row: u32) -> Self {
        sheet
            .get_cell((col, row))
            .map(|cell| Self::from_style(cell.get_style()))
            .unwrap_or_default()
    }
}

/// A header-row merge from the template, remembered by the labels it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMerge {
    pub span: CellSpan,
    pub labels: Vec<String>,
}

/// Column styles keyed by one-based output column.
#[derive(Debug, Clone, Default)]
pub struct StyleTemplate {
    pub header_styles: BTreeMap<u32, CapturedStyle>,
    pub data_styles: BTreeMap<u32, CapturedStyle>,
    /// Every merged range on the template sheet, as found.
    pub merged_ranges: Vec<CellSpan>,
    /// The subset of `merged_ranges` that lies in the header row of the window.
    pub header_merges: Vec<HeaderMerge>,
}

impl StyleTemplate {
    pub fn is_empty(&self) -> bool {
        self.header_styles.is_empty() && self.data_styles.is_empty()
    }
}

/// Opens `path` and captures its template for `sheet_name`.
pub fn capture_from_file(
    path: &Path,
    sheet_name: &str,
    range: &RangeSpec,
) -> Result<StyleTemplate, MergeError> {
    let file = file_base_name(path);
    let book = open_workbook(path).map_err(|err| MergeError::StyleCapture {
        file: file.clone(),
        message: err.to_string(),
    })?;
    capture(&book, &file, sheet_name, range)
}

/// Captures the header-row and first-data-row styles of every column in the
/// window. Template column `start_col + k` lands on output column `k + 1`.
pub fn capture(
    book: &Spreadsheet,
    file: &str,
    sheet_name: &str,
    range: &RangeSpec,
) -> Result<StyleTemplate, MergeError> {
    let sheet = book
        .get_sheet_by_name(sheet_name)
        .ok_or_else(|| MergeError::StyleCapture {
            file: file.to_string(),
            message: format!("sheet '{sheet_name}' not found"),
        })?;

    let (_, max_row) = sheet.get_highest_column_and_row();
    let (start, end) = column_window(sheet, range);
    let header_row = range.header_row;
    let data_row = header_row + 1;

    let mut template = StyleTemplate::default();
    for col in (start + 1)..=end {
        let key = col - start;
        template
            .header_styles
            .insert(key, CapturedStyle::from_cell(sheet, col, header_row));
        if data_row <= max_row {
            template
                .data_styles
                .insert(key, CapturedStyle::from_cell(sheet, col, data_row));
        }
    }

    template.merged_ranges = sheet
        .get_merge_cells()
        .iter()
        .filter_map(|merged| CellSpan::parse(&merged.get_range()))
        .collect();

    let labels = header_labels(sheet, header_row, start, end, &[]);
    template.header_merges = template
        .merged_ranges
        .iter()
        .filter(|span| span.start_row == header_row && span.end_row == header_row)
        .filter(|span| span.start_col > start && span.end_col <= end)
        .map(|span| HeaderMerge {
            span: *span,
            labels: (span.start_col..=span.end_col)
                .map(|col| labels[(col - start - 1) as usize].clone())
                .collect(),
        })
        .collect();

    tracing::debug!(
        file,
        sheet = sheet_name,
        columns = template.header_styles.len(),
        merges = template.header_merges.len(),
        "captured style template"
    );
    Ok(template)
}

/// Paints `template` onto `sheet`, which holds `columns` starting at column A.
///
/// With a header row, row 1 gets header styles and rows 2.. get data styles;
/// otherwise data styles start at row 1. Cells that cannot be styled are
/// skipped and reported.
pub fn apply(
    sheet: &mut Worksheet,
    template: &StyleTemplate,
    columns: &[String],
    flags: StyleFlags,
    header_written: bool,
) -> Vec<MergeError> {
    let sheet_name = sheet.get_name().to_string();
    let mut issues = Vec::new();

    if header_written {
        for merge in &template.header_merges {
            match remap_header_merge(merge, columns) {
                Some(span) => {
                    sheet.add_merge_cells(span.to_reference());
                }
                None => issues.push(MergeError::StyleApply {
                    sheet: sheet_name.clone(),
                    cell: merge.span.to_reference(),
                    message: "merged header no longer maps onto adjacent output columns"
                        .to_string(),
                }),
            }
        }
    }

    let width = columns.len() as u32;
    let (_, last_row) = sheet.get_highest_column_and_row();
    let first_data_row = if header_written {
        for (col, style) in template.header_styles.range(..=width) {
            paint_cell(sheet, &sheet_name, *col, 1, style, flags, &mut issues);
        }
        2
    } else {
        1
    };

    for row in first_data_row..=last_row {
        for (col, style) in template.data_styles.range(..=width) {
            paint_cell(sheet, &sheet_name, *col, row, style, flags, &mut issues);
        }
    }

    if !issues.is_empty() {
        tracing::warn!(
            sheet = %sheet_name,
            skipped = issues.len(),
            "some cells could not be styled"
        );
    }
    issues
}

fn paint_cell(
    sheet: &mut Worksheet,
    sheet_name: &str,
    col: u32,
    row: u32,
    captured: &CapturedStyle,
    flags: StyleFlags,
    issues: &mut Vec<MergeError>,
) {
    if let Err(message) = check_cell(col, row, captured, flags) {
        tracing::warn!(sheet = sheet_name, cell = %cell_address(col, row), %message, "skipping cell style");
        issues.push(MergeError::StyleApply {
            sheet: sheet_name.to_string(),
            cell: cell_address(col, row),
            message,
        });
        return;
    }
    apply_cell_style(sheet.get_style_mut((col, row)), captured, flags);
}

fn check_cell(col: u32, row: u32, captured: &CapturedStyle, flags: StyleFlags) -> Result<(), String> {
    if col == 0 || col > MAX_COLUMN_INDEX + 1 || row == 0 || row > MAX_ROW_NUMBER {
        return Err(format!("cell ({col}, {row}) is outside the worksheet"));
    }
    if flags.keep_cell_format
        && let Some(code) = &captured.number_format
        && code.matches('"').count() % 2 != 0
    {
        return Err(format!("number format '{code}' has an unterminated literal"));
    }
    Ok(())
}

/// Copies the parts of `captured` that `flags` allow onto `style`.
///
/// `keep_styles` covers font, border, alignment and protection; `keep_colors`
/// covers fill and the font color; `keep_cell_format` covers the number format.
pub fn apply_cell_style(style: &mut Style, captured: &CapturedStyle, flags: StyleFlags) {
    if flags.keep_styles {
        if let Some(font) = &captured.font {
            let mut font = font.clone();
            if !flags.keep_colors {
                *font.get_color_mut() = Color::default();
            }
            style.set_font(font);
        }
        if let Some(borders) = &captured.borders {
            style.set_borders(borders.clone());
        }
        if let Some(alignment) = &captured.alignment {
            style.set_alignment(alignment.clone());
        }
        if let Some(protection) = &captured.protection {
            style.set_protection(protection.clone());
        }
    } else if flags.keep_colors
        && let Some(font) = &captured.font
        && !font.get_color().get_argb().is_empty()
    {
        *style.get_font_mut().get_color_mut() = font.get_color().clone();
    }

    if flags.keep_colors
        && let Some(fill) = &captured.fill
    {
        style.set_fill(fill.clone());
    }

    if flags.keep_cell_format
        && let Some(code) = &captured.number_format
    {
        style.get_number_format_mut().set_format_code(code.clone());
    }
}

/// Output position of a template header merge, if its labels are still adjacent
/// and in order.
fn remap_header_merge(merge: &HeaderMerge, columns: &[String]) -> Option<CellSpan> {
    let positions: Vec<u32> = merge
        .labels
        .iter()
        .map(|label| {
            columns
                .iter()
                .position(|column| column == label)
                .map(|idx| idx as u32 + 1)
        })
        .collect::<Option<_>>()?;
    let first = *positions.first()?;
    let contiguous = positions
        .iter()
        .enumerate()
        .all(|(offset, col)| *col == first + offset as u32);
    if !contiguous {
        return None;
    }
    Some(CellSpan {
        start_col: first,
        start_row: 1,
        end_col: first + positions.len() as u32 - 1,
        end_row: 1,
    })
}

/// Sets each column's width to its longest displayed text plus two.
///
/// Widths come from `table` rather than the stored cells, so dates count as
/// the text they are shown as and not as their serial number. Columns without
/// any text keep the default width.
pub fn autosize_columns(sheet: &mut Worksheet, table: &NormalizedTable, header_written: bool) {
    for (idx, label) in table.columns().iter().enumerate() {
        let header_len = if header_written {
            label.chars().count()
        } else {
            0
        };
        let longest = table
            .rows()
            .iter()
            .filter_map(|row| row.get(idx))
            .map(|value| value.to_string().chars().count())
            .fold(header_len, usize::max);
        if longest == 0 {
            continue;
        }

        let col = idx as u32 + 1;
        let dimension = sheet.get_column_dimension_by_number_mut(&col);
        dimension.set_width((longest + 2) as f64);
        dimension.set_best_fit(false);
        dimension.set_auto_width(false);
    }
}
