use anyhow::Result;
use serde_json::{Value, json};
use std::path::PathBuf;

use crate::config::RangeSpec;
use crate::range_reader;
use crate::utils::file_base_name;

pub fn list_sheets(file: PathBuf) -> Result<Value> {
    let sheets = range_reader::list_sheets(&file)?;
    Ok(json!({
        "file": file_base_name(&file),
        "sheets": sheets,
    }))
}

pub fn preview(file: PathBuf, sheet: String, range: RangeSpec, limit: Option<usize>) -> Result<Value> {
    let table = range_reader::preview_range(&file, &sheet, &range, limit)?;
    Ok(serde_json::to_value(table)?)
}
