use crate::errors::MergeError;
use crate::model::SourceDescriptor;
use crate::utils::column_letters_to_index;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

const DEFAULT_CUSTOM_SHEET_NAME: &str = "Sheet1";
const DEFAULT_HEADER_ROW: &str = "1";
const DEFAULT_START_COL: &str = "A";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MergeMode {
    /// Concatenate every source into one sheet.
    #[default]
    Single,
    /// Write one sheet per source.
    Multiple,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    ValueEnum,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SheetNameMode {
    /// Derive from the source file name.
    #[default]
    Auto,
    /// Reuse the source sheet's name.
    Original,
    /// Use caller-supplied names.
    Custom,
}

/// Everything one merge call needs besides its inputs and destination.
///
/// Range bounds stay text here (empty means unbounded) and are validated by
/// [`MergeConfig::range_spec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MergeConfig {
    pub merge_mode: MergeMode,
    pub sheet_name_mode: SheetNameMode,
    pub custom_sheet_name: String,
    pub header_row: String,
    pub start_row: String,
    pub end_row: String,
    pub start_col: String,
    pub end_col: String,
    pub keep_header: bool,
    pub keep_styles: bool,
    pub keep_column_width: bool,
    pub keep_cell_format: bool,
    pub keep_colors: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            merge_mode: MergeMode::Single,
            sheet_name_mode: SheetNameMode::Auto,
            custom_sheet_name: DEFAULT_CUSTOM_SHEET_NAME.to_string(),
            header_row: DEFAULT_HEADER_ROW.to_string(),
            start_row: String::new(),
            end_row: String::new(),
            start_col: DEFAULT_START_COL.to_string(),
            end_col: String::new(),
            keep_header: true,
            keep_styles: true,
            keep_column_width: true,
            keep_cell_format: true,
            keep_colors: true,
        }
    }
}

impl MergeConfig {
    pub fn range_spec(&self) -> Result<RangeSpec, MergeError> {
        RangeSpec::parse(
            &self.header_row,
            &self.start_row,
            &self.end_row,
            &self.start_col,
            &self.end_col,
        )
    }

    /// True when any formatting must be captured from a template.
    pub fn wants_style_template(&self) -> bool {
        self.keep_styles || self.keep_colors || self.keep_cell_format
    }

    pub fn style_flags(&self) -> StyleFlags {
        StyleFlags {
            keep_styles: self.keep_styles,
            keep_colors: self.keep_colors,
            keep_cell_format: self.keep_cell_format,
            keep_column_width: self.keep_column_width,
        }
    }
}

/// Formatting switches consulted by the style pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleFlags {
    /// Font, border, alignment and protection.
    pub keep_styles: bool,
    /// Fill, and font color.
    pub keep_colors: bool,
    /// Number format.
    pub keep_cell_format: bool,
    pub keep_column_width: bool,
}

/// Validated row/column window. Rows are one-based; columns are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub header_row: u32,
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
    pub start_col: Option<u32>,
    /// Inclusive.
    pub end_col: Option<u32>,
}

impl Default for RangeSpec {
    fn default() -> Self {
        Self {
            header_row: 1,
            start_row: None,
            end_row: None,
            start_col: None,
            end_col: None,
        }
    }
}

impl RangeSpec {
    pub fn parse(
        header_row: &str,
        start_row: &str,
        end_row: &str,
        start_col: &str,
        end_col: &str,
    ) -> Result<Self, MergeError> {
        let header_row = parse_row("header row", header_row)?.ok_or_else(|| {
            MergeError::InvalidRange("header row is required".to_string())
        })?;
        let start_row = parse_row("start row", start_row)?;
        let end_row = parse_row("end row", end_row)?;
        let start_col = parse_col(start_col)?;
        let end_col = parse_col(end_col)?;

        if let (Some(start), Some(end)) = (start_row, end_row)
            && start > end
        {
            return Err(MergeError::InvalidRange(format!(
                "start row {start} is after end row {end}"
            )));
        }
        if let (Some(start), Some(end)) = (start_col, end_col)
            && start > end
        {
            return Err(MergeError::InvalidRange(format!(
                "start column {} is after end column {}",
                crate::utils::column_index_to_letters(start),
                crate::utils::column_index_to_letters(end)
            )));
        }

        Ok(Self {
            header_row,
            start_row,
            end_row,
            start_col,
            end_col,
        })
    }

    /// First zero-based column of the window.
    pub fn column_offset(&self) -> u32 {
        self.start_col.unwrap_or(0)
    }
}

fn parse_row(label: &str, raw: &str) -> Result<Option<u32>, MergeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let row: u32 = raw
        .parse()
        .map_err(|_| MergeError::InvalidRange(format!("{label} '{raw}' is not a number")))?;
    if row == 0 || row > crate::utils::MAX_ROW_NUMBER {
        return Err(MergeError::InvalidRange(format!(
            "{label} {row} is outside 1..={}",
            crate::utils::MAX_ROW_NUMBER
        )));
    }
    Ok(Some(row))
}

fn parse_col(raw: &str) -> Result<Option<u32>, MergeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let index = column_letters_to_index(raw)?;
    if index > crate::utils::MAX_COLUMN_INDEX {
        return Err(MergeError::InvalidRange(format!(
            "column '{raw}' is beyond the last worksheet column"
        )));
    }
    Ok(Some(index))
}

/// A saved merge: inputs, destination and settings, loadable from YAML or JSON.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MergeJob {
    pub sources: Vec<SourceDescriptor>,
    pub output: PathBuf,
    #[serde(default)]
    pub merge: PartialMergeConfig,
}

/// Settings as they appear in a job file; unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PartialMergeConfig {
    pub merge_mode: Option<MergeMode>,
    pub sheet_name_mode: Option<SheetNameMode>,
    pub custom_sheet_name: Option<String>,
    pub header_row: Option<String>,
    pub start_row: Option<String>,
    pub end_row: Option<String>,
    pub start_col: Option<String>,
    pub end_col: Option<String>,
    pub keep_header: Option<bool>,
    pub keep_styles: Option<bool>,
    pub keep_column_width: Option<bool>,
    pub keep_cell_format: Option<bool>,
    pub keep_colors: Option<bool>,
}

impl MergeJob {
    /// Loads a job file and resolves relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let mut job: MergeJob = load_config_file(path)?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for source in &mut job.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        if job.output.is_relative() {
            job.output = base.join(&job.output);
        }
        anyhow::ensure!(
            !job.sources.is_empty(),
            "job file {:?} lists no sources",
            path
        );
        Ok(job)
    }
}

/// Merge settings as command-line flags. Every flag is optional so a job file
/// or the defaults can fill the gaps.
#[derive(Args, Debug, Default, Clone)]
pub struct MergeArgs {
    #[arg(long, env = "SHEET_MERGE_MODE", value_enum, help = "single or multiple")]
    pub mode: Option<MergeMode>,

    #[arg(
        long,
        env = "SHEET_MERGE_SHEET_NAMING",
        value_enum,
        help = "How output sheets are named: auto, original or custom"
    )]
    pub sheet_naming: Option<SheetNameMode>,

    #[arg(long, value_name = "NAME", help = "Output sheet name when naming is custom")]
    pub sheet_name: Option<String>,

    #[arg(long, env = "SHEET_MERGE_HEADER_ROW", value_name = "ROW")]
    pub header_row: Option<String>,

    #[arg(long, value_name = "ROW", help = "First data row (1-based; default: header row + 1)")]
    pub start_row: Option<String>,

    #[arg(long, value_name = "ROW", help = "Last data row (1-based, inclusive)")]
    pub end_row: Option<String>,

    #[arg(long, value_name = "COL", help = "First column letter")]
    pub start_col: Option<String>,

    #[arg(long, value_name = "COL", help = "Last column letter (inclusive)")]
    pub end_col: Option<String>,

    #[arg(long, help = "Do not write a header row into output sheets")]
    pub no_header: bool,

    #[arg(long, env = "SHEET_MERGE_NO_STYLES", help = "Disable every formatting option")]
    pub no_styles: bool,

    #[arg(long, help = "Do not copy fonts, borders, alignment or protection")]
    pub no_cell_styles: bool,

    #[arg(long, help = "Do not copy fills or font colors")]
    pub no_colors: bool,

    #[arg(long, help = "Do not copy number formats")]
    pub no_number_format: bool,

    #[arg(long, help = "Do not size columns to their content")]
    pub no_column_width: bool,
}

impl MergeConfig {
    /// Layers CLI flags over a job file's settings over the defaults.
    pub fn from_layers(args: &MergeArgs, file: &PartialMergeConfig) -> Self {
        let defaults = MergeConfig::default();
        let MergeArgs {
            mode,
            sheet_naming,
            sheet_name,
            header_row,
            start_row,
            end_row,
            start_col,
            end_col,
            no_header,
            no_styles,
            no_cell_styles,
            no_colors,
            no_number_format,
            no_column_width,
        } = args.clone();

        let flag = |disabled: bool, file_value: Option<bool>, default: bool| {
            if disabled || no_styles {
                false
            } else {
                file_value.unwrap_or(default)
            }
        };

        Self {
            merge_mode: mode.or(file.merge_mode).unwrap_or(defaults.merge_mode),
            sheet_name_mode: sheet_naming
                .or(file.sheet_name_mode)
                .unwrap_or(defaults.sheet_name_mode),
            custom_sheet_name: sheet_name
                .or_else(|| file.custom_sheet_name.clone())
                .unwrap_or(defaults.custom_sheet_name),
            header_row: header_row
                .or_else(|| file.header_row.clone())
                .unwrap_or(defaults.header_row),
            start_row: start_row
                .or_else(|| file.start_row.clone())
                .unwrap_or(defaults.start_row),
            end_row: end_row
                .or_else(|| file.end_row.clone())
                .unwrap_or(defaults.end_row),
            start_col: start_col
                .or_else(|| file.start_col.clone())
                .unwrap_or(defaults.start_col),
            end_col: end_col
                .or_else(|| file.end_col.clone())
                .unwrap_or(defaults.end_col),
            keep_header: !no_header && file.keep_header.unwrap_or(defaults.keep_header),
            keep_styles: flag(no_cell_styles, file.keep_styles, defaults.keep_styles),
            keep_column_width: flag(
                no_column_width,
                file.keep_column_width,
                defaults.keep_column_width,
            ),
            keep_cell_format: flag(
                no_number_format,
                file.keep_cell_format,
                defaults.keep_cell_format,
            ),
            keep_colors: flag(no_colors, file.keep_colors, defaults.keep_colors),
        }
    }
}

fn load_config_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
