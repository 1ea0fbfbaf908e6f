//! The merge pipeline: collect ranges, reconcile or split them into output
//! sheets, then write and style the destination workbook.

use crate::config::{MergeConfig, MergeMode, RangeSpec, SheetNameMode};
use crate::errors::MergeError;
use crate::model::{MergeResult, NormalizedTable, SheetSummary, SourceDescriptor};
use crate::range_reader::{list_sheets, read_range};
use crate::schema::{ConsistencyReport, check_consistency, concatenate, equalize};
use crate::sheet_names::{ensure_unique, resolve_conflicts, sanitize};
use crate::styles::{self, StyleTemplate};
use crate::utils::{file_base_name, file_stem};
use crate::writer;
use std::path::{Path, PathBuf};

/// Sheet name used in single mode unless naming is `custom`.
pub const MERGED_SHEET_NAME: &str = "Merged Result";

/// What to do when single-mode sources disagree on their columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMismatchPolicy {
    /// Fail with [`MergeError::HeaderInconsistency`].
    #[default]
    Abort,
    /// Null-fill the missing columns and merge anyway.
    Proceed,
}

/// One read source that produced at least one row.
#[derive(Debug, Clone)]
struct Collected {
    source: SourceDescriptor,
    sheet: String,
    table: NormalizedTable,
}

/// A table bound for one output sheet.
#[derive(Debug, Clone)]
pub struct OutputSheet {
    pub name: String,
    pub table: NormalizedTable,
}

#[derive(Debug, Clone)]
pub struct MergeEngine {
    config: MergeConfig,
    range: RangeSpec,
}

impl MergeEngine {
    /// Validates the configured range up front.
    pub fn new(config: MergeConfig) -> Result<Self, MergeError> {
        let range = config.range_spec()?;
        Ok(Self { config, range })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn range(&self) -> &RangeSpec {
        &self.range
    }

    /// Reads every source and lays out the output sheets without touching disk.
    ///
    /// In single mode the consistency report is available on the result; the
    /// caller decides whether to [`PreparedMerge::write`] anyway.
    pub fn prepare(&self, sources: &[SourceDescriptor]) -> Result<PreparedMerge, MergeError> {
        let single = self.config.merge_mode == MergeMode::Single;
        let collected = self.collect(sources, single)?;
        let style_source = collected
            .first()
            .map(|item| (item.source.path.clone(), item.sheet.clone()));

        let (outputs, consistency) = if single {
            let tables: Vec<NormalizedTable> =
                collected.into_iter().map(|item| item.table).collect();
            let report = check_consistency(&tables);
            tracing::info!(
                tables = tables.len(),
                consistent = report.is_consistent(),
                "reconciling columns"
            );
            let merged = concatenate(&equalize(tables));
            let name = match self.config.sheet_name_mode {
                SheetNameMode::Custom => sanitize(&self.config.custom_sheet_name),
                _ => MERGED_SHEET_NAME.to_string(),
            };
            (
                vec![OutputSheet {
                    name,
                    table: merged,
                }],
                Some(report),
            )
        } else {
            (self.split_sheets(collected), None)
        };

        Ok(PreparedMerge {
            config: self.config.clone(),
            range: self.range,
            outputs,
            consistency,
            style_source,
        })
    }

    /// The single-sheet concatenation of `sources`, whatever the configured
    /// mode, optionally capped at `limit` rows.
    pub fn preview_merged(
        &self,
        sources: &[SourceDescriptor],
        limit: Option<usize>,
    ) -> Result<NormalizedTable, MergeError> {
        let tables: Vec<NormalizedTable> = self
            .collect(sources, true)?
            .into_iter()
            .map(|item| item.table)
            .collect();
        let mut merged = concatenate(&equalize(tables));
        if let Some(limit) = limit {
            merged.truncate_rows(limit);
        }
        Ok(merged)
    }

    /// Runs one merge to completion: prepare, apply `policy`, write.
    pub fn run(
        &self,
        sources: &[SourceDescriptor],
        dest: &Path,
        policy: HeaderMismatchPolicy,
    ) -> Result<MergeResult, MergeError> {
        writer::validate_destination(dest)?;
        let prepared = self.prepare(sources)?;

        if let Some(report) = prepared.consistency()
            && !report.is_consistent()
        {
            match policy {
                HeaderMismatchPolicy::Abort => {
                    return Err(MergeError::HeaderInconsistency(report.clone()));
                }
                HeaderMismatchPolicy::Proceed => {
                    tracing::warn!(%report, "merging despite inconsistent headers");
                }
            }
        }

        prepared.write(dest)
    }

    fn collect(
        &self,
        sources: &[SourceDescriptor],
        add_provenance: bool,
    ) -> Result<Vec<Collected>, MergeError> {
        tracing::info!(sources = sources.len(), mode = %self.config.merge_mode, "collecting inputs");
        let mut collected = Vec::with_capacity(sources.len());

        for source in sources {
            let sheet = resolve_sheet(source)?;
            let table = read_range(&source.path, &sheet, &self.range, add_provenance)?;
            if table.is_empty() {
                tracing::warn!(
                    file = %file_base_name(&source.path),
                    sheet = %sheet,
                    "selected range is empty; skipping"
                );
                continue;
            }
            collected.push(Collected {
                source: source.clone(),
                sheet,
                table,
            });
        }

        if collected.is_empty() {
            return Err(MergeError::NoData);
        }
        Ok(collected)
    }

    fn split_sheets(&self, collected: Vec<Collected>) -> Vec<OutputSheet> {
        let proposed: Vec<(usize, String)> = collected
            .iter()
            .enumerate()
            .map(|(idx, item)| (idx, sanitize(&self.proposed_sheet_name(item))))
            .collect();
        let mut names = resolve_conflicts(&proposed);
        tracing::info!(sheets = names.len(), "naming output sheets");

        collected
            .into_iter()
            .enumerate()
            .map(|(idx, item)| OutputSheet {
                name: names.swap_remove(&idx).unwrap_or_default(),
                table: item.table,
            })
            .collect()
    }

    fn proposed_sheet_name(&self, item: &Collected) -> String {
        let stem = || file_stem(&item.source.path);
        match self.config.sheet_name_mode {
            SheetNameMode::Auto => stem(),
            SheetNameMode::Original => item.sheet.clone(),
            SheetNameMode::Custom => item
                .source
                .custom_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(stem),
        }
    }
}

fn resolve_sheet(source: &SourceDescriptor) -> Result<String, MergeError> {
    if let Some(sheet) = source.sheet.as_deref().filter(|s| !s.is_empty()) {
        return Ok(sheet.to_string());
    }
    let file = file_base_name(&source.path);
    list_sheets(&source.path)
        .map_err(|err| MergeError::range_read(&file, "<first sheet>", err))?
        .into_iter()
        .next()
        .ok_or(MergeError::NoSheets { file })
}

/// Output of [`MergeEngine::prepare`]: everything needed to write the workbook.
#[derive(Debug, Clone)]
pub struct PreparedMerge {
    config: MergeConfig,
    range: RangeSpec,
    outputs: Vec<OutputSheet>,
    consistency: Option<ConsistencyReport>,
    style_source: Option<(PathBuf, String)>,
}

impl PreparedMerge {
    /// Column agreement across sources; `None` in multiple mode.
    pub fn consistency(&self) -> Option<&ConsistencyReport> {
        self.consistency.as_ref()
    }

    pub fn outputs(&self) -> &[OutputSheet] {
        &self.outputs
    }

    /// The concatenated table in single mode.
    pub fn merged_table(&self) -> Option<&NormalizedTable> {
        match self.config.merge_mode {
            MergeMode::Single => self.outputs.first().map(|out| &out.table),
            MergeMode::Multiple => None,
        }
    }

    /// Writes every output sheet to `dest`, styled as configured.
    pub fn write(self, dest: &Path) -> Result<MergeResult, MergeError> {
        writer::validate_destination(dest)?;
        ensure_unique(self.outputs.iter().map(|out| out.name.as_str()))?;

        let template = self.capture_template();
        let flags = self.config.style_flags();
        let keep_header = self.config.keep_header;

        tracing::info!(path = %dest.display(), sheets = self.outputs.len(), "writing output");
        let mut book = writer::new_output_workbook();
        let mut style_issues = Vec::new();
        let mut sheets = Vec::with_capacity(self.outputs.len());

        for output in &self.outputs {
            let sheet = writer::add_sheet(&mut book, &output.name)?;
            writer::write_table(sheet, &output.table, keep_header);

            if let Some(template) = &template {
                let issues =
                    styles::apply(sheet, template, output.table.columns(), flags, keep_header);
                style_issues.extend(issues.iter().map(ToString::to_string));
            }
            if flags.keep_column_width {
                styles::autosize_columns(sheet, &output.table, keep_header);
            }

            sheets.push(SheetSummary {
                name: output.name.clone(),
                rows: output.table.row_count(),
                columns: output.table.columns().len(),
            });
        }

        writer::save_workbook(&book, dest)?;
        tracing::info!(
            path = %dest.display(),
            sheets = sheets.len(),
            style_issues = style_issues.len(),
            "merge complete"
        );

        Ok(MergeResult {
            success: true,
            output: Some(dest.to_path_buf()),
            sheets,
            style_issues,
            ..Default::default()
        })
    }

    fn capture_template(&self) -> Option<StyleTemplate> {
        if !self.config.wants_style_template() {
            return None;
        }
        let (path, sheet) = self.style_source.as_ref()?;
        tracing::info!(file = %file_base_name(path), sheet = %sheet, "capturing style template");
        match styles::capture_from_file(path, sheet, &self.range) {
            Ok(template) if template.is_empty() => {
                tracing::debug!("template window has no columns; nothing to style");
                None
            }
            Ok(template) => Some(template),
            Err(err) => {
                tracing::warn!(error = %err, "continuing without styles");
                None
            }
        }
    }
}

/// One-shot merge for callers that only need the outcome.
pub fn run_merge(
    sources: &[SourceDescriptor],
    config: &MergeConfig,
    dest: &Path,
    policy: HeaderMismatchPolicy,
) -> MergeResult {
    let outcome =
        MergeEngine::new(config.clone()).and_then(|engine| engine.run(sources, dest, policy));
    match outcome {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "merge failed");
            MergeResult::failure(&err)
        }
    }
}

/// One-shot merged preview: the concatenated table in `MergeResult::preview`,
/// nothing written to disk.
pub fn preview_merge(
    sources: &[SourceDescriptor],
    config: &MergeConfig,
    limit: Option<usize>,
) -> MergeResult {
    let outcome = MergeEngine::new(config.clone())
        .and_then(|engine| engine.preview_merged(sources, limit));
    match outcome {
        Ok(table) => MergeResult {
            success: true,
            preview: Some(table),
            ..Default::default()
        },
        Err(err) => {
            tracing::error!(code = err.code(), error = %err, "preview failed");
            MergeResult::failure(&err)
        }
    }
}
