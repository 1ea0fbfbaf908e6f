//! `--input` parsing: `FILE[::SHEET[::NAME]]`, where FILE may be a glob.

use crate::model::SourceDescriptor;
use anyhow::{Context, Result, bail};
use globset::GlobBuilder;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const SEPARATOR: &str = "::";

pub fn parse_inputs(raw: &[String]) -> Result<Vec<SourceDescriptor>> {
    let mut sources = Vec::new();
    for input in raw {
        sources.extend(parse_input(input)?);
    }
    if sources.is_empty() {
        bail!("at least one --input is required");
    }
    Ok(sources)
}

/// Expands one `--input` value into descriptors, one per matched file.
pub fn parse_input(raw: &str) -> Result<Vec<SourceDescriptor>> {
    let mut parts = raw.splitn(3, SEPARATOR);
    let file = parts.next().unwrap_or_default().trim();
    if file.is_empty() {
        bail!("input '{raw}' has no file path");
    }
    let sheet = non_empty(parts.next());
    let custom_name = non_empty(parts.next());

    let paths = if is_glob(file) {
        expand_glob(file)?
    } else {
        vec![PathBuf::from(file)]
    };

    Ok(paths
        .into_iter()
        .map(|path| SourceDescriptor {
            path,
            sheet: sheet.clone(),
            custom_name: custom_name.clone(),
        })
        .collect())
}

fn non_empty(part: Option<&str>) -> Option<String> {
    part.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Matching files in sorted path order. The walk starts at the longest
/// literal directory prefix of `pattern`.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern '{pattern}'"))?
        .compile_matcher();

    let root = literal_prefix(pattern);
    let walk_root = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.clone()
    };

    let mut matched = Vec::new();
    for entry in WalkDir::new(&walk_root).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to scan {}", walk_root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let candidate = if root.as_os_str().is_empty() {
            entry
                .path()
                .strip_prefix(".")
                .unwrap_or(entry.path())
                .to_path_buf()
        } else {
            entry.path().to_path_buf()
        };
        if matcher.is_match(&candidate) {
            matched.push(candidate);
        }
    }

    if matched.is_empty() {
        bail!("pattern '{pattern}' matched no files");
    }
    matched.sort();
    Ok(matched)
}

fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let components: Vec<Component<'_>> = Path::new(pattern).components().collect();
    for (idx, component) in components.iter().enumerate() {
        let is_last = idx + 1 == components.len();
        if is_last || is_glob(&component.as_os_str().to_string_lossy()) {
            break;
        }
        prefix.push(component);
    }
    prefix
}
