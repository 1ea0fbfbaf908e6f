use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::cli::inputs::parse_inputs;
use crate::config::{MergeArgs, MergeConfig, MergeJob, PartialMergeConfig};
use crate::merge::{HeaderMismatchPolicy, MergeEngine};
use crate::model::SourceDescriptor;

pub struct MergeRequest {
    pub inputs: Vec<String>,
    pub output: Option<PathBuf>,
    pub allow_mismatched_headers: bool,
    pub dry_run: bool,
    pub limit: Option<usize>,
    pub config: MergeArgs,
}

pub fn merge(request: MergeRequest) -> Result<Value> {
    let sources = parse_inputs(&request.inputs)?;
    let config = MergeConfig::from_layers(&request.config, &PartialMergeConfig::default());
    execute(
        &sources,
        config,
        request.output.as_deref(),
        policy(request.allow_mismatched_headers),
        request.dry_run,
        request.limit,
    )
}

pub fn run_job(job_path: PathBuf, args: MergeArgs, allow_mismatched_headers: bool) -> Result<Value> {
    let job = MergeJob::load(&job_path)
        .with_context(|| format!("failed to load job {}", job_path.display()))?;
    let config = MergeConfig::from_layers(&args, &job.merge);
    tracing::info!(job = %job_path.display(), sources = job.sources.len(), "running merge job");
    execute(
        &job.sources,
        config,
        Some(&job.output),
        policy(allow_mismatched_headers),
        false,
        None,
    )
}

pub fn schema() -> Result<Value> {
    Ok(serde_json::to_value(schemars::schema_for!(MergeJob))?)
}

fn policy(allow_mismatched_headers: bool) -> HeaderMismatchPolicy {
    if allow_mismatched_headers {
        HeaderMismatchPolicy::Proceed
    } else {
        HeaderMismatchPolicy::Abort
    }
}

fn execute(
    sources: &[SourceDescriptor],
    config: MergeConfig,
    output: Option<&Path>,
    policy: HeaderMismatchPolicy,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<Value> {
    let engine = MergeEngine::new(config)?;
    if dry_run {
        let table = engine.preview_merged(sources, limit)?;
        return Ok(serde_json::to_value(table)?);
    }
    let output = output.context("--output is required unless --dry-run is set")?;
    let result = engine.run(sources, output, policy)?;
    Ok(serde_json::to_value(result)?)
}
