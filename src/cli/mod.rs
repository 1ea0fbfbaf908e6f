pub mod commands;
pub mod errors;
pub mod inputs;
pub mod output;

use crate::config::{MergeArgs, RangeSpec};
use crate::logging::init_logging;
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "sheet-merge",
    version,
    about = "Merge worksheet ranges from many workbooks into one"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Print single-line JSON")]
    pub compact: bool,

    #[arg(short, long, action = ArgAction::Count, global = true, help = "Raise log verbosity (repeatable)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Row/column window flags for `preview`.
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    #[arg(long, default_value = "1", value_name = "ROW")]
    pub header_row: String,

    #[arg(long, default_value = "", value_name = "ROW")]
    pub start_row: String,

    #[arg(long, default_value = "", value_name = "ROW")]
    pub end_row: String,

    #[arg(long, default_value = "A", value_name = "COL")]
    pub start_col: String,

    #[arg(long, default_value = "", value_name = "COL")]
    pub end_col: String,
}

impl RangeArgs {
    fn to_spec(&self) -> Result<RangeSpec> {
        Ok(RangeSpec::parse(
            &self.header_row,
            &self.start_row,
            &self.end_row,
            &self.start_col,
            &self.end_col,
        )?)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the sheets of a workbook.
    ListSheets { file: PathBuf },
    /// Read one sheet's range as a table.
    Preview {
        file: PathBuf,
        sheet: String,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, help = "Maximum rows to return")]
        limit: Option<usize>,
    },
    /// Merge inputs into one output workbook.
    Merge {
        #[arg(
            short,
            long = "input",
            required = true,
            value_name = "FILE[::SHEET[::NAME]]",
            help = "Source workbook (glob allowed), optional sheet and output sheet name"
        )]
        inputs: Vec<String>,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, help = "Merge even when source headers differ")]
        allow_mismatched_headers: bool,
        #[arg(long, help = "Print the merged table instead of writing a workbook")]
        dry_run: bool,
        #[arg(long, requires = "dry_run", help = "Maximum rows to print with --dry-run")]
        limit: Option<usize>,
        #[command(flatten)]
        config: MergeArgs,
    },
    /// Run a YAML or JSON merge job.
    Run {
        job: PathBuf,
        #[arg(long, help = "Merge even when source headers differ")]
        allow_mismatched_headers: bool,
        #[command(flatten)]
        config: MergeArgs,
    },
    /// Print the JSON schema of merge job files.
    Schema,
}

pub fn run_command(command: Commands) -> Result<Value> {
    match command {
        Commands::ListSheets { file } => commands::read::list_sheets(file),
        Commands::Preview {
            file,
            sheet,
            range,
            limit,
        } => commands::read::preview(file, sheet, range.to_spec()?, limit),
        Commands::Merge {
            inputs,
            output,
            allow_mismatched_headers,
            dry_run,
            limit,
            config,
        } => commands::merge::merge(commands::merge::MergeRequest {
            inputs,
            output,
            allow_mismatched_headers,
            dry_run,
            limit,
            config,
        }),
        Commands::Run {
            job,
            allow_mismatched_headers,
            config,
        } => commands::merge::run_job(job, config, allow_mismatched_headers),
        Commands::Schema => commands::merge::schema(),
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_command(cli.command) {
        Ok(payload) => {
            if let Err(error) = output::emit_value(&payload, cli.compact) {
                emit_error_and_exit(error);
            }
            Ok(())
        }
        Err(error) => emit_error_and_exit(error),
    }
}

fn emit_error_and_exit(error: anyhow::Error) -> ! {
    let envelope = errors::envelope_for(&error);
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    if serde_json::to_writer(&mut handle, &envelope).is_err() {
        eprintln!("{{\"code\":\"COMMAND_FAILED\",\"message\":\"{}\"}}", error);
    } else {
        use std::io::Write;
        let _ = handle.write_all(b"\n");
    }
    std::process::exit(1)
}
