pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod merge;
pub mod model;
pub mod range_reader;
pub mod schema;
pub mod sheet_names;
pub mod styles;
pub mod utils;
pub mod writer;

pub use config::{MergeConfig, MergeJob, MergeMode, RangeSpec, SheetNameMode, StyleFlags};
pub use errors::MergeError;
pub use merge::{HeaderMismatchPolicy, MergeEngine, PreparedMerge, preview_merge, run_merge};
pub use model::{CellValue, MergeResult, NormalizedTable, PROVENANCE_COLUMN, SourceDescriptor};
pub use range_reader::{list_sheets, preview_range, read_range};
pub use schema::{ConsistencyReport, check_consistency, equalize};
pub use styles::StyleTemplate;
