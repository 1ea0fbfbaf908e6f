use crate::schema::ConsistencyReport;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("failed to read sheet '{sheet}' of {file}: {source}")]
    RangeRead {
        file: String,
        sheet: String,
        #[source]
        source: BoxedSource,
    },

    #[error("sheet '{sheet}' not found in {file}")]
    SheetNotFound { file: String, sheet: String },

    #[error("failed to open workbook {file}: {source}")]
    Open {
        file: String,
        #[source]
        source: BoxedSource,
    },

    #[error("workbook {file} contains no sheets")]
    NoSheets { file: String },

    #[error("headers are inconsistent:\n{0}")]
    HeaderInconsistency(ConsistencyReport),

    #[error("no data to merge: every selected range is empty")]
    NoData,

    #[error("sheet name '{0}' is used more than once in the output workbook")]
    SheetNameConflict(String),

    #[error("failed to capture styles from {file}: {message}")]
    StyleCapture { file: String, message: String },

    #[error("failed to style {cell} on sheet '{sheet}': {message}")]
    StyleApply {
        sheet: String,
        cell: String,
        message: String,
    },

    #[error("failed to write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl MergeError {
    pub(crate) fn range_read(
        file: impl Into<String>,
        sheet: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::RangeRead {
            file: file.into(),
            sheet: sheet.into(),
            source: source.into(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            MergeError::InvalidRange(_) => "INVALID_RANGE",
            MergeError::RangeRead { .. } => "RANGE_READ",
            MergeError::SheetNotFound { .. } => "SHEET_NOT_FOUND",
            MergeError::Open { .. } => "OPEN_FAILED",
            MergeError::NoSheets { .. } => "NO_SHEETS",
            MergeError::HeaderInconsistency(_) => "HEADER_INCONSISTENCY",
            MergeError::NoData => "NO_DATA",
            MergeError::SheetNameConflict(_) => "SHEET_NAME_CONFLICT",
            MergeError::StyleCapture { .. } => "STYLE_CAPTURE",
            MergeError::StyleApply { .. } => "STYLE_APPLY",
            MergeError::Write { .. } => "WRITE_FAILED",
        }
    }

    /// Style failures never fail a merge; everything else does.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MergeError::StyleCapture { .. } | MergeError::StyleApply { .. }
        )
    }
}
