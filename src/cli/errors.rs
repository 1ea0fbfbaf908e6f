use crate::errors::MergeError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub try_this: Option<String>,
}

pub fn envelope_for(error: &anyhow::Error) -> ErrorEnvelope {
    let message = format!("{error:#}");

    if let Some(merge_error) = error.downcast_ref::<MergeError>() {
        return ErrorEnvelope {
            code: merge_error.code().to_string(),
            message,
            try_this: hint_for(merge_error),
        };
    }

    if message.contains("matched no files") || message.contains("does not exist") {
        return ErrorEnvelope {
            code: "FILE_NOT_FOUND".to_string(),
            message,
            try_this: Some("check the workbook path and permissions".to_string()),
        };
    }

    if message.contains("unsupported config extension") {
        return ErrorEnvelope {
            code: "INVALID_ARGUMENT".to_string(),
            message,
            try_this: Some("job files must end in .yaml, .yml or .json".to_string()),
        };
    }

    ErrorEnvelope {
        code: "COMMAND_FAILED".to_string(),
        message,
        try_this: None,
    }
}

fn hint_for(error: &MergeError) -> Option<String> {
    let hint = match error {
        MergeError::SheetNotFound { .. } | MergeError::RangeRead { .. } => {
            "run `sheet-merge list-sheets <file>` to inspect valid names"
        }
        MergeError::HeaderInconsistency(_) => {
            "re-run with `--allow-mismatched-headers` to null-fill missing columns"
        }
        MergeError::InvalidRange(_) => "rows are 1-based numbers and columns are letters like `B`",
        MergeError::Write { .. } => "the output must be an .xlsx path in an existing directory",
        _ => return None,
    };
    Some(hint.to_string())
}
