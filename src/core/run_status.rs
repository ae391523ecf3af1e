use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const FINISHED_MARKER: &str = "FINISHED";
const ERROR_MARKER: &str = "ERROR";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRunStatus {
    pub output_document: OutputDocument,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    pub common: CommonOutput,
    /// Display only. Whatever the service sends is shown as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_moved: Option<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CommonOutput {
    pub status: String,
}

impl ActivityRunStatus {
    pub fn new(status: impl Into<String>, rows_moved: Option<u64>) -> Self {
        Self {
            output_document: OutputDocument {
                common: CommonOutput {
                    status: status.into(),
                },
                rows_moved: rows_moved.map(Value::from),
            },
        }
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::from_wire(&self.output_document.common.status)
    }
}

/// Wire status decoded once. The raw string is kept for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    InProgress(String),
    Finished(String),
    FinishedWithError(String),
}

impl RunStatus {
    pub fn from_wire(raw: &str) -> Self {
        if !raw.contains(FINISHED_MARKER) {
            RunStatus::InProgress(raw.to_string())
        } else if raw.contains(ERROR_MARKER) {
            RunStatus::FinishedWithError(raw.to_string())
        } else {
            RunStatus::Finished(raw.to_string())
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::InProgress(raw) | RunStatus::Finished(raw) | RunStatus::FinishedWithError(raw) => {
                raw
            }
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded { message: String },
    Failed { message: String },
    InProgress,
}

impl RunOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunOutcome::InProgress)
    }
}

pub fn render(response: &ActivityRunStatus) -> RunOutcome {
    match response.status() {
        RunStatus::InProgress(_) => RunOutcome::InProgress,
        RunStatus::Finished(_) => {
            let rows = match &response.output_document.rows_moved {
                None | Some(Value::Null) => "an unknown number of".to_string(),
                Some(Value::String(rows)) => rows.clone(),
                Some(rows) => rows.to_string(),
            };
            RunOutcome::Succeeded {
                message: format!(
                    "The data was loaded successfully. {rows} records were processed. For more information, click View Log."
                ),
            }
        }
        RunStatus::FinishedWithError(status) => RunOutcome::Failed {
            message: format!(
                "The data was not loaded because the following error occurred: {status}. For more information, click View Log."
            ),
        },
    }
}
