use serde::{Deserialize, Serialize};

use super::{ExtractionProgress, ExtractionResult};

/// Extraction sub-state of a chat session.
///
/// A tagged union rather than independent flags so impossible combinations
/// ("ready" and "failed" at once) cannot be represented. `Failed` and
/// `Cancelled` are terminal until the next document selection or reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    Idle,
    /// `None` until the first page has been processed.
    Parsing(Option<ExtractionProgress>),
    Ready(ExtractionResult),
    Failed(String),
    Cancelled(String),
}

impl ExtractionState {
    pub fn is_parsing(&self) -> bool {
        matches!(self, Self::Parsing(_))
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<ExtractionProgress> {
        match self {
            Self::Parsing(progress) => *progress,
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) | Self::Cancelled(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Completion sub-state of a chat session. A successful call returns to
/// `Idle` with the transcript already updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    Idle,
    Asking,
    Failed(String),
    Cancelled(String),
}

impl CompletionState {
    pub fn is_asking(&self) -> bool {
        matches!(self, Self::Asking)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(msg) | Self::Cancelled(msg) => Some(msg),
            _ => None,
        }
    }
}
