use lanefall_chart::ParseError;
use thiserror::Error;

use crate::note::NoteId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse chart: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no lane layout configured for {0} lanes")]
    UnsupportedLaneCount(usize),

    #[error("note {0} is no longer visible")]
    NoteNotVisible(NoteId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("chart producer failed: {0}")]
    ProducerFailed(String),

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

impl EngineError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}
