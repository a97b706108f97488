use thiserror::Error;

/// Errors produced while reading a chart.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("chart declares no lane count (CircleSize) before its event section")]
    MissingLaneCount,

    #[error("line {line}: invalid lane count {value:?}")]
    InvalidLaneCount { line: usize, value: String },

    #[error("line {line}: malformed event record: {reason}")]
    MalformedEvent { line: usize, reason: String },

    #[error("failed to read chart")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            line,
            reason: reason.into(),
        }
    }

    /// Source line the error refers to, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::InvalidLaneCount { line, .. } | Self::MalformedEvent { line, .. } => Some(*line),
            Self::MissingLaneCount | Self::Io(_) => None,
        }
    }
}
