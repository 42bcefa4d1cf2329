use crate::model::SeriesId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unrecognized frequency or non-numeric interval. Nothing is generated.
    InvalidRepetition(String),
    SeriesNotFound(SeriesId),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRepetition(msg) => write!(f, "invalid repetition: {msg}"),
            EngineError::SeriesNotFound(id) => write!(f, "series not found: {id}"),
        }
    }
}

impl std::error::Error for EngineError {}
