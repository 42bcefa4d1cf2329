use crate::backup::ImportError;
use crate::engine::EngineError;
use crate::model::ShiftId;

#[derive(Debug)]
pub enum StoreError {
    NotFound(ShiftId),
    InvalidTemplate(&'static str),
    Engine(EngineError),
    Import(ImportError),
    Export(String),
    Journal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "shift not found: {id}"),
            StoreError::InvalidTemplate(msg) => write!(f, "invalid shift: {msg}"),
            StoreError::Engine(e) => write!(f, "{e}"),
            StoreError::Import(e) => write!(f, "import failed: {e}"),
            StoreError::Export(e) => write!(f, "export failed: {e}"),
            StoreError::Journal(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<EngineError> for StoreError {
    fn from(e: EngineError) -> Self {
        StoreError::Engine(e)
    }
}

impl From<ImportError> for StoreError {
    fn from(e: ImportError) -> Self {
        StoreError::Import(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Journal(e.to_string())
    }
}
