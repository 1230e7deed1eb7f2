use thiserror::Error;

/// Classifies source data errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDataErrorKind {
    /// File open/read failure
    Io,
    /// Download failure (connection, timeout, non-success status)
    Transport,
    /// Input is not a JSON array of strings, or is truncated
    Decode,
}

/// Index error types
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Undefined source \"{0}\"")]
    UnknownSource(String),

    #[error("Source data error: {message}")]
    SourceData {
        kind: SourceDataErrorKind,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexError {
    /// Build a `SourceData` error of the given kind.
    pub fn source_data(kind: SourceDataErrorKind, message: impl Into<String>) -> Self {
        IndexError::SourceData {
            kind,
            message: message.into(),
        }
    }

    /// Kind of a `SourceData` error, `None` for every other variant.
    pub fn source_data_kind(&self) -> Option<SourceDataErrorKind> {
        match self {
            IndexError::SourceData { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
