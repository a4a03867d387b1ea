use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Locator error: {0}")]
    Locator(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Failure inside a single format decoder. Never crosses the format reader's
/// public boundary; the reader turns it into a preview message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Malformed(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("out of memory")]
    OutOfMemory,

    #[error("decoder panicked: {0}")]
    Panicked(String),
}

impl From<std::collections::TryReserveError> for DecodeError {
    fn from(_: std::collections::TryReserveError) -> Self {
        DecodeError::OutOfMemory
    }
}
