use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The request never reached the converter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The document model cannot be written as-is.
    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
