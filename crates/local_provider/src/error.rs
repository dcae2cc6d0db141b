//! Ошибки LocalProvider.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocalProviderError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("local inference backend is not compiled in (enable the `llama` feature)")]
    BackendMissing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
