//! Ошибки HF Provider.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HfError {
    #[error("HF_TOKEN is not set")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("malformed stream chunk: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for HfError {
    fn from(e: reqwest::Error) -> Self {
        HfError::Http(e.to_string())
    }
}
