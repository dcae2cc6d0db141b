//! HF Provider — удалённые модели через Hugging Face inference router.

mod auth;
mod client;
mod error;
mod models;
mod provider;

pub use auth::{TokenSource, TOKEN_ENV};
pub use client::{HfClient, DONE_MARKER};
pub use error::HfError;
pub use models::{chat_completions_url, API_MODELS, DEFAULT_BASE_URL};
pub use provider::HfProvider;
