//! LocalProvider — модели, исполняемые в процессе (GGUF, llama.cpp).
//!
//! В памяти держится не больше одной модели; смена имени модели выгружает предыдущую.

mod config;
mod error;
mod inference;
mod model_manager;
mod prompt;
mod provider;
mod slot;

pub use config::{
    find_local_model, inference_threads, is_local, local_model_options, strip_local_suffix, LocalConfig,
    LocalModelSpec, DEFAULT_HUB_URL, LOCAL_MODELS, LOCAL_SUFFIX,
};
pub use error::LocalProviderError;
pub use inference::{DefaultLoader, EngineLoader, LocalEngine};
pub use model_manager::{DownloadProgress, ModelInfo, ModelManager};
pub use prompt::render_chatml;
pub use provider::LocalProvider;
pub use slot::ModelSlot;
