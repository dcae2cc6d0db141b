//! AI Providers — единый интерфейс для локальных и API-провайдеров.
//!
//! Provider не знает про UI — только получает готовые сообщения и генерирует ответ.

mod traits;

pub use traits::{
    AiChunk, AiChunkStream, AiProvider, ChatMessage, GenerateOptions, GenerateRequest,
    ProviderError, ProviderType, Role,
};
