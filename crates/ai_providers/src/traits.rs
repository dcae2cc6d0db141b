//! Интерфейс AI-провайдера: только streaming.
//!
//! Ответ идёт чанками (start → token* → end | error).

use async_trait::async_trait;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

// ---------------------------------------------------------------------------
// Chunk types (streaming only)
// ---------------------------------------------------------------------------

/// Один чанк потока ответа.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiChunk {
    /// Генерация началась.
    Start,
    /// Очередной фрагмент текста (дельта, не накопленный ответ).
    Token { value: String },
    /// Генерация завершена успешно.
    End,
    /// Ошибка после старта потока.
    Error { error: String },
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Сообщение диалога в формате chat-completions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// ---------------------------------------------------------------------------
// Request & options
// ---------------------------------------------------------------------------

/// Запрос на генерацию. `model` — имя модели без служебных суффиксов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub id: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Параметры сэмплирования.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Local,
    Cloud,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Тип потока чанков.
pub type AiChunkStream = Pin<Box<dyn Stream<Item = AiChunk> + Send>>;

/// Интерфейс AI-провайдера.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Уникальный id провайдера (local, cloud-hf, …).
    fn id(&self) -> &str;

    /// Имя для UI и логов.
    fn name(&self) -> &str;

    /// Локальный или облачный.
    fn provider_type(&self) -> ProviderType;

    /// Генерация: возвращает поток чанков. Ошибки до старта — через Result; после старта — через AiChunk::Error.
    async fn generate(
        &self,
        request: GenerateRequest,
        options: GenerateOptions,
    ) -> Result<AiChunkStream, ProviderError>;

    /// Доступность (есть токен, модель есть в каталоге и т.д.).
    async fn is_available(&self) -> Result<bool, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
    #[error("Not authenticated: {0}")]
    Unauthorized(String),
    #[error("Generation failed: {0}")]
    Generation(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
}
