//! Ошибки AI Runtime и их текст для пользователя.
//!
//! Все ошибки проходят через thiserror. Без unwrap, без panic.

use ai_providers::ProviderError;
use thiserror::Error;

/// Префикс ошибки в ответе чата.
pub const ERROR_MARKER: &str = "❌ Error:";

/// Ответ на запрос к API-модели без токена.
pub const MISSING_TOKEN_WARNING: &str =
    "⚠️ Please set HF_TOKEN to use API models. Local models work without it.";

/// Ответ, если модель ничего не сгенерировала.
pub const EMPTY_RESPONSE: &str = "(no response)";

#[derive(Error, Debug)]
pub enum AiRuntimeError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Stream(String),
}

impl AiRuntimeError {
    /// Текст для окна чата.
    pub fn user_message(&self) -> String {
        format!("{} {}", ERROR_MARKER, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_has_marker() {
        let err = AiRuntimeError::from(ProviderError::Http("connection refused".into()));
        assert_eq!(
            err.user_message(),
            "❌ Error: HTTP request failed: connection refused"
        );
        let err = AiRuntimeError::Stream("model overloaded".into());
        assert_eq!(err.user_message(), "❌ Error: model overloaded");
    }
}
