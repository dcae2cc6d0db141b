//! ChatDispatcher — ответ на один ход чата.
//!
//! Модель с суффиксом ` (local)` идёт в локальный провайдер (один готовый ответ),
//! остальные — в удалённый (поток растущего текста). Любая ошибка превращается
//! в строку для пользователя; ничего не повторяется.

use std::pin::Pin;
use std::sync::Arc;

use ai_providers::{AiChunk, AiProvider, GenerateRequest, ProviderError};
use backend_core::{ChatTurn, DebugLog};
use futures_util::{Stream, StreamExt};
use local_provider::{is_local, strip_local_suffix};
use uuid::Uuid;

use crate::error::{AiRuntimeError, EMPTY_RESPONSE, MISSING_TOKEN_WARNING};
use crate::history::{build_messages, preview};

/// Поток ответа: каждый элемент — полный текст на текущий момент.
pub type ResponseStream = Pin<Box<dyn Stream<Item = String> + Send>>;

pub struct ChatDispatcher {
    remote: Arc<dyn AiProvider>,
    local: Arc<dyn AiProvider>,
    log: Arc<DebugLog>,
}

impl ChatDispatcher {
    pub fn new(remote: Arc<dyn AiProvider>, local: Arc<dyn AiProvider>, log: Arc<DebugLog>) -> Self {
        Self { remote, local, log }
    }

    pub fn log(&self) -> &Arc<DebugLog> {
        &self.log
    }

    pub fn respond(&self, turn: ChatTurn) -> ResponseStream {
        let local = is_local(&turn.model);
        let provider = if local {
            Arc::clone(&self.local)
        } else {
            Arc::clone(&self.remote)
        };
        let log = Arc::clone(&self.log);

        let s = async_stream::stream! {
            log.info(format!(
                "Message: '{}...' | Model: {}",
                preview(&turn.message, 50),
                turn.model
            ));

            if !local && !provider.is_available().await.unwrap_or(false) {
                log.warn("API model requested without HF_TOKEN");
                yield MISSING_TOKEN_WARNING.to_string();
                return;
            }

            let request = GenerateRequest {
                id: Uuid::new_v4().to_string(),
                model: strip_local_suffix(&turn.model).to_string(),
                messages: build_messages(&turn.system_message, &turn.history, &turn.message),
            };

            let mut chunks = match provider.generate(request, turn.options()).await {
                Ok(chunks) => chunks,
                Err(ProviderError::Unauthorized(reason)) => {
                    log.warn(format!("Unauthorized: {}", reason));
                    yield MISSING_TOKEN_WARNING.to_string();
                    return;
                }
                Err(e) => {
                    let err = AiRuntimeError::from(e);
                    log.error(format!("Error: {}", err));
                    yield err.user_message();
                    return;
                }
            };

            let mut response = String::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    AiChunk::Start => {}
                    AiChunk::Token { value } => {
                        response.push_str(&value);
                        yield response.clone();
                    }
                    AiChunk::End => break,
                    AiChunk::Error { error } => {
                        let err = AiRuntimeError::Stream(error);
                        log.error(format!("Error: {}", err));
                        yield err.user_message();
                        return;
                    }
                }
            }

            if response.is_empty() {
                log.warn("Empty response");
                yield EMPTY_RESPONSE.to_string();
            } else {
                log.info(format!("Response received ({} chars)", response.chars().count()));
            }
        };
        Box::pin(s)
    }

    /// Дожидается финального текста (для не-streaming клиентов).
    pub async fn respond_full(&self, turn: ChatTurn) -> String {
        let mut stream = self.respond(turn);
        let mut last = String::new();
        while let Some(text) = stream.next().await {
            last = text;
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_providers::{AiChunkStream, GenerateOptions, ProviderType};
    use async_trait::async_trait;
    use futures_util::stream;
    use std::sync::Mutex;

    /// Провайдер, отдающий заранее заданные чанки и запоминающий запросы.
    struct ScriptedProvider {
        available: bool,
        chunks: Vec<AiChunk>,
        open_error: Option<fn() -> ProviderError>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedProvider {
        fn new(chunks: Vec<AiChunk>) -> Self {
            Self {
                available: true,
                chunks,
                open_error: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProvider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }

        fn name(&self) -> &str {
            "Scripted"
        }

        fn provider_type(&self) -> ProviderType {
            ProviderType::Cloud
        }

        async fn generate(
            &self,
            request: GenerateRequest,
            _options: GenerateOptions,
        ) -> Result<AiChunkStream, ProviderError> {
            self.seen.lock().unwrap().push(request);
            if let Some(make) = self.open_error {
                return Err(make());
            }
            Ok(Box::pin(stream::iter(self.chunks.clone())))
        }

        async fn is_available(&self) -> Result<bool, ProviderError> {
            Ok(self.available)
        }
    }

    fn token(v: &str) -> AiChunk {
        AiChunk::Token { value: v.into() }
    }

    fn turn(model: &str) -> ChatTurn {
        ChatTurn {
            message: "Can I counter a split second spell?".into(),
            history: vec![ai_providers::ChatMessage::user("hi")],
            system_message: "You are Bob.".into(),
            model: model.into(),
            max_tokens: 256,
            temperature: 0.7,
            top_p: 0.95,
        }
    }

    fn dispatcher(remote: Arc<ScriptedProvider>, local: Arc<ScriptedProvider>) -> ChatDispatcher {
        ChatDispatcher::new(remote, local, Arc::new(DebugLog::new()))
    }

    #[tokio::test]
    async fn test_remote_yields_growing_text() {
        let remote = Arc::new(ScriptedProvider::new(vec![
            AiChunk::Start,
            token("Only "),
            token("mana "),
            token("abilities."),
            AiChunk::End,
        ]));
        let local = Arc::new(ScriptedProvider::new(Vec::new()));
        let d = dispatcher(remote.clone(), local.clone());

        let outputs: Vec<String> = d.respond(turn("meta-llama/Llama-3.2-3B-Instruct")).collect().await;
        assert_eq!(outputs, vec!["Only ", "Only mana ", "Only mana abilities."]);

        let seen = remote.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].messages.len(), 3);
        assert!(local.seen.lock().unwrap().is_empty());
        assert!(d.log().render().contains("Response received (20 chars)"));
    }

    #[tokio::test]
    async fn test_local_suffix_routes_to_local_and_strips_name() {
        let remote = Arc::new(ScriptedProvider::new(Vec::new()));
        let local = Arc::new(ScriptedProvider::new(vec![
            AiChunk::Start,
            token("Yes, with a mana ability."),
            AiChunk::End,
        ]));
        let d = dispatcher(remote.clone(), local.clone());

        let outputs: Vec<String> = d
            .respond(turn("Qwen/Qwen2.5-0.5B-Instruct (local)"))
            .collect()
            .await;
        assert_eq!(outputs, vec!["Yes, with a mana ability."]);
        assert_eq!(local.seen.lock().unwrap()[0].model, "Qwen/Qwen2.5-0.5B-Instruct");
        assert!(remote.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let mut remote = ScriptedProvider::new(vec![token("never")]);
        remote.available = false;
        let remote = Arc::new(remote);
        let d = dispatcher(remote.clone(), Arc::new(ScriptedProvider::new(Vec::new())));

        let outputs: Vec<String> = d.respond(turn("meta-llama/Llama-3.2-3B-Instruct")).collect().await;
        assert_eq!(outputs, vec![MISSING_TOKEN_WARNING.to_string()]);
        assert!(remote.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_error_becomes_user_message() {
        let mut remote = ScriptedProvider::new(Vec::new());
        remote.open_error = Some(|| ProviderError::Http("dns error".into()));
        let d = dispatcher(Arc::new(remote), Arc::new(ScriptedProvider::new(Vec::new())));

        let text = d.respond_full(turn("meta-llama/Llama-3.2-3B-Instruct")).await;
        assert_eq!(text, "❌ Error: HTTP request failed: dns error");
        assert!(d.log().render().contains("[ERROR]"));
    }

    #[tokio::test]
    async fn test_mid_stream_error_after_partial_text() {
        let remote = Arc::new(ScriptedProvider::new(vec![
            AiChunk::Start,
            token("Partial"),
            AiChunk::Error {
                error: "connection reset".into(),
            },
            token("ignored"),
        ]));
        let d = dispatcher(remote, Arc::new(ScriptedProvider::new(Vec::new())));

        let outputs: Vec<String> = d.respond(turn("meta-llama/Llama-3.2-3B-Instruct")).collect().await;
        assert_eq!(outputs, vec!["Partial", "❌ Error: connection reset"]);
    }

    #[tokio::test]
    async fn test_empty_generation() {
        let remote = Arc::new(ScriptedProvider::new(vec![AiChunk::Start, AiChunk::End]));
        let d = dispatcher(remote, Arc::new(ScriptedProvider::new(Vec::new())));
        let text = d.respond_full(turn("meta-llama/Llama-3.2-3B-Instruct")).await;
        assert_eq!(text, EMPTY_RESPONSE);
    }
}
