//! HTTP-клиент для HF inference router (OpenAI-совместимый chat-completions, streaming).

use std::pin::Pin;

use ai_providers::{ChatMessage, GenerateOptions};
use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::HfError;
use crate::models::chat_completions_url;

/// Терминальный payload потока chat-completions.
pub const DONE_MARKER: &str = "[DONE]";

/// Поток текстовых дельт ответа.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, HfError>> + Send>>;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Разбирает один payload `data:`. `Ok(None)` — чанк без текста (роль, finish_reason).
pub(crate) fn parse_delta(payload: &str) -> Result<Option<String>, HfError> {
    let chunk: StreamChunk =
        serde_json::from_str(payload).map_err(|e| HfError::Decode(e.to_string()))?;
    if let Some(err) = chunk.error {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        return Err(HfError::Api(message));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .filter(|c| !c.is_empty()))
}

pub struct HfClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HfClient {
    pub fn with_base_url(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    /// Открывает streaming-запрос и возвращает поток текстовых дельт.
    /// Ошибки соединения и не-2xx статус — до первого элемента потока.
    pub async fn chat_stream(
        &self,
        token: &str,
        model: &str,
        messages: &[ChatMessage],
        options: GenerateOptions,
    ) -> Result<DeltaStream, HfError> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stream: true,
        };

        let response = self
            .http_client
            .post(chat_completions_url(&self.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HfError::Api(format!("status {}: {}", status, body)));
        }
        debug!(model, "HF stream opened");

        let mut events = response.bytes_stream().eventsource();
        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(e) => e,
                    Err(e) => {
                        yield Err(HfError::Http(e.to_string()));
                        return;
                    }
                };
                let payload = event.data.trim();
                if payload == DONE_MARKER {
                    break;
                }
                if payload.is_empty() {
                    continue;
                }
                match parse_delta(payload) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
