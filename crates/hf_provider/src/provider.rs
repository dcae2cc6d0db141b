//! HF Provider — impl AiProvider (cloud, streaming).

use std::sync::Arc;

use ai_providers::{
    AiChunk, AiChunkStream, AiProvider, GenerateOptions, GenerateRequest, ProviderError,
    ProviderType,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use crate::auth::TokenSource;
use crate::client::HfClient;
use crate::error::HfError;

pub struct HfProvider {
    client: Arc<HfClient>,
    token: TokenSource,
}

impl HfProvider {
    /// Базовый адрес: HF router по умолчанию, либо прокси / self-hosted TGI / тестовый сервер.
    pub fn with_base_url(token: TokenSource, base_url: &str) -> Result<Self, HfError> {
        // Без таймаута: ответ стримится, длина генерации не ограничена по времени.
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| HfError::Http(e.to_string()))?;
        let client = HfClient::with_base_url(http_client, base_url);
        Ok(Self {
            client: Arc::new(client),
            token,
        })
    }
}

fn to_provider_error(e: HfError) -> ProviderError {
    match e {
        HfError::MissingToken => ProviderError::Unauthorized(e.to_string()),
        HfError::Http(msg) => ProviderError::Http(msg),
        HfError::Api(msg) | HfError::Decode(msg) => ProviderError::Generation(msg),
    }
}

#[async_trait]
impl AiProvider for HfProvider {
    fn id(&self) -> &str {
        "cloud-hf"
    }

    fn name(&self) -> &str {
        "Hugging Face Inference"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Cloud
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        options: GenerateOptions,
    ) -> Result<AiChunkStream, ProviderError> {
        let token = self
            .token
            .token()
            .ok_or_else(|| to_provider_error(HfError::MissingToken))?;

        debug!(request_id = %request.id, model = %request.model, "HF chat request");
        let deltas = self
            .client
            .chat_stream(token, &request.model, &request.messages, options)
            .await
            .map_err(to_provider_error)?;

        let s = async_stream::stream! {
            yield AiChunk::Start;
            let mut deltas = deltas;
            while let Some(delta) = deltas.next().await {
                match delta {
                    Ok(value) => yield AiChunk::Token { value },
                    Err(e) => {
                        yield AiChunk::Error { error: e.to_string() };
                        return;
                    }
                }
            }
            yield AiChunk::End;
        };
        Ok(Box::pin(s))
    }

    async fn is_available(&self) -> Result<bool, ProviderError> {
        Ok(self.token.is_set())
    }
}
