//! LocalProvider — impl AiProvider для моделей, исполняемых в процессе.
//!
//! Генерация синхронная: один проход, один чанк с полным текстом.

use std::sync::Arc;

use ai_providers::{
    AiChunk, AiChunkStream, AiProvider, GenerateOptions, GenerateRequest, ProviderError,
    ProviderType,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{find_local_model, LocalConfig, LocalModelSpec};
use crate::error::LocalProviderError;
use crate::inference::{DefaultLoader, EngineLoader};
use crate::model_manager::{DownloadProgress, ModelManager};
use crate::prompt::render_chatml;
use crate::slot::ModelSlot;

pub struct LocalProvider {
    model_manager: ModelManager,
    loader: Arc<dyn EngineLoader>,
    slot: ModelSlot,
}

impl LocalProvider {
    pub fn new(config: LocalConfig) -> Self {
        Self::with_loader(config, Arc::new(DefaultLoader::default()))
    }

    pub fn with_loader(config: LocalConfig, loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            model_manager: ModelManager::new(config),
            loader,
            slot: ModelSlot::new(),
        }
    }

    pub fn model_manager(&self) -> &ModelManager {
        &self.model_manager
    }

    /// Имя модели, загруженной сейчас.
    pub async fn loaded_model(&self) -> Option<String> {
        self.slot.current_name().await
    }

    fn resolve(model: &str) -> Result<&'static LocalModelSpec, LocalProviderError> {
        find_local_model(model).ok_or_else(|| LocalProviderError::ModelNotFound(model.to_string()))
    }

    async fn run(
        &self,
        request: GenerateRequest,
        options: GenerateOptions,
    ) -> Result<String, LocalProviderError> {
        let entry = Self::resolve(&request.model)?;
        if !self.loader.is_supported() {
            return Err(LocalProviderError::BackendMissing);
        }
        let path = self
            .model_manager
            .ensure_model_installed(entry, log_progress)
            .await?;

        let config = self.model_manager.config();
        let engine = self
            .slot
            .get_or_load(entry.name, &path, Arc::clone(&self.loader), config)
            .await?;

        let options = GenerateOptions {
            max_tokens: options.max_tokens.min(config.max_tokens),
            ..options
        };
        let prompt = render_chatml(&request.messages);
        debug!(request_id = %request.id, model = entry.name, "local generation");

        tokio::task::spawn_blocking(move || engine.generate(&prompt, &options))
            .await
            .map_err(|e| LocalProviderError::InferenceFailed(e.to_string()))?
    }
}

/// Логирует прогресс загрузки каждые ~10%.
fn log_progress(progress: DownloadProgress) {
    if progress.bytes_total == 0 {
        return;
    }
    let step = (progress.bytes_total / 10).max(1);
    let prev = progress.bytes_done.saturating_sub(1) / step;
    let now = progress.bytes_done / step;
    if now != prev || progress.bytes_done == progress.bytes_total {
        info!(
            done = progress.bytes_done,
            total = progress.bytes_total,
            "model download progress"
        );
    }
}

#[async_trait]
impl AiProvider for LocalProvider {
    fn id(&self) -> &str {
        "local"
    }

    fn name(&self) -> &str {
        "Local model"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Local
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        options: GenerateOptions,
    ) -> Result<AiChunkStream, ProviderError> {
        Self::resolve(&request.model).map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let result = self.run(request, options).await;
        let s = async_stream::stream! {
            yield AiChunk::Start;
            match result {
                Ok(text) => {
                    if !text.is_empty() {
                        yield AiChunk::Token { value: text };
                    }
                    yield AiChunk::End;
                }
                Err(e) => yield AiChunk::Error { error: e.to_string() },
            }
        };
        Ok(Box::pin(s))
    }

    async fn is_available(&self) -> Result<bool, ProviderError> {
        Ok(!self.model_manager.list_installed().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LOCAL_MODELS;
    use crate::inference::LocalEngine;
    use ai_providers::ChatMessage;
    use futures_util::StreamExt;
    use std::path::Path;

    struct PromptEcho;

    impl LocalEngine for PromptEcho {
        fn generate(
            &self,
            prompt: &str,
            options: &GenerateOptions,
        ) -> Result<String, LocalProviderError> {
            Ok(format!("{}|{}", options.max_tokens, prompt.lines().count()))
        }
    }

    struct EchoLoader;

    impl EngineLoader for EchoLoader {
        fn load(
            &self,
            _path: &Path,
            _config: &LocalConfig,
        ) -> Result<Arc<dyn LocalEngine>, LocalProviderError> {
            Ok(Arc::new(PromptEcho))
        }
    }

    fn installed_provider(dir: &Path) -> LocalProvider {
        let mut config = LocalConfig::with_models_dir(dir.to_path_buf());
        config.max_tokens = 64;
        let entry = &LOCAL_MODELS[0];
        let model_dir = config.model_dir(entry);
        std::fs::create_dir_all(&model_dir).expect("mkdir");
        std::fs::write(model_dir.join(entry.file), b"GGUF").expect("write gguf");
        LocalProvider::with_loader(config, Arc::new(EchoLoader))
    }

    #[tokio::test]
    async fn test_generate_yields_single_completed_chunk() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let provider = installed_provider(tmp.path());
        let request = GenerateRequest {
            id: "r1".into(),
            model: LOCAL_MODELS[0].name.into(),
            messages: vec![ChatMessage::system("Bob"), ChatMessage::user("hi")],
        };
        let options = GenerateOptions {
            max_tokens: 512,
            ..GenerateOptions::default()
        };
        let chunks: Vec<AiChunk> = provider
            .generate(request, options)
            .await
            .expect("stream")
            .collect()
            .await;
        // max_tokens урезан до лимита конфига; ChatML: 2 сообщения × 2 строки + заголовок ассистента.
        assert_eq!(
            chunks,
            vec![
                AiChunk::Start,
                AiChunk::Token { value: "64|5".into() },
                AiChunk::End
            ]
        );
        assert_eq!(provider.loaded_model().await.as_deref(), Some(LOCAL_MODELS[0].name));
        assert!(provider.is_available().await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_model_is_unavailable() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let provider = installed_provider(tmp.path());
        let request = GenerateRequest {
            id: "r2".into(),
            model: "nobody/nothing".into(),
            messages: vec![ChatMessage::user("hi")],
        };
        assert!(matches!(
            provider.generate(request, GenerateOptions::default()).await,
            Err(ProviderError::Unavailable(_))
        ));
    }

    struct NoBackend;

    impl EngineLoader for NoBackend {
        fn is_supported(&self) -> bool {
            false
        }

        fn load(
            &self,
            _path: &Path,
            _config: &LocalConfig,
        ) -> Result<Arc<dyn LocalEngine>, LocalProviderError> {
            Err(LocalProviderError::BackendMissing)
        }
    }

    #[tokio::test]
    async fn test_missing_backend_skips_download() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = LocalConfig::with_models_dir(tmp.path().join("models"));
        config.hub_url = "http://127.0.0.1:1".into();
        let provider = LocalProvider::with_loader(config, Arc::new(NoBackend));
        let request = GenerateRequest {
            id: "r3".into(),
            model: LOCAL_MODELS[1].display_name(),
            messages: vec![ChatMessage::user("Is Counterspell legal in Pioneer?")],
        };
        let chunks: Vec<AiChunk> = provider
            .generate(request, GenerateOptions::default())
            .await
            .expect("stream")
            .collect()
            .await;
        match chunks.as_slice() {
            [AiChunk::Start, AiChunk::Error { error }] => {
                assert!(error.contains("not compiled in"), "got: {error}")
            }
            other => panic!("unexpected chunks: {:?}", other),
        }
        assert!(!tmp.path().join("models").exists());
        assert!(provider.loaded_model().await.is_none());
    }
}
