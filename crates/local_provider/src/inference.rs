//! Синхронный inference. Реальный движок — GGUF через llama.cpp (feature `llama`).

use std::path::Path;
use std::sync::Arc;

use ai_providers::GenerateOptions;

use crate::config::LocalConfig;
use crate::error::LocalProviderError;

/// Загруженная модель. Генерация блокирующая: вызывать из spawn_blocking.
pub trait LocalEngine: Send + Sync {
    fn generate(&self, prompt: &str, options: &GenerateOptions)
        -> Result<String, LocalProviderError>;
}

/// Загрузчик движка по пути к GGUF.
pub trait EngineLoader: Send + Sync {
    /// Может ли загрузчик вообще поднять модель. `false` — не качать GGUF зря.
    fn is_supported(&self) -> bool {
        true
    }

    fn load(
        &self,
        path: &Path,
        config: &LocalConfig,
    ) -> Result<Arc<dyn LocalEngine>, LocalProviderError>;
}

/// Загрузчик по умолчанию: llama.cpp, если собран с feature `llama`.
#[derive(Default)]
pub struct DefaultLoader {
    #[cfg(feature = "llama")]
    llama: llama::LlamaLoader,
}

impl EngineLoader for DefaultLoader {
    fn is_supported(&self) -> bool {
        cfg!(feature = "llama")
    }

    #[cfg(feature = "llama")]
    fn load(
        &self,
        path: &Path,
        config: &LocalConfig,
    ) -> Result<Arc<dyn LocalEngine>, LocalProviderError> {
        self.llama.load(path, config)
    }

    #[cfg(not(feature = "llama"))]
    fn load(
        &self,
        _path: &Path,
        _config: &LocalConfig,
    ) -> Result<Arc<dyn LocalEngine>, LocalProviderError> {
        Err(LocalProviderError::BackendMissing)
    }
}

#[cfg(feature = "llama")]
mod llama {
    use std::num::NonZeroU32;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ai_providers::GenerateOptions;
    use llama_cpp_2::context::params::LlamaContextParams;
    use llama_cpp_2::llama_backend::LlamaBackend;
    use llama_cpp_2::llama_batch::LlamaBatch;
    use llama_cpp_2::model::params::LlamaModelParams;
    use llama_cpp_2::model::{AddBos, LlamaModel};
    use llama_cpp_2::sampling::LlamaSampler;

    use super::{EngineLoader, LocalEngine};
    use crate::config::LocalConfig;
    use crate::error::LocalProviderError;

    /// Максимум токенов в одном batch для decode (ограничение llama.cpp).
    const PREFILL_BATCH_SIZE: usize = 512;
    const SAMPLER_SEED: u32 = 1234;

    /// llama.cpp backend инициализируется один раз на процесс; модели меняются.
    #[derive(Default)]
    pub struct LlamaLoader {
        backend: Mutex<Option<Arc<LlamaBackend>>>,
    }

    impl LlamaLoader {
        fn backend(&self) -> Result<Arc<LlamaBackend>, LocalProviderError> {
            let mut guard = self
                .backend
                .lock()
                .map_err(|e| LocalProviderError::ModelLoadFailed(e.to_string()))?;
            if let Some(ref b) = *guard {
                return Ok(Arc::clone(b));
            }
            let backend = Arc::new(
                LlamaBackend::init()
                    .map_err(|e| LocalProviderError::ModelLoadFailed(e.to_string()))?,
            );
            *guard = Some(Arc::clone(&backend));
            Ok(backend)
        }
    }

    impl EngineLoader for LlamaLoader {
        fn load(
            &self,
            path: &Path,
            config: &LocalConfig,
        ) -> Result<Arc<dyn LocalEngine>, LocalProviderError> {
            let backend = self.backend()?;
            let model_params = LlamaModelParams::default();
            let model = LlamaModel::load_from_file(&backend, path, &model_params)
                .map_err(|e| LocalProviderError::ModelLoadFailed(e.to_string()))?;
            Ok(Arc::new(LlamaEngine {
                backend,
                model,
                context_size: config.context_size,
                n_threads: config.n_threads,
            }))
        }
    }

    pub struct LlamaEngine {
        backend: Arc<LlamaBackend>,
        model: LlamaModel,
        context_size: usize,
        n_threads: usize,
    }

    fn inference_err(e: impl std::fmt::Display) -> LocalProviderError {
        LocalProviderError::InferenceFailed(e.to_string())
    }

    impl LocalEngine for LlamaEngine {
        fn generate(
            &self,
            prompt: &str,
            options: &GenerateOptions,
        ) -> Result<String, LocalProviderError> {
            let ctx_size = self
                .context_size
                .min(options.max_tokens + prompt.len() / 4 + 256);
            let n_ctx = NonZeroU32::new(ctx_size as u32)
                .or(NonZeroU32::new(2048))
                .ok_or_else(|| inference_err("Invalid context size"))?;

            let n_threads = self.n_threads as i32;
            let ctx_params = LlamaContextParams::default()
                .with_n_ctx(Some(n_ctx))
                .with_n_threads(n_threads)
                .with_n_threads_batch(n_threads);

            let mut ctx = self
                .model
                .new_context(&self.backend, ctx_params)
                .map_err(inference_err)?;

            let tokens_list = self
                .model
                .str_to_token(prompt, AddBos::Always)
                .map_err(inference_err)?;

            let mut batch = LlamaBatch::new(PREFILL_BATCH_SIZE, 1);
            let n_tokens = tokens_list.len();
            let last_pos = (n_tokens as i32).saturating_sub(1);

            // Prefill по чанкам, иначе "Insufficient Space of 512".
            let mut pos = 0i32;
            for chunk in tokens_list.chunks(PREFILL_BATCH_SIZE) {
                batch.clear();
                for (j, &token) in chunk.iter().enumerate() {
                    let p = pos + j as i32;
                    batch.add(token, p, &[0], p == last_pos).map_err(inference_err)?;
                }
                ctx.decode(&mut batch).map_err(inference_err)?;
                pos += chunk.len() as i32;
            }

            let mut sampler = LlamaSampler::chain_simple([
                LlamaSampler::top_p(options.top_p, 1),
                LlamaSampler::temp(options.temperature),
                LlamaSampler::dist(SAMPLER_SEED),
            ]);

            let mut output = String::new();
            // Один декодер на весь ответ: многобайтовый символ бывает разрезан между токенами.
            let mut decoder = encoding_rs::UTF_8.new_decoder();
            let mut n_cur = n_tokens as i32;

            for _ in 0..options.max_tokens {
                let token = sampler.sample(&ctx, batch.n_tokens() - 1);
                sampler.accept(token);

                if self.model.is_eog_token(token) {
                    break;
                }

                let piece = self
                    .model
                    .token_to_piece(token, &mut decoder, true, None)
                    .map_err(inference_err)?;
                output.push_str(&piece);

                batch.clear();
                batch.add(token, n_cur, &[0], true).map_err(inference_err)?;
                n_cur += 1;

                ctx.decode(&mut batch).map_err(inference_err)?;
            }

            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "llama"))]
    #[test]
    fn test_default_loader_without_backend() {
        let loader = DefaultLoader::default();
        assert!(!loader.is_supported());
        let err = loader
            .load(Path::new("model.gguf"), &LocalConfig::default_config())
            .err()
            .expect("no backend compiled in");
        assert!(matches!(err, LocalProviderError::BackendMissing));
    }

    /// Так генерация склеивает куски токенов: "Æther" — C3 86 разрезан между токенами.
    #[test]
    fn test_shared_decoder_joins_split_codepoint() {
        let pieces: [&[u8]; 3] = [b"\xC3", b"\x86the", b"r Vial"];
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        let mut output = String::new();
        for bytes in pieces {
            let mut piece = String::with_capacity(32);
            let (_, read, replaced) = decoder.decode_to_string(bytes, &mut piece, false);
            assert_eq!(read, bytes.len());
            assert!(!replaced);
            output.push_str(&piece);
        }
        assert_eq!(output, "Æther Vial");

        // Отдельный декодер на каждый токен теряет символ.
        let mut lossy = String::new();
        for bytes in pieces {
            lossy.push_str(&String::from_utf8_lossy(bytes));
        }
        assert_ne!(lossy, "Æther Vial");
    }
}
