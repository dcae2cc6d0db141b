//! Слот для одной загруженной модели: держим последнюю, меняем при смене имени.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::LocalConfig;
use crate::error::LocalProviderError;
use crate::inference::{EngineLoader, LocalEngine};

struct Loaded {
    name: String,
    engine: Arc<dyn LocalEngine>,
}

#[derive(Default)]
pub struct ModelSlot {
    current: Mutex<Option<Loaded>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Имя модели в слоте.
    pub async fn current_name(&self) -> Option<String> {
        self.current.lock().await.as_ref().map(|l| l.name.clone())
    }

    /// Возвращает движок для `name`: из слота, если имя совпало, иначе загружает и заменяет.
    /// Загрузка идёт под блокировкой, чтобы два запроса не грузили модель параллельно.
    pub async fn get_or_load(
        &self,
        name: &str,
        path: &Path,
        loader: Arc<dyn EngineLoader>,
        config: &LocalConfig,
    ) -> Result<Arc<dyn LocalEngine>, LocalProviderError> {
        let mut guard = self.current.lock().await;
        if let Some(ref loaded) = *guard {
            if loaded.name == name {
                return Ok(Arc::clone(&loaded.engine));
            }
        }

        // Старую модель отпускаем до загрузки новой: две в памяти не держим.
        if let Some(previous) = guard.take() {
            info!(previous = %previous.name, next = %name, "evicting local model");
        }

        let path = path.to_path_buf();
        let config = config.clone();
        let engine = tokio::task::spawn_blocking(move || loader.load(&path, &config))
            .await
            .map_err(|e| LocalProviderError::ModelLoadFailed(e.to_string()))??;

        info!(model = %name, "local model loaded");
        *guard = Some(Loaded {
            name: name.to_string(),
            engine: Arc::clone(&engine),
        });
        Ok(engine)
    }
}
