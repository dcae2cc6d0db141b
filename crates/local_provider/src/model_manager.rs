//! Загрузка и поиск GGUF-файлов локальных моделей.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{hf_resolve_url, LocalConfig, LocalModelSpec, LOCAL_MODELS};
use crate::error::LocalProviderError;

/// Прогресс загрузки.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DownloadProgress {
    pub bytes_done: u64,
    pub bytes_total: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub path: PathBuf,
}

/// Управление локальными GGUF-моделями.
pub struct ModelManager {
    config: LocalConfig,
    /// Одна установка за раз: параллельные запросы к той же модели ждут первую загрузку.
    install_lock: Mutex<()>,
}

impl ModelManager {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            config,
            install_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    /// Путь к GGUF-файлу, если он уже скачан.
    pub fn find_gguf_path(&self, entry: &LocalModelSpec) -> Option<PathBuf> {
        let path = self.config.model_dir(entry).join(entry.file);
        path.is_file().then_some(path)
    }

    /// Убедиться, что модель скачана. Скачивает при необходимости.
    pub async fn ensure_model_installed<F>(
        &self,
        entry: &LocalModelSpec,
        mut on_progress: F,
    ) -> Result<PathBuf, LocalProviderError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        if let Some(path) = self.find_gguf_path(entry) {
            return Ok(path);
        }
        let _guard = self.install_lock.lock().await;
        // Пока ждали замок, модель мог скачать другой запрос.
        if let Some(path) = self.find_gguf_path(entry) {
            return Ok(path);
        }
        self.download_from_huggingface(entry, &mut on_progress).await
    }

    /// Скачать GGUF с хаба. Пишет во временный `.part`, затем переименовывает.
    /// При ошибке `.part` удаляется.
    pub async fn download_from_huggingface<F>(
        &self,
        entry: &LocalModelSpec,
        on_progress: &mut F,
    ) -> Result<PathBuf, LocalProviderError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let target_dir = self.config.model_dir(entry);
        tokio::fs::create_dir_all(&target_dir).await?;
        let out_path = target_dir.join(entry.file);
        let part_path = target_dir.join(format!("{}.part", entry.file));

        if let Err(e) = self.fetch_to_part(entry, &part_path, on_progress).await {
            if let Err(rm) = tokio::fs::remove_file(&part_path).await {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %part_path.display(), "failed to remove partial download: {rm}");
                }
            }
            return Err(e);
        }

        tokio::fs::rename(&part_path, &out_path).await?;
        self.write_metadata(entry, &target_dir)?;
        info!(path = %out_path.display(), "local model installed");
        Ok(out_path)
    }

    async fn fetch_to_part<F>(
        &self,
        entry: &LocalModelSpec,
        part_path: &Path,
        on_progress: &mut F,
    ) -> Result<(), LocalProviderError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let url = hf_resolve_url(&self.config.hub_url, entry.repo_id, entry.file);
        info!(%url, "downloading local model");

        // Общего таймаута нет: гигабайтный файл качается долго.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LocalProviderError::DownloadFailed(e.to_string()))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| LocalProviderError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocalProviderError::DownloadFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let bytes_total = response
            .content_length()
            .unwrap_or((entry.size_gb * 1024.0 * 1024.0 * 1024.0) as u64);
        let mut bytes_done: u64 = 0;

        let mut file = tokio::fs::File::create(part_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LocalProviderError::DownloadFailed(e.to_string()))?;
            file.write_all(&chunk).await?;
            bytes_done += chunk.len() as u64;
            on_progress(DownloadProgress {
                bytes_done,
                bytes_total,
            });
        }
        file.flush().await?;
        Ok(())
    }

    /// metadata.json рядом с моделью: откуда скачана.
    fn write_metadata(&self, entry: &LocalModelSpec, dir: &Path) -> Result<(), LocalProviderError> {
        let metadata = serde_json::json!({
            "name": entry.name,
            "repo_id": entry.repo_id,
            "file": entry.file,
            "source": &self.config.hub_url,
        });
        let pretty = serde_json::to_string_pretty(&metadata)
            .map_err(|e| LocalProviderError::DownloadFailed(e.to_string()))?;
        std::fs::write(dir.join("metadata.json"), pretty)?;
        Ok(())
    }

    /// Скачанные модели из каталога.
    pub fn list_installed(&self) -> Vec<ModelInfo> {
        LOCAL_MODELS
            .iter()
            .filter_map(|entry| {
                self.find_gguf_path(entry).map(|path| ModelInfo {
                    name: entry.display_name(),
                    path,
                })
            })
            .collect()
    }
}
