//! Конфигурация: каталог локальных моделей (GGUF из HuggingFace), лимиты, директории.

use std::path::PathBuf;

use sysinfo::System;

/// Суффикс, по которому имя модели в UI считается локальной.
pub const LOCAL_SUFFIX: &str = " (local)";

/// Локальная модель: базовое имя + GGUF-файл на HuggingFace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalModelSpec {
    /// Имя исходной модели, без суффикса.
    pub name: &'static str,
    pub repo_id: &'static str,
    pub file: &'static str,
    pub size_gb: f64,
}

impl LocalModelSpec {
    /// Имя для списка моделей в UI.
    pub fn display_name(&self) -> String {
        format!("{}{}", self.name, LOCAL_SUFFIX)
    }

    /// Поддиректория в models_dir: `owner--repo`.
    pub fn dir_name(&self) -> String {
        self.repo_id.replace('/', "--")
    }
}

pub const LOCAL_MODELS: &[LocalModelSpec] = &[
    LocalModelSpec {
        name: "HuggingFaceTB/SmolLM2-1.7B-Instruct",
        repo_id: "HuggingFaceTB/SmolLM2-1.7B-Instruct-GGUF",
        file: "smollm2-1.7b-instruct-q4_k_m.gguf",
        size_gb: 1.1,
    },
    LocalModelSpec {
        name: "Qwen/Qwen2.5-0.5B-Instruct",
        repo_id: "Qwen/Qwen2.5-0.5B-Instruct-GGUF",
        file: "qwen2.5-0.5b-instruct-q4_k_m.gguf",
        size_gb: 0.4,
    },
];

pub fn is_local(model: &str) -> bool {
    model.ends_with(LOCAL_SUFFIX)
}

pub fn strip_local_suffix(model: &str) -> &str {
    model.strip_suffix(LOCAL_SUFFIX).unwrap_or(model)
}

/// Ищет модель в каталоге по имени (с суффиксом или без).
pub fn find_local_model(model: &str) -> Option<&'static LocalModelSpec> {
    let name = strip_local_suffix(model);
    LOCAL_MODELS.iter().find(|m| m.name == name)
}

/// Имена локальных моделей для UI.
pub fn local_model_options() -> Vec<String> {
    LOCAL_MODELS.iter().map(LocalModelSpec::display_name).collect()
}

pub const DEFAULT_CONTEXT_SIZE: usize = 4096;
pub const DEFAULT_MAX_TOKENS: usize = 2048;

pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

/// URL для скачивания файла из репозитория на хабе (HuggingFace или зеркало).
pub fn hf_resolve_url(hub_url: &str, repo_id: &str, path: &str) -> String {
    format!(
        "{}/{repo_id}/resolve/main/{path}",
        hub_url.trim_end_matches('/')
    )
}

/// Потоки для llama.cpp: физические ядра; если sysinfo их не знает, логические.
pub fn inference_threads() -> usize {
    System::physical_core_count()
        .filter(|&n| n > 0)
        .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(4)
}

#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct LocalConfig {
    pub models_dir: PathBuf,
    /// Откуда качать GGUF: `{hub_url}/{repo}/resolve/main/{file}`.
    pub hub_url: String,
    pub context_size: usize,
    pub max_tokens: usize,
    pub n_threads: usize,
}

impl LocalConfig {
    pub fn default_models_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smart_confidant")
            .join("models")
    }

    pub fn default_config() -> Self {
        Self {
            models_dir: Self::default_models_dir(),
            hub_url: DEFAULT_HUB_URL.to_string(),
            context_size: DEFAULT_CONTEXT_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            n_threads: inference_threads(),
        }
    }

    pub fn with_models_dir(path: PathBuf) -> Self {
        Self {
            models_dir: path,
            ..Self::default_config()
        }
    }

    /// Директория конкретной модели.
    pub fn model_dir(&self, entry: &LocalModelSpec) -> PathBuf {
        self.models_dir.join(entry.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_detection() {
        assert!(is_local("Qwen/Qwen2.5-0.5B-Instruct (local)"));
        assert!(!is_local("meta-llama/Llama-3.2-3B-Instruct"));
        assert!(!is_local("local"));
        assert_eq!(
            strip_local_suffix("Qwen/Qwen2.5-0.5B-Instruct (local)"),
            "Qwen/Qwen2.5-0.5B-Instruct"
        );
    }

    #[test]
    fn test_catalog_lookup() {
        let entry = find_local_model("HuggingFaceTB/SmolLM2-1.7B-Instruct (local)")
            .expect("smollm2 in catalog");
        assert_eq!(entry.dir_name(), "HuggingFaceTB--SmolLM2-1.7B-Instruct-GGUF");
        assert!(find_local_model("unknown/model (local)").is_none());
        assert!(local_model_options().iter().all(|n| is_local(n)));
    }

    #[test]
    fn test_resolve_url_respects_hub() {
        let entry = &LOCAL_MODELS[1];
        let url = hf_resolve_url(DEFAULT_HUB_URL, entry.repo_id, entry.file);
        assert!(url.starts_with("https://huggingface.co/Qwen/Qwen2.5-0.5B-Instruct-GGUF/resolve/main/"));
        assert!(url.ends_with(entry.file));
        assert_eq!(
            hf_resolve_url("http://127.0.0.1:9000/", "a/b", "m.gguf"),
            "http://127.0.0.1:9000/a/b/resolve/main/m.gguf"
        );
    }

    #[test]
    fn test_default_config_threads() {
        let config = LocalConfig::default_config();
        assert!(config.n_threads >= 1);
        assert_eq!(config.n_threads, inference_threads());
        assert_eq!(config.hub_url, DEFAULT_HUB_URL);
    }
}
