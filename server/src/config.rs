//! Конфигурация: переменные окружения (+ .env) и ~/.smart_confidant/config.json.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use backend_core::logs_dir;
use hf_provider::{API_MODELS, DEFAULT_BASE_URL, TOKEN_ENV};
use local_provider::{local_model_options, LocalConfig, DEFAULT_HUB_URL};

pub const TITLE: &str = "🎓🧙🏻‍♂️ Smart Confidant 🧙🏻‍♂️🎓";
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are an expert assistant for Magic: The Gathering. You're name is Smart Confidant, but people tend to call you Bob.";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

const CONFIG_FILE: &str = "config.json";
const BACKGROUND_IMAGE: &str = "confidant_pattern.png";
const ASSETS_DIR: &str = "assets";

/// Слайдер настроек: диапазон, шаг, значение по умолчанию.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Slider {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationDefaults {
    pub max_tokens: Slider,
    pub temperature: Slider,
    pub top_p: Slider,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: Slider {
                min: 1.0,
                max: 2048.0,
                step: 1.0,
                value: 512.0,
            },
            temperature: Slider {
                min: 0.1,
                max: 2.0,
                step: 0.1,
                value: 0.7,
            },
            top_p: Slider {
                min: 0.1,
                max: 1.0,
                step: 0.05,
                value: 0.95,
            },
        }
    }
}

/// Необязательный файл конфигурации.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Дополнительные API-модели (добавляются к встроенным).
    #[serde(default)]
    pub api_models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),
    #[error("config file {path}: {reason}")]
    File { path: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub hf_token: Option<String>,
    pub hf_base_url: String,
    pub models_dir: PathBuf,
    pub hub_url: String,
    pub assets_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub api_models: Vec<String>,
    pub system_message: String,
    pub defaults: GenerationDefaults,
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".smart_confidant")
        .join(CONFIG_FILE)
}

/// Первый существующий каталог из кандидатов; если нет ни одного — последний.
pub fn first_existing_dir(candidates: Vec<PathBuf>) -> PathBuf {
    let fallback = candidates.last().cloned().unwrap_or_else(|| PathBuf::from(ASSETS_DIR));
    candidates
        .into_iter()
        .find(|dir| dir.is_dir())
        .unwrap_or(fallback)
}

/// assets рядом с бинарником (образ), в рабочей директории, в корне workspace, в исходниках.
pub fn default_assets_dir() -> PathBuf {
    let mut candidates = Vec::new();
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(ASSETS_DIR));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(ASSETS_DIR));
        candidates.push(cwd.join("server").join(ASSETS_DIR));
    }
    candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(ASSETS_DIR));
    first_existing_dir(candidates)
}

/// Читает файл конфигурации. Отсутствие файла — не ошибка.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let file_err = |reason: String| ConfigError::File {
        path: path.display().to_string(),
        reason,
    };
    let s = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
    serde_json::from_str(&s).map_err(|e| file_err(e.to_string()))
}

impl AppConfig {
    /// Загружает .env, окружение и файл конфигурации.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let file = load_file_config(&config_path())?;
        Self::from_lookup(|key| std::env::var(key).ok(), file)
    }

    /// Сборка из произвольного источника переменных (в тестах — без окружения процесса).
    pub fn from_lookup<F>(env: F, file: FileConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let mut api_models: Vec<String> = API_MODELS.iter().map(|m| m.to_string()).collect();
        for model in file.api_models {
            if !api_models.contains(&model) {
                api_models.push(model);
            }
        }

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            hf_token: non_empty(TOKEN_ENV),
            hf_base_url: non_empty("HF_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            models_dir: non_empty("CONFIDANT_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(LocalConfig::default_models_dir),
            hub_url: non_empty("CONFIDANT_HUB_URL")
                .unwrap_or_else(|| DEFAULT_HUB_URL.to_string()),
            assets_dir: non_empty("CONFIDANT_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_assets_dir),
            log_dir: non_empty("CONFIDANT_LOG_DIR").map(PathBuf::from).or_else(|| {
                non_empty("CONFIDANT_FILE_LOG")
                    .filter(|v| matches!(v.trim(), "1" | "true" | "yes"))
                    .map(|_| logs_dir())
            }),
            api_models,
            system_message: file
                .system_message
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
            defaults: GenerationDefaults::default(),
        })
    }

    /// Все модели для выбора в UI: сначала API, затем локальные.
    pub fn model_options(&self) -> Vec<String> {
        let mut models = self.api_models.clone();
        models.extend(local_model_options());
        models
    }

    pub fn background_image(&self) -> PathBuf {
        self.assets_dir.join(BACKGROUND_IMAGE)
    }

    pub fn has_token(&self) -> bool {
        self.hf_token.is_some()
    }
}
