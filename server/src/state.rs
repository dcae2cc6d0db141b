//! Состояние приложения: конфиг, диспетчер, провайдеры, лог.

use std::sync::Arc;

use ai_providers::AiProvider;
use ai_runtime::ChatDispatcher;
use backend_core::{CommandRouter, DebugLog};
use hf_provider::{HfProvider, TokenSource};
use local_provider::{LocalConfig, LocalProvider};

use crate::config::{AppConfig, TITLE};
use crate::ui::{background_data_url, custom_css, render_page};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub router: Arc<CommandRouter>,
    pub log: Arc<DebugLog>,
    pub local: Arc<LocalProvider>,
    pub page: Arc<String>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let log = match config.log_dir {
            Some(ref dir) => DebugLog::new().with_file(dir)?,
            None => DebugLog::new(),
        };
        let log = Arc::new(log);

        let remote = HfProvider::with_base_url(
            TokenSource::new(config.hf_token.clone()),
            &config.hf_base_url,
        )?;
        let mut local_config = LocalConfig::with_models_dir(config.models_dir.clone());
        local_config.hub_url = config.hub_url.clone();
        let local = Arc::new(LocalProvider::new(local_config));

        Ok(Self::with_providers(config, Arc::new(remote), local, log))
    }

    /// Сборка с готовыми провайдерами (в тестах — подменные удалённые).
    pub fn with_providers(
        config: AppConfig,
        remote: Arc<dyn AiProvider>,
        local: Arc<LocalProvider>,
        log: Arc<DebugLog>,
    ) -> Self {
        let background = match background_data_url(&config.background_image()) {
            Ok(url) => {
                log.info("Background image loaded successfully");
                url
            }
            Err(e) => {
                log.error(format!("Error loading background image: {}", e));
                String::new()
            }
        };
        let page = render_page(TITLE, &custom_css(&background));

        let local_dyn: Arc<dyn AiProvider> = local.clone();
        let dispatcher = ChatDispatcher::new(remote, local_dyn, Arc::clone(&log));
        let router = CommandRouter::new(config.model_options());

        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            router: Arc::new(router),
            log,
            local,
            page: Arc::new(page),
        }
    }
}
