//! Backend Core — общие сервисы сервера: отладочный лог, мониторинг ресурсов, валидация запросов.

pub mod command_router;
pub mod logs;
pub mod monitor;

pub use command_router::{ChatTurn, CommandRouter, RouterError};
pub use logs::{ensure_logs_dir, logs_dir, DebugLog, LogLevel, MAX_LOG_LINES};
pub use monitor::{spawn_monitor, ResourceMonitor, ResourceSample, DEFAULT_POLL_INTERVAL};
