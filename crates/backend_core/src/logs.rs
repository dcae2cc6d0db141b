//! Отладочный лог: кольцевой буфер последних записей для UI + зеркало в tracing.
//!
//! Опционально дублируется в файл (`confidant.log` в директории логов).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Сколько строк хранит буфер.
pub const MAX_LOG_LINES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Директория логов по умолчанию: ~/.smart_confidant/logs.
pub fn logs_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".smart_confidant").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".smart_confidant").join("logs"))
}

/// Создаёт директорию логов при необходимости.
pub fn ensure_logs_dir(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

/// Потокобезопасный буфер из не более чем `capacity` строк `[HH:MM:SS] [LEVEL] message`.
pub struct DebugLog {
    entries: Mutex<VecDeque<String>>,
    capacity: usize,
    file: Option<PathBuf>,
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_LINES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            file: None,
        }
    }

    /// Дублировать записи в `dir/confidant.log`.
    pub fn with_file(mut self, dir: &Path) -> std::io::Result<Self> {
        let dir = ensure_logs_dir(dir)?;
        self.file = Some(dir.join("confidant.log"));
        Ok(self)
    }

    pub fn push(&self, level: LogLevel, message: impl AsRef<str>) {
        let message = message.as_ref();
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] [{}] {}", timestamp, level.as_str(), message);

        match level {
            LogLevel::Info => tracing::info!(target: "confidant", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "confidant", "{}", message),
            LogLevel::Error => tracing::error!(target: "confidant", "{}", message),
        }

        if let Some(ref path) = self.file {
            append_line(path, &entry);
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.push(LogLevel::Error, message);
    }

    /// Копия буфера, от старых к новым.
    pub fn snapshot(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }

    /// Буфер одной строкой (для текстового поля UI).
    pub fn render(&self) -> String {
        self.snapshot().join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn append_line(path: &Path, line: &str) {
    use std::io::Write;
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{}", line));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_entry_format() {
        let log = DebugLog::new();
        log.warn("HF_TOKEN missing");
        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        // [HH:MM:SS] [WARN] HF_TOKEN missing
        let entry = &entries[0];
        assert_eq!(&entry[0..1], "[");
        assert_eq!(&entry[9..10], "]");
        assert!(entry.ends_with("] [WARN] HF_TOKEN missing"));
    }

    #[test]
    fn test_buffer_never_exceeds_cap() {
        let log = DebugLog::new();
        for i in 0..250 {
            log.info(format!("line {i}"));
            assert!(log.len() <= MAX_LOG_LINES);
        }
        let entries = log.snapshot();
        assert_eq!(entries.len(), MAX_LOG_LINES);
        assert!(entries[0].ends_with("line 150"));
        assert!(entries[MAX_LOG_LINES - 1].ends_with("line 249"));
    }

    #[test]
    fn test_concurrent_pushes_respect_cap() {
        let log = Arc::new(DebugLog::with_capacity(10));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.error(format!("t{t} e{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(log.len(), 10);
    }

    #[test]
    fn test_file_mirror() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let log = DebugLog::new()
            .with_file(&tmp.path().join("logs"))
            .expect("log dir");
        log.info("Smart Confidant Starting");
        let written = std::fs::read_to_string(tmp.path().join("logs").join("confidant.log"))
            .expect("log file");
        assert!(written.contains("[INFO] Smart Confidant Starting"));
    }
}
