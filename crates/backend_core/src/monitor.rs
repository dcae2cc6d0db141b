//! Фоновый опрос CPU и памяти процесса и системы.
//!
//! С запросами не взаимодействует; живёт до abort() или выхода процесса.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;

use crate::logs::DebugLog;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ResourceSample {
    pub process_cpu_percent: f32,
    pub process_memory_mb: f64,
    pub system_cpu_percent: f32,
    pub system_memory_used_mb: f64,
    pub system_memory_total_mb: f64,
}

impl ResourceSample {
    pub fn describe(&self) -> String {
        format!(
            "Resources | process CPU {:.1}% RAM {:.0} MB | system CPU {:.1}% RAM {:.0}/{:.0} MB",
            self.process_cpu_percent,
            self.process_memory_mb,
            self.system_cpu_percent,
            self.system_memory_used_mb,
            self.system_memory_total_mb,
        )
    }
}

pub struct ResourceMonitor {
    sys: System,
    pid: Option<Pid>,
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceMonitor {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Снимок. CPU считается как дельта между вызовами; первый замер может быть 0.
    pub fn sample(&mut self) -> ResourceSample {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();

        let (process_cpu_percent, process_memory_mb) = match self.pid {
            Some(pid) => {
                self.sys
                    .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                self.sys
                    .process(pid)
                    .map(|p| (p.cpu_usage(), p.memory() as f64 / MB))
                    .unwrap_or((0.0, 0.0))
            }
            None => (0.0, 0.0),
        };

        ResourceSample {
            process_cpu_percent,
            process_memory_mb,
            system_cpu_percent: self.sys.global_cpu_usage(),
            system_memory_used_mb: self.sys.used_memory() as f64 / MB,
            system_memory_total_mb: self.sys.total_memory() as f64 / MB,
        }
    }
}

/// Запускает опрос каждые `interval`, пишет строку в лог на каждый замер.
pub fn spawn_monitor(log: Arc<DebugLog>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut monitor = ResourceMonitor::new();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let sample = monitor.sample();
            log.info(sample.describe());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_reports_memory() {
        let mut monitor = ResourceMonitor::new();
        let sample = monitor.sample();
        assert!(sample.system_memory_total_mb > 0.0);
        assert!(sample.system_memory_used_mb <= sample.system_memory_total_mb);
        assert!(sample.describe().starts_with("Resources | process CPU"));
    }

    #[tokio::test]
    async fn test_monitor_logs_until_aborted() {
        let log = Arc::new(DebugLog::new());
        let handle = spawn_monitor(Arc::clone(&log), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();
        let _ = handle.await;
        let count = log.len();
        assert!(count >= 1);
        assert!(log.snapshot()[0].contains("[INFO] Resources"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(log.len(), count);
    }
}
