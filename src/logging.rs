//! Logging Module
//!
//! Sets up the `tracing` subscriber. Console output always goes to stderr;
//! debug mode adds a daily-rolling log file under `.voicebatch/logs/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const LOG_FILE_PREFIX: &str = "voicebatch.log";

/// Logging setup options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write a rolling log file in addition to console output
    pub debug_mode: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Default filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            debug_mode: false,
            log_dir: default_log_dir(),
            level: "info".to_string(),
        }
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    fn filter(&self) -> EnvFilter {
        let default = if self.debug_mode {
            "debug".to_string()
        } else {
            self.level.clone()
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    }
}

/// Default log directory: `./.voicebatch/logs`
pub fn default_log_dir() -> PathBuf {
    PathBuf::from(".voicebatch").join("logs")
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the lifetime of the process.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, String> {
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if config.debug_mode {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| format!("Failed to create log dir {:?}: {}", config.log_dir, e))?;

        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(config.filter())
            .with(console)
            .with(file)
            .try_init()
            .map_err(|e| e.to_string())?;

        tracing::debug!("File logging enabled in {:?}", config.log_dir);
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(console)
            .try_init()
            .map_err(|e| e.to_string())?;
        Ok(None)
    }
}

/// List log files in `dir`, newest first.
pub fn list_log_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if is_log && path.is_file() {
            let modified = entry.metadata()?.modified()?;
            files.push((modified, path));
        }
    }
    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

/// Delete log files older than `max_age_days` from the default log dir.
pub fn cleanup_old_logs(max_age_days: u64) -> std::io::Result<usize> {
    cleanup_logs_in(&default_log_dir(), max_age_days)
}

/// Delete log files older than `max_age_days` from `dir`.
pub fn cleanup_logs_in(dir: &Path, max_age_days: u64) -> std::io::Result<usize> {
    let max_age = Duration::from_secs(max_age_days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    for path in list_log_files(dir)? {
        let modified = fs::metadata(&path)?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_debug_mode(true)
            .with_log_dir(PathBuf::from("/tmp/vb-logs"))
            .with_level("warn");
        assert!(config.debug_mode);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/vb-logs"));
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn test_list_log_files_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("voicebatch.log.2026-10-01"), "a").unwrap();
        fs::write(dir.path().join("notes.txt"), "b").unwrap();

        let files = list_log_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("voicebatch.log.2026-10-01"));
    }

    #[test]
    fn test_list_log_files_missing_dir() {
        let files = list_log_files(Path::new("/definitely/not/here")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_cleanup_keeps_fresh_logs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("voicebatch.log.today"), "fresh").unwrap();

        let removed = cleanup_logs_in(dir.path(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("voicebatch.log.today").exists());
    }
}
