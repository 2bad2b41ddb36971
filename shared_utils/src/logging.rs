//! 日志初始化
//!
//! 两个输出层共用一个 `EnvFilter`：
//! - 文件层：`{log_dir}/{program}.log.YYYY-MM-DD`，按天轮转，带 target/线程/行号
//! - stderr 层：无时间戳的简洁进度行
//!
//! `RUST_LOG` 存在时覆盖配置的级别。
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig};
//!
//! init_logging("vid_shrink", LogConfig::default()).expect("logging");
//! tracing::info!("ready");
//! ```

use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Lines of encoder stderr kept in the log when a tool run fails
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 默认为系统临时目录
    pub log_dir: PathBuf,
    /// Rotated files kept per program
    pub keep_files: usize,
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir(),
            keep_files: 5,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_keep_files(mut self, count: usize) -> Self {
        self.keep_files = count;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// `target=LEVEL` for every crate we own, comma separated
fn filter_directive(targets: &[&str], level: Level) -> String {
    targets
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {}", config.log_dir.display()))?;

    let file_prefix = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &file_prefix);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(filter_directive(
            &[program_name, "shared_utils"],
            config.level,
        )),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match prune_logs(&config.log_dir, &file_prefix, config.keep_files) {
        Ok(0) => {}
        Ok(removed) => tracing::debug!(removed, "Pruned old log files"),
        Err(e) => tracing::warn!(error = %e, "Could not prune old log files"),
    }
    tracing::debug!(
        log_dir = %config.log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );
    Ok(())
}

/// 删除 `prefix` 开头的旧日志，只保留最新的 `keep` 个；返回删除数量
fn prune_logs(log_dir: &Path, prefix: &str, keep: usize) -> std::io::Result<usize> {
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some((meta.modified().ok()?, entry.path()))
        })
        .collect();

    if logs.len() <= keep {
        return Ok(0);
    }
    logs.sort_by_key(|(modified, _)| Reverse(*modified));

    let mut removed = 0;
    for (_, path) in logs.into_iter().skip(keep) {
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove old log"),
        }
    }
    Ok(removed)
}

/// Last `max_lines` lines of a tool's output
fn tail(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    lines[lines.len().saturating_sub(max_lines)..].join("\n")
}

/// 记录一次外部工具调用：完整命令行、耗时、退出码；失败时附带 stderr 末尾
pub fn log_external_tool(
    tool_name: &str,
    args: &[String],
    output: &str,
    exit_code: Option<i32>,
    elapsed: Duration,
) {
    let command = format!("{} {}", tool_name, args.join(" "));
    let secs = elapsed.as_secs_f64();

    if exit_code == Some(0) {
        tracing::debug!(command = %command, elapsed_secs = secs, "{} finished", tool_name);
        tracing::trace!(output = %output, "{} output", tool_name);
    } else {
        tracing::debug!(
            command = %command,
            elapsed_secs = secs,
            exit_code = ?exit_code,
            stderr_tail = %tail(output, STDERR_TAIL_LINES),
            "{} failed",
            tool_name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builders() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig::default()
            .with_log_dir(dir.path())
            .with_keep_files(3)
            .with_level(Level::DEBUG);
        assert_eq!(config.log_dir, dir.path());
        assert_eq!(config.keep_files, 3);
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(LogConfig::default().keep_files, 5);
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(
            filter_directive(&["vid_shrink", "shared_utils"], Level::DEBUG),
            "vid_shrink=DEBUG,shared_utils=DEBUG"
        );
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for day in 1..=6 {
            let path = dir.path().join(format!("vid_shrink.log.2026-03-{:02}", day));
            fs::write(&path, "x").unwrap();
            let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_770_000_000 + day * 86_400);
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(stamp)
                .unwrap();
        }
        fs::write(dir.path().join("unrelated.log"), "keep").unwrap();

        let removed = prune_logs(dir.path(), "vid_shrink.log", 2).unwrap();
        assert_eq!(removed, 4);
        assert!(dir.path().join("vid_shrink.log.2026-03-06").exists());
        assert!(dir.path().join("vid_shrink.log.2026-03-05").exists());
        assert!(!dir.path().join("vid_shrink.log.2026-03-01").exists());
        assert!(dir.path().join("unrelated.log").exists());
    }

    #[test]
    fn test_prune_under_limit_is_noop() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("vid_shrink.log.2026-03-01"), "x").unwrap();
        assert_eq!(prune_logs(dir.path(), "vid_shrink.log", 5).unwrap(), 0);
    }

    #[test]
    fn test_tail() {
        let output = "a\nb\nc\nd";
        assert_eq!(tail(output, 2), "c\nd");
        assert_eq!(tail(output, 10), output);
        assert_eq!(tail("", 3), "");
    }
}
