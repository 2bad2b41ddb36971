//! FFmpeg 子进程：stderr 排空 + 有界等待
//!
//! ffmpeg 会往 stderr 写大量进度行。管道满（通常 64KB）而没人读时 ffmpeg 会阻塞，
//! 父进程就永远等不到退出。所以 stderr 总是交给独立线程读完。
//!
//! `wait_with_timeout` 轮询 `try_wait`；到期后 kill 并 wait 回收，不留僵尸进程。
//!
//! ```ignore
//! let exit = FfmpegProcess::spawn(&mut cmd)?.wait_with_timeout(Duration::from_secs(300))?;
//! match exit {
//!     ProcessExit::Exited { status, stderr } => { /* ... */ }
//!     ProcessExit::TimedOut => { /* already killed and reaped */ }
//! }
//! ```

use anyhow::{Context, Result};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// ffmpeg progress lines, never useful as an error message
const PROGRESS_PREFIXES: [&str; 3] = ["frame=", "fps=", "size="];

#[derive(Debug)]
pub enum ProcessExit {
    Exited { status: ExitStatus, stderr: String },
    /// Deadline passed; the child has been killed and reaped
    TimedOut,
}

pub struct FfmpegProcess {
    child: Child,
    stderr_reader: Option<JoinHandle<String>>,
}

impl FfmpegProcess {
    /// Spawns `cmd` with stdin/stdout discarded and stderr collected in the
    /// background.
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))?;

        let mut pipe = child
            .stderr
            .take()
            .context("stderr pipe missing on spawned process")?;

        // 🔥 读线程必须在 wait 之前启动
        let stderr_reader = thread::spawn(move || {
            let mut raw = Vec::new();
            let _ = pipe.read_to_end(&mut raw);
            String::from_utf8_lossy(&raw).into_owned()
        });

        debug!(pid = child.id(), program = %program, "Spawned encoder process");
        Ok(Self {
            child,
            stderr_reader: Some(stderr_reader),
        })
    }

    /// Waits for exit, for at most `timeout`.
    pub fn wait_with_timeout(mut self, timeout: Duration) -> Result<ProcessExit> {
        let deadline = Instant::now() + timeout;

        loop {
            let polled = self
                .child
                .try_wait()
                .context("Failed to poll encoder process")?;

            if let Some(status) = polled {
                let stderr = self
                    .stderr_reader
                    .take()
                    .and_then(|reader| reader.join().ok())
                    .unwrap_or_default();
                debug!(pid = self.child.id(), exit_code = ?status.code(), "Encoder process exited");
                return Ok(ProcessExit::Exited { status, stderr });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    pid = self.child.id(),
                    timeout_secs = timeout.as_secs_f64(),
                    "Encoder exceeded its time limit, killing"
                );
                self.kill()?;
                // 孙进程可能仍持有管道：不 join，读线程随管道关闭自行结束
                drop(self.stderr_reader.take());
                return Ok(ProcessExit::TimedOut);
            }

            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Kills the child (if still running) and reaps it.
    fn kill(&mut self) -> Result<()> {
        if let Err(e) = self.child.kill() {
            // 已经退出的进程 kill 会失败，仍需 wait
            debug!(error = %e, "kill failed, process probably exited already");
        }
        self.child
            .wait()
            .context("Failed to reap encoder process")?;
        Ok(())
    }
}

impl Drop for FfmpegProcess {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Picks the most telling line of ffmpeg's stderr.
///
/// Last line mentioning an error wins; otherwise the last non-progress line.
pub fn format_ffmpeg_error(stderr: &str) -> String {
    let mut fallback = None;
    for line in stderr.lines().rev().map(str::trim) {
        if line.contains("Error") || line.contains("error") {
            return line.to_string();
        }
        if fallback.is_none()
            && !line.is_empty()
            && !PROGRESS_PREFIXES.iter().any(|p| line.starts_with(p))
        {
            fallback = Some(line);
        }
    }
    fallback
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// Hint for well-known ffmpeg failure messages.
pub fn get_error_suggestion(stderr: &str) -> Option<String> {
    const HINTS: &[(&str, &str)] = &[
        ("Unknown encoder", "use an ffmpeg build with libx264 and aac"),
        ("No such file or directory", "check the input path"),
        ("Invalid data found", "the input looks corrupt or is not a video"),
        ("moov atom not found", "the MP4 is truncated; remux or re-download it"),
        ("Permission denied", "check read/write permissions"),
        ("No space left on device", "free disk space next to the output"),
        ("not divisible by 2", "scale targets must be even"),
    ];

    HINTS
        .iter()
        .find(|(needle, _)| stderr.contains(needle))
        .map(|(_, hint)| hint.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_line_wins_over_progress() {
        let stderr = "\
frame=  100 fps=25.0 q=28.0 size=    1024kB time=00:00:04.00
[libx264 @ 0x7f8b8c000000] Error: invalid parameter
frame=  101 fps=25.0 q=28.0 size=    1030kB";
        assert_eq!(
            format_ffmpeg_error(stderr),
            "[libx264 @ 0x7f8b8c000000] Error: invalid parameter"
        );
    }

    #[test]
    fn test_falls_back_to_last_meaningful_line() {
        let stderr = "Stream mapping:\nConversion failed!\nframe=  1 fps=0.0\n\n";
        assert_eq!(format_ffmpeg_error(stderr), "Conversion failed!");
        assert_eq!(format_ffmpeg_error(""), "Unknown FFmpeg error");
    }

    #[test]
    fn test_suggestions() {
        assert!(get_error_suggestion("Unknown encoder 'libx264'")
            .unwrap()
            .contains("libx264"));
        assert!(get_error_suggestion("all good").is_none());
    }

    #[test]
    fn test_spawn_missing_binary_fails() {
        let mut cmd = Command::new("definitely_not_a_real_encoder_xyz");
        let err = FfmpegProcess::spawn(&mut cmd).err().unwrap();
        assert!(err.to_string().contains("definitely_not_a_real_encoder_xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_and_stderr_captured() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo 'Error: boom' >&2; exit 3"]);
        match FfmpegProcess::spawn(&mut cmd)
            .unwrap()
            .wait_with_timeout(Duration::from_secs(10))
            .unwrap()
        {
            ProcessExit::Exited { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert!(stderr.contains("Error: boom"));
            }
            ProcessExit::TimedOut => panic!("short command must not time out"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stderr_does_not_deadlock() {
        // 远超管道缓冲区的 stderr 输出
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "i=0; while [ $i -lt 5000 ]; do echo 'frame= progress line padding padding' >&2; i=$((i+1)); done"]);
        let exit = FfmpegProcess::spawn(&mut cmd)
            .unwrap()
            .wait_with_timeout(Duration::from_secs(30))
            .unwrap();
        match exit {
            ProcessExit::Exited { status, stderr } => {
                assert!(status.success());
                assert_eq!(stderr.lines().count(), 5000);
            }
            ProcessExit::TimedOut => panic!("stderr drain must keep the child moving"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stuck_process_is_killed() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let started = Instant::now();
        let exit = FfmpegProcess::spawn(&mut cmd)
            .unwrap()
            .wait_with_timeout(Duration::from_millis(200))
            .unwrap();
        assert!(matches!(exit, ProcessExit::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
