//! ffmpeg-backed encoding engine (libx264 + aac)

use crate::config::EngineConfig;
use crate::engine::{EncodeJob, EncodingEngine, EngineRun};
use crate::errors::{Result, ShrinkError};
use shared_utils::ffmpeg_process::{FfmpegProcess, ProcessExit};
use shared_utils::logging::log_external_tool;
use shared_utils::{format_ffmpeg_error, get_error_suggestion};
use std::ffi::OsString;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    config: EngineConfig,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `-i IN -c:v libx264 -crf Q [-vf scale=-2:H] -c:a aac -b:a Ak -preset P [-threads N] -y OUT`
    pub fn build_args(&self, job: &EncodeJob<'_>) -> Vec<OsString> {
        let params = &job.params;
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-nostdin".into()];

        args.push("-i".into());
        args.push(job.input.as_os_str().to_owned());

        args.push("-c:v".into());
        args.push(self.config.video_codec.as_str().into());
        args.push("-crf".into());
        args.push(params.quality.value().to_string().into());

        if let Some(height) = params.vertical_resolution {
            // -2 保持宽高比且宽度为偶数（libx264 要求）
            args.push("-vf".into());
            args.push(format!("scale=-2:{}", height).into());
        }

        args.push("-c:a".into());
        args.push(self.config.audio_codec.as_str().into());
        args.push("-b:a".into());
        args.push(format!("{}k", params.audio_bitrate_kbps).into());

        args.push("-preset".into());
        args.push(self.config.preset.as_str().into());

        if let Some(threads) = job.threads {
            args.push("-threads".into());
            args.push(threads.to_string().into());
        }

        args.push("-y".into());
        args.push(job.output.as_os_str().to_owned());
        args
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EncodingEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn ensure_available(&self) -> Result<()> {
        match which::which(&self.config.ffmpeg_path) {
            Ok(path) => {
                debug!(ffmpeg = ?path, "Found encoder binary");
                Ok(())
            }
            Err(_) => Err(ShrinkError::ToolNotFound(
                self.config.ffmpeg_path.display().to_string(),
            )),
        }
    }

    fn thread_limit(&self) -> Option<usize> {
        self.config.resolved_threads()
    }

    fn encode(&self, job: &EncodeJob<'_>, timeout: Duration) -> anyhow::Result<EngineRun> {
        let args = self.build_args(job);
        let mut cmd = Command::new(&self.config.ffmpeg_path);
        cmd.args(&args);

        let started = Instant::now();
        let exit = FfmpegProcess::spawn(&mut cmd)?.wait_with_timeout(timeout)?;
        let elapsed = started.elapsed();

        let printable: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        let tool = self.config.ffmpeg_path.display().to_string();

        match exit {
            ProcessExit::Exited { status, stderr } => {
                log_external_tool(&tool, &printable, &stderr, status.code(), elapsed);
                if status.success() {
                    Ok(EngineRun::Completed)
                } else {
                    let mut message = format_ffmpeg_error(&stderr);
                    if let Some(hint) = get_error_suggestion(&stderr) {
                        message.push_str(&format!(" (💡 {})", hint));
                    }
                    Ok(EngineRun::Failed {
                        exit_code: status.code(),
                        message,
                    })
                }
            }
            ProcessExit::TimedOut => {
                warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    command = %printable.join(" "),
                    "Encoder killed after timeout"
                );
                Ok(EngineRun::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EncodingParameters;
    use shared_utils::ThreadPolicy;
    use std::path::Path;

    fn job_with(params: EncodingParameters, threads: Option<usize>) -> Vec<String> {
        let engine = FfmpegEngine::default();
        let job = EncodeJob {
            input: Path::new("in.mp4"),
            output: Path::new("out.mp4"),
            params,
            threads,
        };
        engine
            .build_args(&job)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_for_initial_parameters() {
        let args = job_with(EncodingParameters::initial(), None);
        assert_eq!(
            args.join(" "),
            "-hide_banner -nostdin -i in.mp4 -c:v libx264 -crf 20 -c:a aac -b:a 128k -preset medium -y out.mp4"
        );
    }

    #[test]
    fn test_args_with_scale_and_threads() {
        let mut params = EncodingParameters::initial();
        for _ in 0..7 {
            params.escalate();
        }
        let args = job_with(params, Some(1)).join(" ");
        assert!(args.contains("-crf 35"));
        assert!(args.contains("-vf scale=-2:480"));
        assert!(args.contains("-threads 1"));
        assert!(args.ends_with("-y out.mp4"));
    }

    #[test]
    fn test_missing_binary_is_tool_not_found() {
        let engine = FfmpegEngine::new(
            EngineConfig::default().with_ffmpeg_path("definitely-not-ffmpeg-xyz"),
        );
        assert!(matches!(
            engine.ensure_available(),
            Err(ShrinkError::ToolNotFound(_))
        ));
    }

    #[test]
    fn test_thread_limit_follows_policy() {
        let unbounded = FfmpegEngine::new(
            EngineConfig::default().with_thread_policy(ThreadPolicy::Unbounded),
        );
        let pinned = FfmpegEngine::new(
            EngineConfig::default().with_thread_policy(ThreadPolicy::Fixed(1)),
        );
        if std::env::var_os(shared_utils::thread_manager::THREADS_ENV_VAR).is_none() {
            assert_eq!(unbounded.thread_limit(), None);
            assert_eq!(pinned.thread_limit(), Some(1));
        }
        let default = FfmpegEngine::default();
        assert_eq!(default.thread_limit(), default.config().resolved_threads());
    }

    #[cfg(unix)]
    mod stub_binary {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;
        use tempfile::TempDir;

        /// Writes an executable `sh` script standing in for ffmpeg.
        fn stub(dir: &TempDir, body: &str) -> PathBuf {
            let path = dir.path().join("fake-ffmpeg");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn run(engine: &FfmpegEngine, dir: &TempDir, timeout: Duration) -> EngineRun {
            let input = dir.path().join("in.mp4");
            fs::write(&input, b"source").unwrap();
            let output = dir.path().join("out.mp4");
            let job = EncodeJob {
                input: &input,
                output: &output,
                params: EncodingParameters::initial(),
                threads: Some(1),
            };
            engine.encode(&job, timeout).unwrap()
        }

        #[test]
        fn test_stub_success_writes_last_argument() {
            let dir = TempDir::new().unwrap();
            // 最后一个参数是输出路径
            let bin = stub(&dir, r#"for last; do :; done; printf 'encoded' > "$last""#);
            let engine = FfmpegEngine::new(EngineConfig::default().with_ffmpeg_path(bin));

            assert_eq!(run(&engine, &dir, Duration::from_secs(10)), EngineRun::Completed);
            assert_eq!(fs::read(dir.path().join("out.mp4")).unwrap(), b"encoded");
        }

        #[test]
        fn test_stub_failure_carries_error_line() {
            let dir = TempDir::new().unwrap();
            let bin = stub(&dir, "echo 'Error: invalid filter' >&2; exit 1");
            let engine = FfmpegEngine::new(EngineConfig::default().with_ffmpeg_path(bin));

            match run(&engine, &dir, Duration::from_secs(10)) {
                EngineRun::Failed { exit_code, message } => {
                    assert_eq!(exit_code, Some(1));
                    assert!(message.contains("invalid filter"));
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }

        #[test]
        fn test_stub_hang_times_out() {
            let dir = TempDir::new().unwrap();
            let bin = stub(&dir, "exec sleep 30");
            let engine = FfmpegEngine::new(EngineConfig::default().with_ffmpeg_path(bin));

            let started = Instant::now();
            assert_eq!(run(&engine, &dir, Duration::from_millis(300)), EngineRun::TimedOut);
            assert!(started.elapsed() < Duration::from_secs(10));
        }
    }
}
