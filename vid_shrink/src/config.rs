//! Search limits and engine configuration

use crate::errors::{Result, ShrinkError};
use shared_utils::{FileSize, ThreadPolicy, DEFAULT_MAX_ATTEMPTS};
use std::path::PathBuf;
use std::time::Duration;

/// Default size ceiling: 20 MiB
pub const DEFAULT_SIZE_THRESHOLD: FileSize = FileSize::from_mb(20);

/// Default wall-clock limit for a single encoder run
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Bounds of one size search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// An artifact at or under this size is accepted
    pub size_threshold: FileSize,
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            size_threshold: DEFAULT_SIZE_THRESHOLD,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            per_attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl SearchLimits {
    pub fn with_size_threshold(mut self, size: FileSize) -> Self {
        self.size_threshold = size;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }

    /// Rejects zero thresholds, zero attempts and zero timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.size_threshold.is_zero() {
            return Err(ShrinkError::InvalidLimits(
                "size threshold must be positive".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ShrinkError::InvalidLimits(
                "max attempts must be positive".to_string(),
            ));
        }
        if self.per_attempt_timeout.is_zero() {
            return Err(ShrinkError::InvalidLimits(
                "per-attempt timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the ffmpeg engine is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// ffmpeg binary (name looked up in PATH, or an explicit path)
    pub ffmpeg_path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub thread_policy: ThreadPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            thread_policy: ThreadPolicy::Auto,
        }
    }
}

impl EngineConfig {
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_thread_policy(mut self, policy: ThreadPolicy) -> Self {
        self.thread_policy = policy;
        self
    }

    /// Thread count to pass to the encoder for this host (`None` = encoder default)
    pub fn resolved_threads(&self) -> Option<usize> {
        shared_utils::resolve_engine_threads(self.thread_policy)
    }
}
