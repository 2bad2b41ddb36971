use crate::params::EncodingParameters;
use shared_utils::{ErrorCategory, FileSize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Terminal outcomes of a size search that are not a success.
///
/// Per-attempt engine failures and oversized artifacts are not errors; they
/// show up as `AttemptResult` values and drive escalation.
#[derive(Error, Debug)]
pub enum ShrinkError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid search limits: {0}")]
    InvalidLimits(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to run {engine}: {source:#}")]
    EngineLaunch {
        engine: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "Encoder timed out after {:.0}s on attempt {attempt} ({params})",
        .timeout.as_secs_f64()
    )]
    EngineTimeout {
        attempt: u32,
        timeout: Duration,
        params: EncodingParameters,
    },

    #[error(
        "Could not get under the size limit after {attempts} attempts (last: {last_params}, last size: {})",
        display_size(.last_size)
    )]
    SearchExhausted {
        attempts: u32,
        last_params: EncodingParameters,
        last_size: Option<FileSize>,
    },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_size(size: &Option<FileSize>) -> String {
    size.map(|s| s.display())
        .unwrap_or_else(|| "none measured".to_string())
}

impl ShrinkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ShrinkError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            // 搜索本身可以换参数重跑，只是这次预算用完了
            ShrinkError::SearchExhausted { .. } => ErrorCategory::Recoverable,
            ShrinkError::InputNotFound(_)
            | ShrinkError::InvalidLimits(_)
            | ShrinkError::ToolNotFound(_)
            | ShrinkError::EngineLaunch { .. }
            | ShrinkError::EngineTimeout { .. }
            | ShrinkError::Io { .. } => ErrorCategory::Fatal,
        }
    }

    /// One-line hint shown under the error on the terminal
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ShrinkError::InputNotFound(_) => Some("Check the input path"),
            ShrinkError::ToolNotFound(_) => {
                Some("Install ffmpeg (with libx264 and aac) and make sure it is in PATH")
            }
            ShrinkError::EngineTimeout { .. } => Some("Raise --timeout-secs or allow more threads"),
            ShrinkError::SearchExhausted { .. } => {
                Some("Raise --max-attempts or --max-size-mb, or trim the video")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShrinkError>;
