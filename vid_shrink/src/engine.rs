//! Encoding engine seam
//!
//! The controller only knows this trait: hand it an input, an output path and
//! one parameter set, get back whether the run completed, failed or hung.

use crate::errors::Result;
use crate::params::EncodingParameters;
use std::path::Path;
use std::time::Duration;

/// One concrete encoder invocation
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    /// Always the original source, never a previous attempt's output
    pub input: &'a Path,
    pub output: &'a Path,
    pub params: EncodingParameters,
    /// Worker thread limit for the encoder (`None` = encoder default)
    pub threads: Option<usize>,
}

/// How one engine run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRun {
    Completed,
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
    /// Hit the wall-clock limit; the process has already been terminated
    TimedOut,
}

pub trait EncodingEngine {
    fn name(&self) -> &str;

    /// Pre-flight check run once before the first attempt.
    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    /// Thread limit the engine wants by default (`None` = encoder default).
    fn thread_limit(&self) -> Option<usize> {
        None
    }

    /// Runs one encode, waiting at most `timeout`.
    ///
    /// `Err` is reserved for not being able to run the engine at all
    /// (spawn/wait failures); a non-zero exit is `Ok(EngineRun::Failed)`.
    fn encode(&self, job: &EncodeJob<'_>, timeout: Duration) -> anyhow::Result<EngineRun>;
}

impl<E: EncodingEngine + ?Sized> EncodingEngine for &E {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ensure_available(&self) -> Result<()> {
        (**self).ensure_available()
    }

    fn thread_limit(&self) -> Option<usize> {
        (**self).thread_limit()
    }

    fn encode(&self, job: &EncodeJob<'_>, timeout: Duration) -> anyhow::Result<EngineRun> {
        (**self).encode(job, timeout)
    }
}
