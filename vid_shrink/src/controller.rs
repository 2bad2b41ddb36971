//! Adaptive Encoder Controller
//!
//! configure → encode → measure → decide, strictly sequential. Every attempt
//! re-encodes the original source; only the parameters change between
//! attempts.

use crate::config::SearchLimits;
use crate::engine::{EncodeJob, EncodingEngine, EngineRun};
use crate::errors::{Result, ShrinkError};
use crate::outcome::{AttemptRecord, AttemptResult, SearchOutcome, SearchReport};
use crate::params::{EncodingParameters, Escalation};
use crate::target::CompressionTarget;
use shared_utils::{AttemptGuard, FileSize, ScratchFile};
use tracing::{debug, info, warn};

pub struct AdaptiveEncoder<E> {
    engine: E,
    limits: SearchLimits,
    threads: Option<usize>,
}

impl<E: EncodingEngine> AdaptiveEncoder<E> {
    /// Starts with the engine's own thread limit (see [`EncodingEngine::thread_limit`]).
    pub fn new(engine: E, limits: SearchLimits) -> Self {
        let threads = engine.thread_limit();
        Self {
            engine,
            limits,
            threads,
        }
    }

    /// Overrides the thread limit passed through to every engine run
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs the size search for one target.
    ///
    /// `Ok(Exhausted)` means every allowed attempt was oversized or failed.
    /// `Err` is reserved for pre-flight failures, engine timeouts, launch
    /// failures and IO errors on the scratch/destination files.
    pub fn compress(&self, target: &CompressionTarget) -> Result<SearchOutcome> {
        // 🔥 Pre-flight: nothing touches the engine until these pass
        self.limits.validate()?;
        target.ensure_input_exists()?;
        self.engine.ensure_available()?;

        let input = target.input();
        let original_size = FileSize::of_path(input).map_err(|e| ShrinkError::io(input, e))?;
        let threshold = self.limits.size_threshold;

        info!(
            input = %input.display(),
            output = %target.output().display(),
            in_place = target.is_in_place(),
            original_size = original_size.bytes(),
            threshold = threshold.bytes(),
            "📦 Original size {} (limit {})",
            original_size,
            threshold
        );

        // 🔥 输出先写到目标旁边的临时文件，只有成功时才覆盖目标
        let output = target.output();
        let scratch = ScratchFile::beside(output).map_err(|e| ShrinkError::io(output, e))?;

        let mut report = SearchReport::new(target.clone(), original_size, threshold);
        let mut guard = AttemptGuard::new(self.limits.max_attempts, "size search");
        let mut params = EncodingParameters::initial();

        loop {
            let index = match guard.claim() {
                Ok(index) => index,
                Err(e) => {
                    debug!("{}", e);
                    break;
                }
            };

            info!(
                attempt = index,
                max_attempts = guard.max(),
                remaining = guard.remaining(),
                crf = params.quality.value(),
                scale = %params.scale_label(),
                audio_kbps = params.audio_bitrate_kbps,
                "🔄 Attempt {}/{}: {}",
                index,
                guard.max(),
                params
            );

            let job = EncodeJob {
                input,
                output: scratch.path(),
                params,
                threads: self.threads,
            };

            let run = self
                .engine
                .encode(&job, self.limits.per_attempt_timeout)
                .map_err(|source| ShrinkError::EngineLaunch {
                    engine: self.engine.name().to_string(),
                    source,
                })?;

            let result = match run {
                EngineRun::Completed => self.measure(&scratch),
                EngineRun::Failed { exit_code, message } => {
                    AttemptResult::EngineFailed { exit_code, message }
                }
                EngineRun::TimedOut => {
                    warn!(attempt = index, "⏱️ Encoder timed out, aborting search");
                    // scratch dropped here: partial output removed, destination untouched
                    return Err(ShrinkError::EngineTimeout {
                        attempt: index,
                        timeout: self.limits.per_attempt_timeout,
                        params,
                    });
                }
            };

            if let AttemptResult::Fit { size } = result {
                report.attempts.push(AttemptRecord {
                    index,
                    params,
                    result,
                });

                let final_path = scratch
                    .commit()
                    .map_err(|e| ShrinkError::io(output, e))?;

                info!(
                    attempt = index,
                    size = size.bytes(),
                    "✅ {} fits under {} ({})",
                    size,
                    threshold,
                    params
                );
                if let Some(pct) = size.size_change_percent(original_size) {
                    info!("📉 Size change: {:+.1}%", pct);
                }

                report.final_params = Some(params);
                report.final_size = Some(size);
                report.final_path = Some(final_path);
                return Ok(SearchOutcome::Success(report));
            }

            match &result {
                AttemptResult::Oversized { size } => {
                    info!(
                        attempt = index,
                        size = size.bytes(),
                        "📏 {} is over the limit ({})",
                        size,
                        threshold
                    );
                }
                AttemptResult::EngineFailed { exit_code, message } => {
                    warn!(
                        attempt = index,
                        exit_code = ?exit_code,
                        "⚠️ Encoder failed: {}",
                        message
                    );
                }
                AttemptResult::Fit { .. } => {}
            }

            report.attempts.push(AttemptRecord {
                index,
                params,
                result,
            });

            match params.escalate() {
                Escalation::Saturated => {
                    warn!("Every ladder dimension is at its limit, stopping early");
                    break;
                }
                step => debug!(?step, next = %params, "Escalated parameters"),
            }
        }

        warn!(
            attempts = report.attempt_count(),
            last_size = ?report.last_measured_size().map(|s| s.bytes()),
            "❌ Could not get {} under {}",
            input.display(),
            threshold
        );
        Ok(SearchOutcome::Exhausted(report))
    }

    /// Size of a completed run's artifact; an empty or unreadable artifact is
    /// an engine failure, never a fit.
    fn measure(&self, scratch: &ScratchFile) -> AttemptResult {
        match FileSize::of_path(scratch.path()) {
            Ok(size) if size.is_zero() => AttemptResult::EngineFailed {
                exit_code: Some(0),
                message: "encoder produced an empty file".to_string(),
            },
            Ok(size) if size.fits_within(self.limits.size_threshold) => {
                AttemptResult::Fit { size }
            }
            Ok(size) => AttemptResult::Oversized { size },
            Err(e) => AttemptResult::EngineFailed {
                exit_code: Some(0),
                message: format!("encoder produced no readable output: {}", e),
            },
        }
    }
}

/// One-shot form of [`AdaptiveEncoder::compress`] using the engine's thread limit.
pub fn compress<E: EncodingEngine>(
    target: &CompressionTarget,
    limits: SearchLimits,
    engine: E,
) -> Result<SearchOutcome> {
    AdaptiveEncoder::new(engine, limits).compress(target)
}
