//! Per-attempt results and the final search report

use crate::errors::{Result, ShrinkError};
use crate::params::EncodingParameters;
use crate::target::CompressionTarget;
use serde::Serialize;
use shared_utils::FileSize;
use std::path::PathBuf;

/// What one attempt produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptResult {
    /// Artifact at or under the threshold
    Fit { size: FileSize },
    /// Artifact produced but above the threshold
    Oversized { size: FileSize },
    /// Non-zero exit, or no usable artifact
    EngineFailed {
        exit_code: Option<i32>,
        message: String,
    },
}

impl AttemptResult {
    /// Artifact size, if this attempt produced one worth measuring
    pub fn measured_size(&self) -> Option<FileSize> {
        match self {
            AttemptResult::Fit { size } | AttemptResult::Oversized { size } => Some(*size),
            AttemptResult::EngineFailed { .. } => None,
        }
    }

    pub fn is_fit(&self) -> bool {
        matches!(self, AttemptResult::Fit { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    /// 1-based
    pub index: u32,
    pub params: EncodingParameters,
    #[serde(flatten)]
    pub result: AttemptResult,
}

/// Full history of one search, success or not
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub target: CompressionTarget,
    pub original_size: FileSize,
    pub threshold: FileSize,
    pub attempts: Vec<AttemptRecord>,
    /// Set only on success
    pub final_params: Option<EncodingParameters>,
    pub final_size: Option<FileSize>,
    pub final_path: Option<PathBuf>,
}

impl SearchReport {
    pub(crate) fn new(target: CompressionTarget, original_size: FileSize, threshold: FileSize) -> Self {
        Self {
            target,
            original_size,
            threshold,
            attempts: Vec::new(),
            final_params: None,
            final_size: None,
            final_path: None,
        }
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Size of the most recent attempt that produced a measurable artifact
    pub fn last_measured_size(&self) -> Option<FileSize> {
        self.attempts
            .iter()
            .rev()
            .find_map(|record| record.result.measured_size())
    }

    pub fn last_params(&self) -> Option<EncodingParameters> {
        self.attempts.last().map(|record| record.params)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "report", rename_all = "snake_case")]
pub enum SearchOutcome {
    Success(SearchReport),
    /// Budget spent (or ladder saturated) without a fitting artifact
    Exhausted(SearchReport),
}

impl SearchOutcome {
    pub fn report(&self) -> &SearchReport {
        match self {
            SearchOutcome::Success(report) | SearchOutcome::Exhausted(report) => report,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success(_))
    }

    /// Collapses an exhausted search into `ShrinkError::SearchExhausted`.
    pub fn into_result(self) -> Result<SearchReport> {
        match self {
            SearchOutcome::Success(report) => Ok(report),
            SearchOutcome::Exhausted(report) => Err(ShrinkError::SearchExhausted {
                attempts: report.attempt_count(),
                last_params: report.last_params().unwrap_or_default(),
                last_size: report.last_measured_size(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32, result: AttemptResult) -> AttemptRecord {
        AttemptRecord {
            index,
            params: EncodingParameters::initial(),
            result,
        }
    }

    fn report_with(results: Vec<AttemptResult>) -> SearchReport {
        let mut report = SearchReport::new(
            CompressionTarget::new("clip.mp4", None),
            FileSize::from_mb(50),
            FileSize::from_mb(20),
        );
        for (i, result) in results.into_iter().enumerate() {
            report.attempts.push(record(i as u32 + 1, result));
        }
        report
    }

    #[test]
    fn test_last_measured_skips_failures() {
        let report = report_with(vec![
            AttemptResult::Oversized {
                size: FileSize::from_mb(30),
            },
            AttemptResult::Oversized {
                size: FileSize::from_mb(25),
            },
            AttemptResult::EngineFailed {
                exit_code: Some(1),
                message: "boom".into(),
            },
        ]);
        assert_eq!(report.last_measured_size(), Some(FileSize::from_mb(25)));
        assert_eq!(report.attempt_count(), 3);
    }

    #[test]
    fn test_exhausted_into_error() {
        let outcome = SearchOutcome::Exhausted(report_with(vec![AttemptResult::EngineFailed {
            exit_code: None,
            message: String::new(),
        }]));
        assert!(!outcome.is_success());
        match outcome.into_result() {
            Err(ShrinkError::SearchExhausted {
                attempts,
                last_size,
                ..
            }) => {
                assert_eq!(attempts, 1);
                assert_eq!(last_size, None);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_attempt_history() {
        let report = report_with(vec![AttemptResult::Fit {
            size: FileSize::from_mb(10),
        }]);
        let json = serde_json::to_value(SearchOutcome::Success(report)).unwrap();
        assert_eq!(json["status"], "success");
        let attempt = &json["report"]["attempts"][0];
        assert_eq!(attempt["index"], 1);
        assert_eq!(attempt["result"], "fit");
        assert_eq!(attempt["params"]["audio_bitrate_kbps"], 128);
    }
}
