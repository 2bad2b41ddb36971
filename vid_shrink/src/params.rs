//! Encoding parameters and the degradation ladder
//!
//! One `EncodingParameters` value is one attempt configuration. Escalation
//! only ever moves it towards smaller output, in a fixed order:
//!
//! 1. CRF += 3 until it would pass the ceiling (35)
//! 2. then, one step per attempt: source → 720p → 480p → 360p
//! 3. then audio bitrate −32 kbps per attempt, floored at 32 kbps
//!
//! The CRF is never reset when resolution or audio degrade, so the sequence of
//! configurations is monotonic and can never revisit an earlier one.

use serde::Serialize;
use shared_utils::{Crf, X264Encoder, SEARCH_CRF_CEILING, SEARCH_CRF_START, SEARCH_CRF_STEP};
use std::fmt;

pub type QualityFactor = Crf<X264Encoder>;

/// Vertical resolutions tried once the CRF is saturated, in order
pub const RESOLUTION_LADDER: [u32; 3] = [720, 480, 360];

/// Audio bitrate of the first attempt
pub const INITIAL_AUDIO_KBPS: u32 = 128;

/// Audio bitrate decrement per step
pub const AUDIO_STEP_KBPS: u32 = 32;

/// Audio bitrate never goes below this
pub const AUDIO_FLOOR_KBPS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EncodingParameters {
    /// x264 CRF; higher means smaller output
    pub quality: QualityFactor,
    /// Target height in pixels; `None` keeps the source resolution
    pub vertical_resolution: Option<u32>,
    pub audio_bitrate_kbps: u32,
}

/// What a single `escalate()` call changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Quality { from: u8, to: u8 },
    Resolution { from: Option<u32>, to: u32 },
    AudioBitrate { from: u32, to: u32 },
    /// Every dimension is at its limit; nothing changed
    Saturated,
}

impl Default for EncodingParameters {
    fn default() -> Self {
        Self::initial()
    }
}

impl EncodingParameters {
    /// CRF 20, source resolution, 128 kbps audio
    pub fn initial() -> Self {
        Self {
            quality: QualityFactor::clamped(SEARCH_CRF_START as u32),
            vertical_resolution: None,
            audio_bitrate_kbps: INITIAL_AUDIO_KBPS,
        }
    }

    /// Advances exactly one ladder dimension towards a smaller artifact.
    ///
    /// Applied identically after an engine failure and after an oversized
    /// result.
    pub fn escalate(&mut self) -> Escalation {
        let from = self.quality.value();
        if !self.quality.would_exceed(SEARCH_CRF_STEP, SEARCH_CRF_CEILING) {
            self.quality = self.quality.step_up(SEARCH_CRF_STEP, SEARCH_CRF_CEILING);
            return Escalation::Quality {
                from,
                to: self.quality.value(),
            };
        }

        // 超过上限：钳制 CRF，改为推进下一个维度
        self.quality = self.quality.step_up(SEARCH_CRF_STEP, SEARCH_CRF_CEILING);

        if let Some(next) = next_resolution(self.vertical_resolution) {
            let previous = self.vertical_resolution.replace(next);
            return Escalation::Resolution {
                from: previous,
                to: next,
            };
        }

        let audio_from = self.audio_bitrate_kbps;
        let audio_to = audio_from
            .saturating_sub(AUDIO_STEP_KBPS)
            .max(AUDIO_FLOOR_KBPS);
        if audio_to == audio_from {
            return Escalation::Saturated;
        }
        self.audio_bitrate_kbps = audio_to;
        Escalation::AudioBitrate {
            from: audio_from,
            to: audio_to,
        }
    }

    /// True when a further `escalate()` would change nothing
    pub fn is_saturated(&self) -> bool {
        self.quality.would_exceed(SEARCH_CRF_STEP, SEARCH_CRF_CEILING)
            && next_resolution(self.vertical_resolution).is_none()
            && self.audio_bitrate_kbps <= AUDIO_FLOOR_KBPS
    }

    /// Position on the ladder, comparable across attempts: larger is more degraded.
    pub fn degradation_rank(&self) -> (u8, usize, u32) {
        let resolution_steps = match self.vertical_resolution {
            None => 0,
            Some(h) => RESOLUTION_LADDER
                .iter()
                .position(|&step| step == h)
                .map(|i| i + 1)
                .unwrap_or(RESOLUTION_LADDER.len()),
        };
        (
            self.quality.value(),
            resolution_steps,
            INITIAL_AUDIO_KBPS.saturating_sub(self.audio_bitrate_kbps),
        )
    }

    pub fn scale_label(&self) -> String {
        match self.vertical_resolution {
            Some(h) => format!("{}p", h),
            None => "original".to_string(),
        }
    }
}

fn next_resolution(current: Option<u32>) -> Option<u32> {
    match current {
        None => Some(RESOLUTION_LADDER[0]),
        Some(h) => RESOLUTION_LADDER
            .iter()
            .position(|&step| step == h)
            .and_then(|i| RESOLUTION_LADDER.get(i + 1).copied()),
    }
}

impl fmt::Display for EncodingParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CRF={}, scale={}, audio={}k",
            self.quality,
            self.scale_label(),
            self.audio_bitrate_kbps
        )
    }
}
