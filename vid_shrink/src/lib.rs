//! vid-shrink - get a video under a hard size ceiling
//!
//! Re-encodes the source with ffmpeg (libx264 + aac) on a declining-quality
//! ladder until the artifact fits:
//! - CRF 20 → 35 in steps of 3
//! - then 720p → 480p → 360p
//! - then audio bitrate down to 32 kbps
//!
//! In-place runs write to a scratch sibling and only replace the source once
//! a fitting artifact exists.
//!
//! ```rust,ignore
//! use vid_shrink::{compress, CompressionTarget, FfmpegEngine, SearchLimits};
//!
//! let target = CompressionTarget::new("clip.mp4", None);
//! let report = compress(&target, SearchLimits::default(), FfmpegEngine::default())?
//!     .into_result()?;
//! println!("{} after {} attempts", report.final_size.unwrap(), report.attempt_count());
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod errors;
pub mod ffmpeg;
pub mod outcome;
pub mod params;
pub mod target;


pub use config::{EngineConfig, SearchLimits, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_SIZE_THRESHOLD};
pub use controller::{compress, AdaptiveEncoder};
pub use engine::{EncodeJob, EncodingEngine, EngineRun};
pub use errors::{Result, ShrinkError};
pub use ffmpeg::FfmpegEngine;
pub use outcome::{AttemptRecord, AttemptResult, SearchOutcome, SearchReport};
pub use params::{EncodingParameters, Escalation, QualityFactor};
pub use target::CompressionTarget;

// 🔥 Shared types used in the public API
pub use shared_utils::{FileSize, ThreadPolicy};
