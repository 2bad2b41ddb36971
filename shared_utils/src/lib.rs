//! vid_shrink 的公共底层
//!
//! ffmpeg 子进程管理、日志初始化、错误报告、类型包装（CRF / 文件大小 / 尝试次数）、
//! 编码线程策略，以及输出临时文件守卫。

pub mod crf_constants;
pub mod error_handler;
// 🔥 stderr 排空 + 超时 kill
pub mod ffmpeg_process;
pub mod logging;
pub mod scratch;
pub mod thread_manager;
pub mod types;

pub use crf_constants::{
    DEFAULT_MAX_ATTEMPTS, EMERGENCY_MAX_ATTEMPTS, SEARCH_CRF_CEILING, SEARCH_CRF_START,
    SEARCH_CRF_STEP, X264_CRF_DEFAULT, X264_CRF_MAX, X264_CRF_MIN,
};
pub use error_handler::{cause_chain, install_panic_handler, report_failure, ErrorCategory};
pub use ffmpeg_process::{format_ffmpeg_error, get_error_suggestion, FfmpegProcess, ProcessExit};
pub use scratch::ScratchFile;
pub use thread_manager::{resolve_engine_threads, HostInfo, ThreadPolicy};
pub use types::{AttemptError, AttemptGuard, Crf, CrfError, EncoderBounds, FileSize, X264Encoder};
