//! 类型安全包装
//!
//! - `crf`: 按编码器区分范围的 CRF
//! - `file_size`: 字节数，阈值比较与显示
//! - `iteration`: 尝试次数守卫

pub mod crf;
pub mod file_size;
pub mod iteration;

pub use crf::{Crf, CrfError, EncoderBounds, X264Encoder};
pub use file_size::FileSize;
pub use iteration::{AttemptError, AttemptGuard};
