//! FileSize - 字节数包装
//!
//! 阈值比较、比例计算和人类可读显示都集中在这里，避免在调用处混用
//! MB/MiB 和裸 u64。所有单位都是二进制单位（1 MB = 1024 × 1024 字节）。

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Byte count of a file on disk.
///
/// ```
/// use shared_utils::FileSize;
///
/// let limit = FileSize::from_mb(20);
/// assert!(FileSize::new(20 * 1024 * 1024).fits_within(limit));
/// assert_eq!(limit.to_string(), "20.00 MB");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSize(u64);

impl FileSize {
    pub const ZERO: FileSize = FileSize(0);

    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Saturates at `u64::MAX` bytes
    pub const fn from_kb(kb: u64) -> Self {
        Self(kb.saturating_mul(KIB))
    }

    /// Saturates at `u64::MAX` bytes
    pub const fn from_mb(mb: u64) -> Self {
        Self(mb.saturating_mul(MIB))
    }

    /// Size of the file at `path` as reported by its metadata.
    pub fn of_path(path: &Path) -> std::io::Result<Self> {
        std::fs::metadata(path).map(|meta| Self(meta.len()))
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// 上限是包含的：恰好等于上限也算满足
    #[inline]
    pub const fn fits_within(&self, ceiling: FileSize) -> bool {
        self.0 <= ceiling.0
    }

    /// `self / original`; `None` when `original` is empty
    pub fn compression_ratio(&self, original: FileSize) -> Option<f64> {
        (original.0 != 0).then(|| self.0 as f64 / original.0 as f64)
    }

    /// 相对原始大小的变化百分比，负数表示变小
    pub fn size_change_percent(&self, original: FileSize) -> Option<f64> {
        (original.0 != 0)
            .then(|| (self.0 as f64 - original.0 as f64) * 100.0 / original.0 as f64)
    }

    /// Human readable form, e.g. `"12.50 MB"` or `"512 B"`
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        let (unit, divisor) = match bytes {
            b if b >= GIB => ("GB", GIB),
            b if b >= MIB => ("MB", MIB),
            b if b >= KIB => ("KB", KIB),
            _ => return write!(f, "{} B", bytes),
        };
        write!(f, "{:.2} {}", bytes as f64 / divisor as f64, unit)
    }
}

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({}B)", self.0)
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

/// Serialized as a plain byte count
impl Serialize for FileSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}
