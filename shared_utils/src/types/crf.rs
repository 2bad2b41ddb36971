//! Crf<E> - 按编码器区分范围的 CRF 值
//!
//! 范围在构造时检查一次；之后所有运算（步进、钳制）都保证结果仍然合法。

use serde::{Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

use crate::crf_constants::{X264_CRF_DEFAULT, X264_CRF_MAX, X264_CRF_MIN};

/// Valid CRF range of one encoder.
pub trait EncoderBounds: Copy {
    const MIN: u8;
    const MAX: u8;
    const DEFAULT: u8;
    const NAME: &'static str;
}

/// x264 / H.264 (libx264)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct X264Encoder;

impl EncoderBounds for X264Encoder {
    const MIN: u8 = X264_CRF_MIN;
    const MAX: u8 = X264_CRF_MAX;
    const DEFAULT: u8 = X264_CRF_DEFAULT;
    const NAME: &'static str = "x264";
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrfError {
    #[error("{encoder} CRF {value} out of range [{min}, {max}]")]
    OutOfRange {
        value: u32,
        min: u8,
        max: u8,
        encoder: &'static str,
    },
}

/// ```
/// use shared_utils::{Crf, X264Encoder};
///
/// let crf = Crf::<X264Encoder>::new(20).unwrap();
/// assert_eq!(crf.step_up(3, 35).value(), 23);
/// assert_eq!(Crf::<X264Encoder>::clamped(34).step_up(3, 35).value(), 35);
/// assert!(Crf::<X264Encoder>::new(60).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Crf<E: EncoderBounds> {
    value: u8,
    _encoder: PhantomData<E>,
}

impl<E: EncoderBounds> Crf<E> {
    const fn raw(value: u8) -> Self {
        Self {
            value,
            _encoder: PhantomData,
        }
    }

    pub fn new(value: u32) -> Result<Self, CrfError> {
        if (E::MIN as u32..=E::MAX as u32).contains(&value) {
            Ok(Self::raw(value as u8))
        } else {
            Err(CrfError::OutOfRange {
                value,
                min: E::MIN,
                max: E::MAX,
                encoder: E::NAME,
            })
        }
    }

    /// Out-of-range input is pulled to the nearest bound.
    pub fn clamped(value: u32) -> Self {
        Self::raw(value.clamp(E::MIN as u32, E::MAX as u32) as u8)
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Raises by `step`, stopping at `ceiling` (and at the encoder maximum).
    pub fn step_up(&self, step: u8, ceiling: u8) -> Self {
        Self::raw(self.value.saturating_add(step).min(ceiling.min(E::MAX)))
    }

    /// 下一次 `step_up` 会被钳制（即 `value + step > ceiling`）
    #[inline]
    pub fn would_exceed(&self, step: u8, ceiling: u8) -> bool {
        u32::from(self.value) + u32::from(step) > u32::from(ceiling)
    }
}

impl<E: EncoderBounds> Default for Crf<E> {
    fn default() -> Self {
        Self::raw(E::DEFAULT)
    }
}

impl<E: EncoderBounds> fmt::Display for Crf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<E: EncoderBounds> fmt::Debug for Crf<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Crf<{}>({})", E::NAME, self.value)
    }
}

impl<E: EncoderBounds> Serialize for Crf<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value)
    }
}
