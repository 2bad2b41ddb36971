//! x264 CRF 范围 + 体积搜索阶梯常量
//!
//! 所有搜索相关的数字只在这里定义一次。

// --- libx264 ---

pub const X264_CRF_MIN: u8 = 0;
pub const X264_CRF_MAX: u8 = 51;
/// libx264's own default when no `-crf` is given
pub const X264_CRF_DEFAULT: u8 = 23;

// --- size search ladder ---

/// First attempt of every search
pub const SEARCH_CRF_START: u8 = 20;
pub const SEARCH_CRF_STEP: u8 = 3;
/// 到达此值后 CRF 不再升高，改为降分辨率、再降音频码率
pub const SEARCH_CRF_CEILING: u8 = 35;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Hard cap on any caller-supplied attempt limit
pub const EMERGENCY_MAX_ATTEMPTS: u32 = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_fits_x264_range() {
        assert!(SEARCH_CRF_START < SEARCH_CRF_CEILING);
        assert!(SEARCH_CRF_CEILING <= X264_CRF_MAX);
        assert_eq!((SEARCH_CRF_CEILING - SEARCH_CRF_START) % SEARCH_CRF_STEP, 0);
        assert!(DEFAULT_MAX_ATTEMPTS <= EMERGENCY_MAX_ATTEMPTS);
    }
}
