//! AttemptGuard - 尝试次数守卫
//!
//! 每次编码尝试前先 `claim()`；预算用完后返回 `AttemptError`，计数不再前进。
//! 调用方给的上限会被 `EMERGENCY_MAX_ATTEMPTS` 再兜一次底。

use crate::crf_constants::EMERGENCY_MAX_ATTEMPTS;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Attempt limit exceeded: {requested}/{max} in {context}")]
pub struct AttemptError {
    /// Index that was refused
    pub requested: u32,
    pub max: u32,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct AttemptGuard {
    used: u32,
    max: u32,
    context: String,
}

impl AttemptGuard {
    pub fn new(max: u32, context: impl Into<String>) -> Self {
        Self {
            used: 0,
            max: max.min(EMERGENCY_MAX_ATTEMPTS),
            context: context.into(),
        }
    }

    /// Claims the next attempt and returns its 1-based index.
    pub fn claim(&mut self) -> Result<u32, AttemptError> {
        if self.used >= self.max {
            return Err(AttemptError {
                requested: self.used + 1,
                max: self.max,
                context: self.context.clone(),
            });
        }
        self.used += 1;
        Ok(self.used)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn remaining(&self) -> u32 {
        self.max - self.used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_are_one_based() {
        let mut guard = AttemptGuard::new(3, "search");
        assert_eq!(guard.claim(), Ok(1));
        assert_eq!(guard.claim(), Ok(2));
        assert_eq!(guard.remaining(), 1);
        assert_eq!(guard.claim(), Ok(3));
        assert_eq!(guard.remaining(), 0);
    }

    #[test]
    fn test_refusal_does_not_advance() {
        let mut guard = AttemptGuard::new(1, "size search");
        guard.claim().unwrap();
        let err = guard.claim().unwrap_err();
        assert_eq!(err.to_string(), "Attempt limit exceeded: 2/1 in size search");
        assert!(guard.claim().is_err());
        assert_eq!(guard.used(), 1);
    }

    #[test]
    fn test_emergency_cap() {
        assert_eq!(AttemptGuard::new(u32::MAX, "x").max(), EMERGENCY_MAX_ATTEMPTS);
        assert_eq!(AttemptGuard::new(0, "x").remaining(), 0);
    }
}
