//! 重试策略
//!
//! 纯函数：(失败分类, 第几次尝试) → 等多久再试 / 放弃

use std::time::Duration;

use crate::infrastructure::ErrorClass;

/// 限流退避步长（乘以尝试次数）
const RATE_LIMIT_STEP: Duration = Duration::from_secs(3);
/// 普通错误退避步长
const TRANSIENT_STEP: Duration = Duration::from_secs(1);
/// 无法识别分数时的退避步长
const UNRECOGNIZED_STEP: Duration = Duration::from_millis(500);
/// 额度错误退避步长
const QUOTA_STEP: Duration = Duration::from_secs(1);

/// 重试决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 等待指定时间后重试
    RetryAfter(Duration),
    /// 放弃该篇
    GiveUp,
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 单篇最多尝试次数（含第一次）
    pub max_retries: u32,
    /// 额度耗尽时立即放弃
    pub give_up_on_quota: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            give_up_on_quota: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_give_up_on_quota(mut self, give_up: bool) -> Self {
        self.give_up_on_quota = give_up;
        self
    }

    /// `attempt` 是刚刚失败的那次尝试的序号（从 1 开始）
    pub fn decide(&self, class: ErrorClass, attempt: u32) -> RetryDecision {
        let step = match class {
            ErrorClass::Fatal => return RetryDecision::GiveUp,
            ErrorClass::QuotaExceeded if self.give_up_on_quota => return RetryDecision::GiveUp,
            ErrorClass::RateLimited => RATE_LIMIT_STEP,
            ErrorClass::Transient => TRANSIENT_STEP,
            ErrorClass::Unrecognized => UNRECOGNIZED_STEP,
            ErrorClass::QuotaExceeded => QUOTA_STEP,
        };

        if attempt >= self.max_retries {
            return RetryDecision::GiveUp;
        }

        RetryDecision::RetryAfter(step * attempt.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_backoff_scales_by_three_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(ErrorClass::RateLimited, 1),
            RetryDecision::RetryAfter(Duration::from_secs(3))
        );
        assert_eq!(
            policy.decide(ErrorClass::RateLimited, 4),
            RetryDecision::RetryAfter(Duration::from_secs(12))
        );
    }

    #[test]
    fn transient_and_unrecognized_are_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(ErrorClass::Transient, 2),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(
            policy.decide(ErrorClass::Unrecognized, 3),
            RetryDecision::RetryAfter(Duration::from_millis(1500))
        );
    }

    #[test]
    fn quota_retries_by_default() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(ErrorClass::QuotaExceeded, 1),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
    }

    #[test]
    fn quota_can_short_circuit() {
        let policy = RetryPolicy::default().with_give_up_on_quota(true);
        assert_eq!(policy.decide(ErrorClass::QuotaExceeded, 1), RetryDecision::GiveUp);
        // 其他分类不受影响
        assert!(matches!(
            policy.decide(ErrorClass::Transient, 1),
            RetryDecision::RetryAfter(_)
        ));
    }

    #[test]
    fn fatal_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.decide(ErrorClass::Fatal, 1), RetryDecision::GiveUp);
    }

    #[test]
    fn gives_up_on_last_attempt() {
        let policy = RetryPolicy::new(5);
        for attempt in 1..5 {
            assert!(matches!(
                policy.decide(ErrorClass::Transient, attempt),
                RetryDecision::RetryAfter(_)
            ));
        }
        assert_eq!(policy.decide(ErrorClass::Transient, 5), RetryDecision::GiveUp);
        assert_eq!(policy.decide(ErrorClass::RateLimited, 6), RetryDecision::GiveUp);
    }

    #[test]
    fn single_attempt_policy() {
        let policy = RetryPolicy::new(1);
        assert_eq!(policy.decide(ErrorClass::Transient, 1), RetryDecision::GiveUp);
    }
}
