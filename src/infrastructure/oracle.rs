//! 评分服务能力 - 基础设施层
//!
//! 只定义"给一篇文献打分"这一能力及其失败分类，不关心重试和并发

use std::fmt;
use std::future::Future;

use crate::models::ArticlePayload;

/// 单次调用的失败分类
///
/// 由适配器在每次失败时给出，下游不再重新分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// 远端明确限流（HTTP 429 等）
    RateLimited,
    /// 额度或账单耗尽
    QuotaExceeded,
    /// 其他值得重试的远端/网络错误（超时、5xx 等）
    Transient,
    /// 认证失败，不可重试
    Fatal,
    /// 调用成功但响应中没有可解析的分数
    Unrecognized,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::RateLimited => "rate-limited",
            ErrorClass::QuotaExceeded => "quota-exceeded",
            ErrorClass::Transient => "transient",
            ErrorClass::Fatal => "fatal",
            ErrorClass::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

/// 单次调用失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleFailure {
    pub class: ErrorClass,
    pub message: String,
}

impl OracleFailure {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl fmt::Display for OracleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.class, self.message)
    }
}

impl std::error::Error for OracleFailure {}

/// 评分能力
///
/// 实现方必须可以被多个任务并发共享（只读）。
/// 成功时返回原始文本，由调用方负责提取分数。
pub trait ScoringOracle: Send + Sync {
    fn score(
        &self,
        theme: &str,
        payload: &ArticlePayload,
    ) -> impl Future<Output = Result<String, OracleFailure>> + Send;
}
