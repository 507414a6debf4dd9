//! 单篇文献评分流程 - 流程层
//!
//! 核心职责：定义"一篇文献"从申请令牌到拿到最终结果的完整过程
//!
//! 流程顺序：
//! 1. 申请准入令牌（可被取消）
//! 2. 调用评分服务，调用结束立即归还令牌
//! 3. 提取分数 → 成功结束
//! 4. 失败 → 交给重试策略 → 等待（可被取消）→ 回到 1

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::infrastructure::{AdmissionController, ErrorClass, OracleFailure, ScoringOracle};
use crate::models::{Job, JobResult};
use crate::services::extract_score;
use crate::utils::logging::truncate_text;
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::retry_policy::{RetryDecision, RetryPolicy};

/// 单篇文献的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Attempting,
    Retrying,
    Succeeded,
    Exhausted,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Exhausted | JobState::Cancelled
        )
    }
}

/// 流程结束时的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowOutcome {
    pub state: JobState,
    pub score: Option<u8>,
    pub attempts: u32,
}

impl FlowOutcome {
    pub fn into_result(self, index: usize) -> JobResult {
        match (self.state, self.score) {
            (JobState::Succeeded, Some(score)) => JobResult::succeeded(index, score, self.attempts),
            _ => JobResult::failed(index, self.attempts),
        }
    }
}

/// 单篇文献评分流程
///
/// - 令牌只覆盖一次调用，退避等待期间不占用
/// - 额度告警整批只打印一次（`quota_warned` 由编排层共享）
/// - 不持有文献数据，只依赖评分能力
pub struct JobFlow<O> {
    oracle: Arc<O>,
    admission: Arc<AdmissionController>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    quota_warned: Arc<AtomicBool>,
}

impl<O: ScoringOracle> JobFlow<O> {
    pub fn new(
        oracle: Arc<O>,
        admission: Arc<AdmissionController>,
        policy: RetryPolicy,
        cancel: CancellationToken,
        quota_warned: Arc<AtomicBool>,
    ) -> Self {
        Self {
            oracle,
            admission,
            policy,
            cancel,
            quota_warned,
        }
    }

    pub async fn run(&self, job: &Job, theme: &str, ctx: &JobCtx) -> FlowOutcome {
        let mut state = JobState::Pending;
        let mut attempts: u32 = 0;

        debug!("{} 开始评分: {}", ctx, ctx.title_preview);

        loop {
            if self.cancel.is_cancelled() {
                return self.finish(ctx, &mut state, JobState::Cancelled, None, attempts);
            }

            let token = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return self.finish(ctx, &mut state, JobState::Cancelled, None, attempts);
                }
                acquired = self.admission.acquire() => match acquired {
                    Ok(token) => token,
                    Err(e) => {
                        error!("{} ❌ 无法获取并发令牌: {}", ctx, e);
                        return self.finish(ctx, &mut state, JobState::Exhausted, None, attempts);
                    }
                },
            };

            transition(ctx, &mut state, JobState::Attempting);
            attempts += 1;
            let response = self.oracle.score(theme, &job.payload).await;
            self.admission.release(token);

            let failure = match response {
                Ok(text) => match extract_score(&text) {
                    Some(score) => {
                        return self.finish(ctx, &mut state, JobState::Succeeded, Some(score), attempts);
                    }
                    None => OracleFailure::new(
                        ErrorClass::Unrecognized,
                        format!("无法从响应中提取分数: {:?}", truncate_text(&text, 40)),
                    ),
                },
                Err(failure) => failure,
            };

            if failure.class == ErrorClass::QuotaExceeded {
                warn_quota_once(&self.quota_warned, &failure.message);
            }

            match self.policy.decide(failure.class, attempts) {
                RetryDecision::GiveUp => {
                    warn!("{} ❌ 放弃评分 (共尝试 {} 次): {}", ctx, attempts, failure);
                    return self.finish(ctx, &mut state, JobState::Exhausted, None, attempts);
                }
                RetryDecision::RetryAfter(delay) => {
                    transition(ctx, &mut state, JobState::Retrying);
                    info!(
                        "{} ⚠️ 第 {}/{} 次尝试失败 {}，{:.1}s 后重试",
                        ctx,
                        attempts,
                        self.policy.max_retries,
                        failure,
                        delay.as_secs_f64()
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            return self.finish(ctx, &mut state, JobState::Cancelled, None, attempts);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    fn finish(
        &self,
        ctx: &JobCtx,
        state: &mut JobState,
        terminal: JobState,
        score: Option<u8>,
        attempts: u32,
    ) -> FlowOutcome {
        debug_assert!(terminal.is_terminal());
        transition(ctx, state, terminal);
        match terminal {
            JobState::Succeeded => debug!("{} ✓ 得分 {:?} (尝试 {} 次)", ctx, score, attempts),
            JobState::Cancelled => debug!("{} 已取消", ctx),
            _ => {}
        }
        FlowOutcome {
            state: terminal,
            score,
            attempts,
        }
    }
}

/// 整批只打印一次额度告警，返回本次是否打印
fn warn_quota_once(warned: &AtomicBool, message: &str) -> bool {
    if warned.swap(true, Ordering::SeqCst) {
        return false;
    }
    warn!("💳 API 额度/账单错误，请检查账户余额与用量上限: {}", message);
    true
}

fn transition(ctx: &JobCtx, state: &mut JobState, next: JobState) {
    trace!("{} {:?} → {:?}", ctx, state, next);
    *state = next;
}
