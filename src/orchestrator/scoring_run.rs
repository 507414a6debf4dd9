//! 批量评分编排器 - 编排层
//!
//! 为每篇文献启动一个任务，所有任务共享同一个准入控制器，
//! 全部结束后按输入顺序返回结果。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::infrastructure::{AdmissionController, ScoringOracle};
use crate::models::{Job, JobResult};
use crate::orchestrator::progress::{ProgressEvent, ProgressSnapshot};
use crate::workflow::{JobCtx, JobFlow, RetryPolicy};

/// 编排参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    pub max_concurrent: usize,
    pub max_retries: u32,
    /// 每篇完成后的间隔，不占用令牌
    pub sleep_between_calls: Duration,
    pub give_up_on_quota: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            max_retries: 5,
            sleep_between_calls: Duration::from_millis(200),
            give_up_on_quota: false,
        }
    }
}

/// 批量评分编排器
pub struct ScoringOrchestrator<O> {
    oracle: Arc<O>,
    admission: Arc<AdmissionController>,
    policy: RetryPolicy,
    sleep_between_calls: Duration,
    cancel: CancellationToken,
    progress: Option<UnboundedSender<ProgressEvent>>,
}

impl<O: ScoringOracle + 'static> ScoringOrchestrator<O> {
    pub fn new(oracle: Arc<O>, settings: RunSettings) -> Self {
        Self {
            oracle,
            admission: Arc::new(AdmissionController::new(settings.max_concurrent)),
            policy: RetryPolicy::new(settings.max_retries)
                .with_give_up_on_quota(settings.give_up_on_quota),
            sleep_between_calls: settings.sleep_between_calls,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// 订阅每篇完成事件
    pub fn with_progress(mut self, tx: UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// 使用外部的取消信号（如 Ctrl-C）
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// 评分全部任务
    ///
    /// 返回结果与 `jobs` 一一对应，按 index 升序；
    /// 被取消或放弃的文献记为失败。
    pub async fn run(&self, jobs: Vec<Job>, theme: &str) -> Vec<JobResult> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let start = Instant::now();
        let completed = Arc::new(AtomicUsize::new(0));
        let quota_warned = Arc::new(AtomicBool::new(false));
        let theme: Arc<str> = Arc::from(theme);

        let mut handles = Vec::with_capacity(total);

        for job in jobs {
            let index = job.index;
            let ctx = JobCtx::new(index, total, &job.payload.title);
            let flow = JobFlow::new(
                self.oracle.clone(),
                self.admission.clone(),
                self.policy,
                self.cancel.clone(),
                quota_warned.clone(),
            );
            let theme = theme.clone();
            let cancel = self.cancel.clone();
            let spacing = self.sleep_between_calls;
            let completed = completed.clone();
            let progress = self.progress.clone();

            let handle = tokio::spawn(async move {
                let outcome = flow.run(&job, &theme, &ctx).await;

                if !spacing.is_zero() {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(spacing) => {}
                    }
                }

                record_completion(&completed, start, total, index, outcome.score, progress.as_ref());
                outcome.into_result(index)
            });
            handles.push((index, handle));
        }

        let (indices, handles): (Vec<usize>, Vec<_>) = handles.into_iter().unzip();
        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(total);
        for (index, joined) in indices.into_iter().zip(joined) {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("[文献 #{}/{}] 任务执行失败: {}", index + 1, total, e);
                    record_completion(&completed, start, total, index, None, self.progress.as_ref());
                    results.push(JobResult::failed(index, 0));
                }
            }
        }

        results.sort_by_key(|r| r.index);
        results
    }
}

fn record_completion(
    completed: &AtomicUsize,
    start: Instant,
    total: usize,
    index: usize,
    score: Option<u8>,
    progress: Option<&UnboundedSender<ProgressEvent>>,
) {
    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
    let snapshot = ProgressSnapshot::at(start, Instant::now(), done, total);

    if snapshot.should_report() {
        info!("📈 {}", snapshot);
    }

    if let Some(tx) = progress {
        // 接收端已关闭时忽略
        let _ = tx.send(ProgressEvent {
            index,
            score,
            snapshot,
        });
    }
}
