//! 进度统计
//!
//! 每完成一篇文献生成一次快照：已用时间、速率、预计剩余时间

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// 某一时刻的进度快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    /// 每秒完成篇数，elapsed 为 0 时为 0
    pub rate: f64,
    /// 预计剩余秒数，rate 为 0 时为 0
    pub eta_secs: f64,
}

impl ProgressSnapshot {
    pub fn at(start: Instant, now: Instant, completed: usize, total: usize) -> Self {
        let elapsed = now.saturating_duration_since(start);
        let secs = elapsed.as_secs_f64();
        let rate = if secs > 0.0 { completed as f64 / secs } else { 0.0 };
        let remaining = total.saturating_sub(completed) as f64;
        let eta_secs = if rate > 0.0 { remaining / rate } else { 0.0 };

        Self {
            completed,
            total,
            elapsed,
            rate,
            eta_secs,
        }
    }

    /// 每 10 篇以及最后 5 篇各报告一次
    pub fn should_report(&self) -> bool {
        self.completed % 10 == 0 || self.completed + 5 > self.total
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "进度: {}/{} | 用时 {:.1}s | 速率 {:.2} 篇/s | 预计剩余 {:.1}s",
            self.completed,
            self.total,
            self.elapsed.as_secs_f64(),
            self.rate,
            self.eta_secs
        )
    }
}

/// 单篇完成事件，由编排层发给展示层
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    pub index: usize,
    pub score: Option<u8>,
    pub snapshot: ProgressSnapshot,
}
