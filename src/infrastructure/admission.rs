//! 准入控制 - 基础设施层
//!
//! 持有并发令牌，限制同一时刻正在进行的评分调用数量

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// 准入控制器
///
/// 职责：
/// - 持有 `max_concurrent` 个令牌
/// - 令牌只覆盖一次调用，不覆盖整篇文献（重试之间会释放）
/// - 记录当前与历史最高占用，便于观测
#[derive(Debug)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    gauge: Arc<Gauge>,
}

#[derive(Debug, Default)]
struct Gauge {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// 一次调用的准入令牌，drop 时自动归还
#[derive(Debug)]
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
    gauge: Arc<Gauge>,
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        self.gauge.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionController {
    /// 创建准入控制器，`capacity` 至少为 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            gauge: Arc::new(Gauge::default()),
        }
    }

    /// 等待并获取一个令牌
    pub async fn acquire(&self) -> Result<AdmissionToken, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        let now = self.gauge.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);
        trace!(in_flight = now, capacity = self.capacity, "admission granted");
        Ok(AdmissionToken {
            _permit: permit,
            gauge: self.gauge.clone(),
        })
    }

    /// 归还令牌
    pub fn release(&self, token: AdmissionToken) {
        drop(token);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前持有令牌的数量
    pub fn in_flight(&self) -> usize {
        self.gauge.in_flight.load(Ordering::SeqCst)
    }

    /// 历史最高同时持有数量
    pub fn peak_in_flight(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }
}
