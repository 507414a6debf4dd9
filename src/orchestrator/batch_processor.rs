//! 批量文献处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责文件读写和整批评分的调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、创建评分服务
//! 2. **加载**：解析导出文件或读取 CSV（`Vec<ArticleRecord>`）
//! 3. **评分**：委托 `ScoringOrchestrator` 并发评分
//! 4. **写出**：把分数写回 CSV，失败的条目留空
//! 5. **全局统计**：汇总成功/失败数量
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单篇文献的细节
//! - **可取消**：外部取消信号会传到每个评分任务，已完成的结果照常写出

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, ParseError};
use crate::infrastructure::ScoringOracle;
use crate::models::{load_export, load_records_csv, write_records_csv, ArticleRecord, Job, JobResult, RunSummary};
use crate::orchestrator::progress::ProgressEvent;
use crate::orchestrator::scoring_run::ScoringOrchestrator;
use crate::services::{LlmService, ResultWriter};
use crate::utils::logging::{log_preview, log_records_loaded, log_startup, print_final_stats};

/// 预览显示的条数
const PREVIEW_ROWS: usize = 10;

/// 应用主结构
pub struct App<O = LlmService> {
    config: Config,
    oracle: Arc<O>,
    cancel: CancellationToken,
}

impl App<LlmService> {
    /// 初始化应用（使用 OpenAI 兼容接口）
    pub fn initialize(config: Config, api_key: &str) -> AppResult<Self> {
        let service = LlmService::new(&config, api_key);
        Self::with_oracle(config, Arc::new(service))
    }
}

impl<O: ScoringOracle + 'static> App<O> {
    /// 使用任意评分服务初始化
    pub fn with_oracle(config: Config, oracle: Arc<O>) -> AppResult<Self> {
        config.validate()?;
        log_startup(&config);

        Ok(Self {
            config,
            oracle,
            cancel: CancellationToken::new(),
        })
    }

    /// 使用外部取消信号
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 解析导出文件并评分
    pub async fn run_export(&self, export_path: &Path, output: &Path, theme: &str) -> Result<RunSummary> {
        let parsed_path = self.config.parsed_csv_path();
        parse_to_csv(export_path, &parsed_path).await?;
        self.score_csv(&parsed_path, output, theme).await
    }

    /// 读取 CSV，评分并写出
    pub async fn score_csv(&self, input: &Path, output: &Path, theme: &str) -> Result<RunSummary> {
        info!("\n📁 正在读取: {}", input.display());
        let records = load_records_csv(input)
            .with_context(|| format!("无法加载待评分文献: {}", input.display()))?;

        if records.is_empty() {
            warn!("⚠️ 没有找到待评分的文献，程序结束");
            return Ok(RunSummary::default());
        }

        log_records_loaded(records.len(), self.config.max_concurrent_requests);

        let results = self.score_records(&records, theme).await;

        ResultWriter::write(output, &records, &results)
            .with_context(|| format!("无法写出评分结果: {}", output.display()))?;

        let summary = RunSummary::from_results(&results);
        log_preview(&records, &results, PREVIEW_ROWS);
        print_final_stats(&summary, output);

        Ok(summary)
    }

    /// 对内存中的记录评分，结果与记录一一对应
    pub async fn score_records(&self, records: &[ArticleRecord], theme: &str) -> Vec<JobResult> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();

        let listener = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event.score {
                    Some(score) => debug!("[文献 #{}] 得分 {}", event.index + 1, score),
                    None => debug!("[文献 #{}] 未得分", event.index + 1),
                }
            }
        });

        let orchestrator = ScoringOrchestrator::new(self.oracle.clone(), self.config.run_settings())
            .with_progress(tx)
            .with_cancellation(self.cancel.clone());

        let results = orchestrator.run(Job::from_records(records), theme).await;

        // 关闭发送端，等待监听任务收尾
        drop(orchestrator);
        let _ = listener.await;

        if self.cancel.is_cancelled() {
            warn!("⚠️ 评分已被取消，未完成的文献记为失败");
        }

        results
    }
}

/// 解析导出文件并写出 CSV，返回解析出的记录
pub async fn parse_to_csv(input: &Path, output: &Path) -> Result<Vec<ArticleRecord>> {
    info!("\n📁 正在解析导出文件: {}", input.display());
    let records = load_export(input).await?;

    if records.is_empty() {
        return Err(ParseError::NoRecords {
            path: input.display().to_string(),
        }
        .into());
    }

    write_records_csv(output, &records)
        .with_context(|| format!("无法写出解析结果: {}", output.display()))?;
    info!("✓ 已写出 {} 条记录: {}", records.len(), output.display());

    Ok(records)
}
