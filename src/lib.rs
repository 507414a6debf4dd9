//! # SysReview Helper
//!
//! 一个为系统综述批量给文献打相关性分数的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（并发令牌），只暴露能力
//! - `AdmissionController` - 限制同时进行的评分调用数量
//! - `ScoringOracle` - "给一篇文献打分"的能力及失败分类
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇文献
//! - `LlmService` - 调用 OpenAI 兼容接口评分
//! - `extract_score` - 从响应文本中提取 1-10 的分数
//! - `ResultWriter` - 写出评分结果
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇文献"的完整评分流程
//! - `JobCtx` - 上下文封装（序号 + 标题预览）
//! - `RetryPolicy` - 失败分类 → 退避时间 / 放弃
//! - `JobFlow` - 流程编排（令牌 → 调用 → 提取 → 重试）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 文件读写和整批调度
//! - `orchestrator/scoring_run` - 并发评分，保持输入顺序
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{AdmissionController, ErrorClass, OracleFailure, ScoringOracle};
pub use models::{ArticlePayload, ArticleRecord, Job, JobResult, RunSummary};
pub use orchestrator::{App, ProgressEvent, ProgressSnapshot, RunSettings, ScoringOrchestrator};
pub use services::{extract_score, LlmService};
pub use workflow::{JobCtx, JobFlow, JobState, RetryDecision, RetryPolicy};
