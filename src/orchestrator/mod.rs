//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整批评分的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量文献处理器
//! - 管理应用生命周期（初始化、运行）
//! - 读取导出文件 / CSV，写出评分结果
//! - 输出全局统计信息
//!
//! ### `scoring_run` - 评分编排器
//! - 每篇文献一个任务，共享同一个准入控制器
//! - 传播取消信号
//! - 按输入顺序汇总结果
//!
//! ### `progress` - 进度快照
//! - 已用时间、速率、预计剩余时间
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理文件)
//!     ↓
//! scoring_run (处理 Vec<Job>)
//!     ↓
//! workflow::JobFlow (处理单篇文献)
//!     ↓
//! services (能力层：llm / score_parser / result_writer)
//!     ↓
//! infrastructure (基础设施：AdmissionController / ScoringOracle)
//! ```

pub mod batch_processor;
pub mod progress;
pub mod scoring_run;

// 重新导出主要类型
pub use batch_processor::{parse_to_csv, App};
pub use progress::{ProgressEvent, ProgressSnapshot};
pub use scoring_run::{RunSettings, ScoringOrchestrator};
