//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{ArticleRecord, JobResult, RunSummary};

/// 初始化日志
///
/// 设置了 `RUST_LOG` 时以其为准，否则默认 `info`，详细模式为 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（如测试中）时忽略
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文献相关性批量评分");
    info!("🤖 模型: {} ({})", config.model_name, config.api_base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_requests);
    info!("🔁 单篇最多尝试: {} 次", config.max_retries);
    info!("{}", "=".repeat(60));
}

/// 记录文献加载信息
///
/// # 参数
/// - `total`: 文献总数
/// - `max_concurrent`: 最大并发数
pub fn log_records_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 篇待评分的文献", total);
    info!("📋 同时最多 {} 个评分请求\n", max_concurrent);
}

/// 打印前 `limit` 条 (标题, 分数)
pub fn log_preview(records: &[ArticleRecord], results: &[JobResult], limit: usize) {
    info!("\n{}", "─".repeat(60));
    info!("📄 结果预览（前 {} 条）", limit.min(records.len()));
    for (record, result) in records.iter().zip(results).take(limit) {
        let score = result
            .score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        info!("  [{:>2}] {}", score, truncate_text(&record.title, 70));
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 本次运行的统计
/// - `output_path`: 结果文件路径
pub fn print_final_stats(summary: &RunSummary, output_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部评分完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.succeeded, summary.total);
    info!("❌ 失败: {}", summary.failed);
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", output_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
