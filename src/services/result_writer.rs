//! 结果写入服务 - 业务能力层
//!
//! 只负责把评分结果作为 relevancy_score 列写回表格

use std::path::Path;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::loaders::csv_loader::ensure_parent_dir;
use crate::models::{ArticleRecord, JobResult};

const HEADER: [&str; 6] = [
    "authors",
    "title",
    "abstract",
    "year_published",
    "doi",
    "relevancy_score",
];

/// 结果写入服务
///
/// 职责：
/// - 按记录顺序写出 CSV，失败的条目分数留空
/// - 不关心评分流程
pub struct ResultWriter;

impl ResultWriter {
    /// 写出带分数的 CSV
    ///
    /// `results` 必须已按 index 排好序，且与 `records` 一一对应
    pub fn write(path: &Path, records: &[ArticleRecord], results: &[JobResult]) -> AppResult<()> {
        if records.len() != results.len() {
            return Err(AppError::Other(format!(
                "记录数 {} 与结果数 {} 不一致",
                records.len(),
                results.len()
            )));
        }

        ensure_parent_dir(path)?;
        let path_str = path.display().to_string();
        debug!("写入评分结果: {} ({} 行)", path_str, records.len());

        let mut writer =
            csv::Writer::from_path(path).map_err(|e| AppError::file_write_failed(&path_str, e))?;
        writer
            .write_record(HEADER)
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        for (record, result) in records.iter().zip(results) {
            let score = result.score.map(|s| s.to_string()).unwrap_or_default();
            writer
                .write_record([
                    record.authors.join("; ").as_str(),
                    record.title.as_str(),
                    record.abstract_text.as_str(),
                    record.year_published.as_str(),
                    record.doi.as_str(),
                    score.as_str(),
                ])
                .map_err(|e| AppError::file_write_failed(&path_str, e))?;
        }

        writer
            .flush()
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
        Ok(())
    }
}
