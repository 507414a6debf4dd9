use crate::error::{AppError, AppResult, FileError};
use crate::models::article::ArticleRecord;
use std::fs;
use std::path::Path;

/// 评分必需的列
const REQUIRED_COLUMNS: [&str; 2] = ["title", "abstract"];

/// 确保父目录存在
pub(crate) fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
    }
    Ok(())
}

/// 把解析出的记录写成 CSV
///
/// 列：authors, title, abstract, year_published, doi
pub fn write_records_csv(path: &Path, records: &[ArticleRecord]) -> AppResult<()> {
    ensure_parent_dir(path)?;
    let path_str = path.display().to_string();

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| AppError::file_write_failed(&path_str, e))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::file_write_failed(&path_str, e))?;

    tracing::info!("已保存解析结果: {} (共 {} 行)", path_str, records.len());
    Ok(())
}

/// 从 CSV 读取记录，要求包含 title 与 abstract 列
pub fn load_records_csv(path: &Path) -> AppResult<Vec<ArticleRecord>> {
    let path_str = path.display().to_string();
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound { path: path_str }));
    }

    let mut reader =
        csv::Reader::from_path(path).map_err(|e| AppError::file_read_failed(&path_str, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::file_read_failed(&path_str, e))?
        .iter()
        .map(str::to_string)
        .collect();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(AppError::File(FileError::MissingColumn {
                path: path_str,
                required: required.to_string(),
                found: headers,
            }));
        }
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<ArticleRecord>() {
        records.push(row.map_err(|e| AppError::file_read_failed(&path_str, e))?);
    }
    Ok(records)
}
