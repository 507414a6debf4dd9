use crate::models::article::ArticleRecord;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tokio::fs;

/// 可以跨行续写的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Authors,
    Title,
    Year,
    Abstract,
    Doi,
}

fn year_regex() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\b(\d{4})\b").expect("year regex is valid"))
}

/// 拆分 "%T value" 形式的标签行
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'%' && bytes[2] == b' ' {
        Some((&line[..2], line[3..].trim()))
    } else {
        None
    }
}

fn append(target: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(value);
}

fn finalize(records: &mut Vec<ArticleRecord>, current: Option<ArticleRecord>) {
    if let Some(record) = current {
        if !record.is_empty() {
            records.push(record);
        }
    }
}

/// 解析 EndNote / ProQuest 风格的带标签导出文本
///
/// - `%0` 开始新记录
/// - `%A` 作者（可重复）、`%T` 标题、`%D` 年份、`%X` 摘要、`%R` DOI
/// - 无标签的行续写到上一个 `%X` 或 `%T`
pub fn parse_export(text: &str) -> Vec<ArticleRecord> {
    let mut records = Vec::new();
    let mut current: Option<ArticleRecord> = None;
    let mut last_field: Option<Field> = None;

    for raw in text.lines() {
        let line = raw.trim_end();

        let Some((tag, value)) = split_tag(line) else {
            // 续行
            if let (Some(record), Some(field)) = (current.as_mut(), last_field) {
                match field {
                    Field::Abstract => append(&mut record.abstract_text, line.trim()),
                    Field::Title => append(&mut record.title, line.trim()),
                    _ => {}
                }
            }
            continue;
        };

        if tag == "%0" {
            finalize(&mut records, current.take());
            current = Some(ArticleRecord::default());
            last_field = None;
            continue;
        }

        let record = current.get_or_insert_with(ArticleRecord::default);
        last_field = match tag {
            "%A" => {
                if !value.is_empty() {
                    record.authors.push(value.to_string());
                }
                Some(Field::Authors)
            }
            "%T" => {
                append(&mut record.title, value);
                Some(Field::Title)
            }
            "%D" => {
                record.year_published = year_regex()
                    .captures(value)
                    .map(|c| c[1].to_string())
                    .unwrap_or_else(|| value.to_string());
                Some(Field::Year)
            }
            "%X" => {
                append(&mut record.abstract_text, value);
                Some(Field::Abstract)
            }
            "%R" => {
                append(&mut record.doi, value);
                Some(Field::Doi)
            }
            _ => None,
        };
    }

    finalize(&mut records, current);
    records
}

/// 从文件加载并解析导出列表
pub async fn load_export(path: &Path) -> Result<Vec<ArticleRecord>> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("无法读取导出文件: {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let records = parse_export(&text);
    tracing::info!(
        "解析完成: {} 条记录 ({})",
        records.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(records)
}
