//! 分数提取 - 业务能力层
//!
//! 只负责从模型的自由文本中取出 1-10 的整数

use regex::Regex;
use std::sync::OnceLock;

/// 合法分数范围
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"\b[0-9]+\b").expect("number regex is valid"))
}

/// 从响应文本中提取分数
///
/// 取第一个独立的整数词；只有 1-10 才算有效分数，
/// 其他情况（没有数字、12、0 等）返回 `None`，由调用方按无法识别处理。
///
/// 第一个整数不合法时不会继续往后找：`"2023 trial, score 7"` 返回 `None`，
/// 交给重试拿一个干净的回答，而不是猜测后面的数字才是分数。
pub fn extract_score(text: &str) -> Option<u8> {
    let token = number_regex().find(text.trim())?;
    let value: u64 = token.as_str().parse().ok()?;
    if (u64::from(MIN_SCORE)..=u64::from(MAX_SCORE)).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}
