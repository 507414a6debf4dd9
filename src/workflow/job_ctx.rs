//! 评分任务上下文
//!
//! 封装"我正在处理第几篇文献"这一信息，仅用于日志

use std::fmt::Display;

use crate::utils::logging::truncate_text;

/// 评分任务上下文
#[derive(Debug, Clone)]
pub struct JobCtx {
    /// 文献在输入中的位置（从 0 开始）
    pub index: usize,

    /// 本批文献总数
    pub total: usize,

    /// 标题预览
    pub title_preview: String,
}

impl JobCtx {
    pub fn new(index: usize, total: usize, title: &str) -> Self {
        Self {
            index,
            total,
            title_preview: truncate_text(title, 60),
        }
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文献 #{}/{}]", self.index + 1, self.total)
    }
}
