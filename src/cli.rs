//! 命令行接口
//!
//! 子命令：parse / score / run / key；全局参数覆盖配置文件与环境变量。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::Config;

/// 系统综述文献相关性批量评分工具
#[derive(Debug, Parser)]
#[command(name = "sysreview", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径（默认 ./sysreview.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 显示详细日志
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// 同时进行的评分请求数量
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// 单篇文献最多尝试次数
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// 模型名称
    #[arg(long, global = true)]
    pub model: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 把 EndNote 标签格式的导出文件解析为 CSV
    Parse {
        /// 导出文件（.txt）
        input: PathBuf,

        /// 输出 CSV（默认 data/parsed_articles.csv）
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// 为 CSV 中的文献评分
    Score {
        /// 输入 CSV（默认 data/parsed_articles.csv）
        #[arg(long)]
        input: Option<PathBuf>,

        /// 输出 CSV（默认 data/parsed_articles_scored.csv）
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        theme: ThemeArgs,
    },

    /// 解析导出文件后直接评分
    Run {
        /// 导出文件（.txt）
        input: PathBuf,

        /// 输出 CSV（默认 data/parsed_articles_scored.csv）
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        theme: ThemeArgs,
    },

    /// 管理保存的 API 密钥
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum KeyAction {
    /// 保存密钥
    Set { key: String },
    /// 显示已保存的密钥（掩码）
    Show,
    /// 删除已保存的密钥
    Delete,
}

/// 评分主题
#[derive(Debug, Default, Args)]
pub struct ThemeArgs {
    /// 评分主题文本
    #[arg(long, conflicts_with = "theme_file")]
    pub theme: Option<String>,

    /// 从文件读取评分主题
    #[arg(long)]
    pub theme_file: Option<PathBuf>,
}

impl ThemeArgs {
    /// 命令行 > 文件 > 配置
    pub fn resolve(&self, config: &Config) -> Result<String> {
        if let Some(theme) = self.theme.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(theme.to_string());
        }
        if let Some(path) = &self.theme_file {
            let theme = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取主题文件: {}", path.display()))?;
            let theme = theme.trim();
            if !theme.is_empty() {
                return Ok(theme.to_string());
            }
        }
        Ok(config.theme.clone())
    }
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// 把全局参数覆盖到配置上
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(n) = self.concurrency {
            config.max_concurrent_requests = n;
        }
        if let Some(n) = self.max_retries {
            config.max_retries = n;
        }
        if let Some(model) = &self.model {
            config.model_name = model.clone();
        }
        if self.verbose {
            config.verbose_logging = true;
        }
        config
    }
}
