//! 程序配置
//!
//! 加载顺序：默认值 → `sysreview.toml`（可选）→ 环境变量 → 命令行参数。

use crate::error::{AppError, AppResult, ConfigError};
use crate::orchestrator::RunSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "sysreview.toml";

/// 默认评分主题
pub const DEFAULT_THEME: &str = "You are a behavioral medicine researcher conducting a systematic review. \
Looking for articles that examined intervention studies which measure physical activity \
and that use mobile apps and/or wearable technology either to measure PA or to deliver an \
intervention intended to influence PA levels.";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时进行的评分请求数量
    pub max_concurrent_requests: usize,
    /// 单篇文献最多尝试次数
    pub max_retries: u32,
    /// 每篇文献完成后的间隔（秒）
    pub sleep_between_calls_sec: f64,
    /// 单次请求超时（秒）
    pub request_timeout_sec: u64,
    /// 额度耗尽时是否直接放弃该篇（默认照常重试）
    pub give_up_on_quota: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 数据目录（解析结果与评分结果默认存放位置）
    pub data_dir: String,
    /// 评分主题
    pub theme: String,
    // --- LLM 配置 ---
    pub api_base_url: String,
    pub model_name: String,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            max_retries: 5,
            sleep_between_calls_sec: 0.2,
            request_timeout_sec: 60,
            give_up_on_quota: false,
            verbose_logging: false,
            data_dir: "data".to_string(),
            theme: DEFAULT_THEME.to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// `path` 为空时读取当前目录下的 `sysreview.toml`，文件不存在则使用默认值。
    /// 显式指定的文件不存在时报错。
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
            Self::from_toml_str(&contents, &path)?
        } else if explicit {
            return Err(AppError::File(crate::error::FileError::NotFound {
                path: path.display().to_string(),
            }));
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    fn from_toml_str(contents: &str, path: &Path) -> AppResult<Self> {
        toml::from_str::<Config>(contents).map_err(|source| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    /// 用环境变量覆盖配置
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_concurrent_requests: env_parse("MAX_CONCURRENT_REQUESTS").unwrap_or(self.max_concurrent_requests),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(self.max_retries),
            sleep_between_calls_sec: env_parse("SLEEP_BETWEEN_CALLS_SEC").unwrap_or(self.sleep_between_calls_sec),
            request_timeout_sec: env_parse("REQUEST_TIMEOUT_SEC").unwrap_or(self.request_timeout_sec),
            give_up_on_quota: env_parse("GIVE_UP_ON_QUOTA").unwrap_or(self.give_up_on_quota),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            data_dir: std::env::var("DATA_DIR").unwrap_or(self.data_dir),
            theme: std::env::var("SCORING_THEME").unwrap_or(self.theme),
            api_base_url: std::env::var("OPENAI_API_BASE").unwrap_or(self.api_base_url),
            model_name: std::env::var("OPENAI_MODEL").unwrap_or(self.model_name),
            temperature: env_parse("OPENAI_TEMPERATURE").unwrap_or(self.temperature),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_requests == 0 {
            return Err(AppError::invalid_config("max_concurrent_requests", "必须大于 0"));
        }
        if self.max_retries == 0 {
            return Err(AppError::invalid_config("max_retries", "必须大于 0"));
        }
        if !self.sleep_between_calls_sec.is_finite() || self.sleep_between_calls_sec < 0.0 {
            return Err(AppError::invalid_config("sleep_between_calls_sec", "不能为负数"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::invalid_config("temperature", "必须在 [0, 2] 之间"));
        }
        if self.request_timeout_sec == 0 {
            return Err(AppError::invalid_config("request_timeout_sec", "必须大于 0"));
        }
        Ok(())
    }

    /// 编排相关参数
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            max_concurrent: self.max_concurrent_requests,
            max_retries: self.max_retries,
            sleep_between_calls: Duration::from_secs_f64(self.sleep_between_calls_sec.max(0.0)),
            give_up_on_quota: self.give_up_on_quota,
        }
    }

    /// 默认的解析结果路径
    pub fn parsed_csv_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("parsed_articles.csv")
    }

    /// 默认的评分结果路径
    pub fn scored_csv_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("parsed_articles_scored.csv")
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
