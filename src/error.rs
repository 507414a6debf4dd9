use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 导出文件解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 评分服务错误
    #[error("评分服务错误: {0}")]
    Oracle(#[from] OracleError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 密钥存储错误
    #[error("密钥错误: {0}")]
    Credential(#[from] CredentialError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// CSV 缺少必需列
    #[error("CSV 必须包含 '{required}' 列 ({path})，实际列: {found:?}")]
    MissingColumn {
        path: String,
        required: String,
        found: Vec<String>,
    },
}

/// 导出文件解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// 文件中没有任何有效记录
    #[error("未找到有效记录 ({path})，请确认是带 %A/%T/%D/%R/%X 标签的 EndNote 导出文件")]
    NoRecords { path: String },
}

/// 评分服务错误
#[derive(Debug, Error)]
pub enum OracleError {
    /// 缺少 API 密钥
    #[error("缺少 API 密钥，请先运行 `sysreview key set <KEY>` 或设置 OPENAI_API_KEY")]
    MissingApiKey,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 密钥存储错误
#[derive(Debug, Error)]
pub enum CredentialError {
    /// 密钥为空
    #[error("API 密钥为空")]
    EmptyKey,
    /// 无法确定密钥文件位置
    #[error("无法确定密钥文件位置: {0}")]
    NoKeyLocation(String),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建配置值非法错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_found_headers() {
        let err = AppError::File(FileError::MissingColumn {
            path: "data/a.csv".into(),
            required: "abstract".into(),
            found: vec!["title".into(), "doi".into()],
        });
        let text = err.to_string();
        assert!(text.contains("'abstract'"));
        assert!(text.contains("\"title\""));
    }

    #[test]
    fn invalid_config_display() {
        let err = AppError::invalid_config("max_retries", "必须大于 0");
        assert_eq!(err.to_string(), "配置错误: 配置项 max_retries 非法: 必须大于 0");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
    }
}
