//! API 密钥存储
//!
//! 密钥保存在可执行文件旁的 `sysreviewhelper_key.txt` 中；
//! 环境变量 `OPENAI_API_KEY` 优先。

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult, CredentialError};

/// 密钥文件名
pub const KEY_FILE_NAME: &str = "sysreviewhelper_key.txt";

/// 优先读取的环境变量
pub const KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// 密钥存储
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
    env_var: Option<&'static str>,
}

impl KeyStore {
    /// 可执行文件所在目录下的密钥文件
    pub fn default_location() -> AppResult<Self> {
        let exe = std::env::current_exe()
            .map_err(|e| CredentialError::NoKeyLocation(e.to_string()))?;
        let dir = exe
            .parent()
            .ok_or_else(|| CredentialError::NoKeyLocation(exe.display().to_string()))?;
        Ok(Self::at(dir.join(KEY_FILE_NAME)))
    }

    /// 指定密钥文件路径
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_var: Some(KEY_ENV_VAR),
        }
    }

    /// 只读文件，不看环境变量
    pub fn without_env(mut self) -> Self {
        self.env_var = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取密钥，环境变量优先，都没有时返回 `None`
    pub fn load(&self) -> Option<String> {
        if let Some(name) = self.env_var {
            if let Some(key) = std::env::var(name).ok().and_then(non_empty) {
                debug!("使用环境变量 {} 中的密钥", name);
                return Some(key);
            }
        }

        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(non_empty)
    }

    /// 保存密钥（覆盖已有文件）
    pub fn save(&self, key: &str) -> AppResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CredentialError::EmptyKey.into());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
        }
        std::fs::write(&self.path, key)
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;

        info!("🔑 密钥已保存至: {}", self.path.display());
        Ok(())
    }

    /// 删除密钥文件，返回是否真的删除了
    pub fn delete(&self) -> AppResult<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        info!("🗑️ 已删除密钥文件: {}", self.path.display());
        Ok(true)
    }

    /// 用于显示的掩码形式
    pub fn masked(&self) -> Option<String> {
        self.load().map(|key| mask_key(&key))
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 保留前 3 位和后 4 位
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
