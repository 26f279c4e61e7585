//! 统一错误处理系统
//!
//! 同步引擎的错误分类决定了重试行为：只有传输层错误会按策略重试，
//! 其余错误要么被就地吸收（采集、校验），要么直接终止本轮同步。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 同步错误分类
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SyncError {
    // === 采集错误（单个分区失败，不阻塞其它分区） ===
    #[error("Collection failed: {section} - {message}")]
    Collection { section: String, message: String },

    // === 传输层错误（超时、连接失败、畸形响应） ===
    #[error("Transport error: {message}")]
    Transport { message: String },

    // === 远端校验错误（结构完好的响应中携带的业务错误） ===
    #[error("Validation rejected: {message}")]
    Validation { message: String },

    // === 自然键冲突（create 时序列号已存在） ===
    #[error("Asset already exists: {serial_number}")]
    IdentityConflict { serial_number: String },

    // === 配置错误 ===
    #[error("Config error: {message}")]
    Config { message: String },

    // === 内部错误 ===
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    /// 判断错误是否可重试
    ///
    /// 仅传输层错误可重试；校验错误重发同样会被拒绝，
    /// 键冲突则由调用方回退到 lookup-then-update。
    pub fn is_retriable(&self) -> bool {
        matches!(self, SyncError::Transport { .. })
    }

    /// 创建采集错误（带分区上下文）
    pub fn collection(section: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Collection {
            section: section.into(),
            message: message.into(),
        }
    }

    /// 创建传输错误
    pub fn transport(message: impl Into<String>) -> Self {
        SyncError::Transport {
            message: message.into(),
        }
    }

    /// 创建校验错误
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation {
            message: message.into(),
        }
    }

    /// 创建键冲突错误
    pub fn identity_conflict(serial_number: impl Into<String>) -> Self {
        SyncError::IdentityConflict {
            serial_number: serial_number.into(),
        }
    }

    /// 创建配置错误
    pub fn config_error(message: impl Into<String>) -> Self {
        SyncError::Config {
            message: message.into(),
        }
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        SyncError::Internal {
            message: message.into(),
        }
    }

    /// 审计用的错误类别标签
    pub fn kind_label(&self) -> &'static str {
        match self {
            SyncError::Collection { .. } => "collection",
            SyncError::Transport { .. } => "transport",
            SyncError::Validation { .. } => "validation",
            SyncError::IdentityConflict { .. } => "identity_conflict",
            SyncError::Config { .. } => "config",
            SyncError::Internal { .. } => "internal",
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::ConnectionRefused => {
                SyncError::Transport { message }
            }
            _ => SyncError::Internal { message },
        }
    }
}

/// 同步操作的 Result 类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
