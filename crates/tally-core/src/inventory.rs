//! 资产清单数据模型
//!
//! 本地快照每轮扫描重建，远端副本才是权威数据；这里的类型只描述
//! 一次观测的结果以及与远端交换时的归一化规则。

use crate::types::{AssetId, SerialNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 上送前的字段硬截断上限（字符数，超长截断而非拒绝）
pub const NAME_MAX: usize = 255;
pub const VERSION_MAX: usize = 100;
pub const PUBLISHER_MAX: usize = 255;
pub const INSTALL_LOCATION_MAX: usize = 512;
pub const SOURCE_MAX: usize = 50;

/// 一台物理/逻辑机器的一次完整观测
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub serial_number: SerialNumber,
    pub hostname: String,
    pub manufacturer: String,
    pub model: String,
    pub current_user: String,

    /// 三个不透明的结构化事实块，形状由采集源决定
    pub system_info: Value,
    pub hardware_info: Value,
    pub network_info: Value,

    pub last_seen: DateTime<Utc>,
}

impl AssetSnapshot {
    pub fn new(serial_number: SerialNumber) -> Self {
        Self {
            serial_number,
            hostname: String::new(),
            manufacturer: String::new(),
            model: String::new(),
            current_user: String::new(),
            system_info: Value::Object(serde_json::Map::new()),
            hardware_info: Value::Object(serde_json::Map::new()),
            network_info: Value::Object(serde_json::Map::new()),
            last_seen: Utc::now(),
        }
    }
}

/// 远端已存在的资产：服务端主键 + 最近一次写入的快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: AssetId,
    pub snapshot: AssetSnapshot,
}

/// 资产同步步骤的写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetWrite {
    Created,
    Updated,
    /// 无变化，跳过写入
    Unchanged,
}

impl AssetWrite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// 一条已安装软件的观测记录
///
/// 远端的 upsert 身份键是 `(assetId, name, version)`（大小写敏感）；
/// 合并去重阶段只按 case-folded `name` 判重，见 merge 模块。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareFact {
    pub name: String,
    pub version: String,
    pub publisher: String,
    /// 自由文本，来源各异，不保证可解析
    pub install_date: String,
    pub install_location: String,
    pub uninstall_string: String,
    /// 来源标签（dpkg / desktop / ...）
    pub source: String,
    pub detection_date: DateTime<Utc>,
}

impl SoftwareFact {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            publisher: String::new(),
            install_date: String::new(),
            install_location: String::new(),
            uninstall_string: String::new(),
            source: source.into(),
            detection_date: Utc::now(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_install_location(mut self, location: impl Into<String>) -> Self {
        self.install_location = location.into();
        self
    }

    /// 上送前的归一化：缺省字段补默认值，超长字段按字符数硬截断
    pub fn sanitized(&self) -> Self {
        Self {
            name: truncate_chars(self.name.trim(), NAME_MAX),
            version: truncate_chars(or_unknown(&self.version), VERSION_MAX),
            publisher: truncate_chars(or_unknown(&self.publisher), PUBLISHER_MAX),
            install_date: or_unknown(&self.install_date).to_string(),
            install_location: truncate_chars(&self.install_location, INSTALL_LOCATION_MAX),
            uninstall_string: self.uninstall_string.clone(),
            source: truncate_chars(&self.source, SOURCE_MAX),
            detection_date: self.detection_date,
        }
    }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// 按字符边界截断（不是字节）
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// 批量软件 upsert 的聚合结果；单条失败不终止批次
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub created: u32,
    pub updated: u32,
    pub item_errors: Vec<String>,
}

impl BatchResult {
    pub fn written(&self) -> u32 {
        self.created + self.updated
    }
}

/// 审计记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// 整轮成功且无写入
    Scan,
    /// 本轮发生了实际写入
    Change,
    /// 本轮被中止
    Error,
    /// 重要的远端状态迁移标记
    Sync,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Change => "change",
            Self::Error => "error",
            Self::Sync => "sync",
        }
    }
}

/// 一轮同步的审计记录，追加后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub kind: OutcomeKind,
    pub message: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl SyncOutcome {
    fn new(kind: OutcomeKind, message: impl Into<String>, details: Value) -> Self {
        Self {
            kind,
            message: message.into(),
            details,
            created_at: Utc::now(),
        }
    }

    pub fn scan(message: impl Into<String>, details: Value) -> Self {
        Self::new(OutcomeKind::Scan, message, details)
    }

    pub fn change(message: impl Into<String>, details: Value) -> Self {
        Self::new(OutcomeKind::Change, message, details)
    }

    pub fn error(message: impl Into<String>, details: Value) -> Self {
        Self::new(OutcomeKind::Error, message, details)
    }

    pub fn sync(message: impl Into<String>, details: Value) -> Self {
        Self::new(OutcomeKind::Sync, message, details)
    }
}
