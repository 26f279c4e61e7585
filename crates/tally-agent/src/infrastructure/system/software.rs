//! 已安装软件的枚举源
//!
//! 两个来源按优先级合并：dpkg 状态库是权威来源，desktop 条目
//! 作为补充（能看到不走包管理器安装的应用）。解析是纯函数，
//! 文件读取失败整源降级，由引擎记入采集错误。

use crate::application::ports::SoftwareSourcePort;
use async_trait::async_trait;
use std::path::PathBuf;
use tally_core::error::{Result, SyncError};
use tally_core::inventory::SoftwareFact;
use tracing::debug;

const DPKG_STATUS_PATH: &str = "/var/lib/dpkg/status";
const DESKTOP_ENTRY_DIR: &str = "/usr/share/applications";

/// dpkg 状态库枚举源
pub struct DpkgSource {
    status_path: PathBuf,
}

impl DpkgSource {
    pub fn new() -> Self {
        Self {
            status_path: PathBuf::from(DPKG_STATUS_PATH),
        }
    }

    pub fn with_status_path(path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: path.into(),
        }
    }
}

impl Default for DpkgSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SoftwareSourcePort for DpkgSource {
    fn name(&self) -> &'static str {
        "dpkg"
    }

    async fn enumerate(&self) -> Result<Vec<SoftwareFact>> {
        let text = std::fs::read_to_string(&self.status_path).map_err(|e| {
            SyncError::collection(
                "software",
                format!("cannot read {}: {}", self.status_path.display(), e),
            )
        })?;
        let facts = parse_dpkg_status(&text);
        debug!(count = facts.len(), "Enumerated dpkg packages");
        Ok(facts)
    }
}

/// 解析 dpkg status 文本：空行分段，只保留已安装的包
fn parse_dpkg_status(text: &str) -> Vec<SoftwareFact> {
    let mut facts = Vec::new();

    for stanza in text.split("\n\n") {
        let mut name = "";
        let mut version = "";
        let mut maintainer = "";
        let mut installed = false;

        for line in stanza.lines() {
            if let Some(value) = line.strip_prefix("Package: ") {
                name = value.trim();
            } else if let Some(value) = line.strip_prefix("Version: ") {
                version = value.trim();
            } else if let Some(value) = line.strip_prefix("Maintainer: ") {
                maintainer = value.trim();
            } else if let Some(value) = line.strip_prefix("Status: ") {
                installed = value.trim() == "install ok installed";
            }
        }

        if !name.is_empty() && installed {
            facts.push(
                SoftwareFact::new(name, "dpkg")
                    .with_version(version)
                    .with_publisher(maintainer),
            );
        }
    }

    facts
}

/// desktop 条目枚举源（`.desktop` 文件）
pub struct DesktopEntrySource {
    dir: PathBuf,
}

impl DesktopEntrySource {
    pub fn new() -> Self {
        Self {
            dir: PathBuf::from(DESKTOP_ENTRY_DIR),
        }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Default for DesktopEntrySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SoftwareSourcePort for DesktopEntrySource {
    fn name(&self) -> &'static str {
        "desktop"
    }

    async fn enumerate(&self) -> Result<Vec<SoftwareFact>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            SyncError::collection(
                "software",
                format!("cannot read {}: {}", self.dir.display(), e),
            )
        })?;

        let mut facts = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "desktop") {
                continue;
            }
            if let Ok(text) = std::fs::read_to_string(&path) {
                if let Some(fact) = parse_desktop_entry(&text) {
                    facts.push(fact);
                }
            }
        }

        debug!(count = facts.len(), "Enumerated desktop entries");
        Ok(facts)
    }
}

/// 解析单个 desktop 条目；没有 Name 的条目没有身份，丢弃
fn parse_desktop_entry(text: &str) -> Option<SoftwareFact> {
    let mut in_main_section = false;
    let mut name = None;
    let mut version = String::new();
    let mut exec = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_main_section = line == "[Desktop Entry]";
            continue;
        }
        if !in_main_section {
            continue;
        }
        if let Some(value) = line.strip_prefix("Name=") {
            name.get_or_insert_with(|| value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Version=") {
            version = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Exec=") {
            exec = value.trim().to_string();
        }
    }

    name.map(|n| {
        SoftwareFact::new(n, "desktop")
            .with_version(version)
            .with_install_location(exec)
    })
}
