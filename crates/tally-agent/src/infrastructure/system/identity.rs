//! 系统身份分区采集
//!
//! 事实树的顶层键是快照组装的契约：serial_number / hostname /
//! manufacturer / model / current_user 由引擎显式读取并补默认值。

use crate::application::ports::FactCollectorPort;
use async_trait::async_trait;
use serde_json::{Value, json};
use sysinfo::System;
use tally_core::error::Result;
use tracing::debug;

pub struct SystemIdentityCollector;

impl SystemIdentityCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemIdentityCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactCollectorPort for SystemIdentityCollector {
    fn section(&self) -> &'static str {
        "system"
    }

    async fn collect(&self) -> Result<Value> {
        let hostname = hostname::get()
            .ok()
            .and_then(|s| s.into_string().ok())
            .unwrap_or_else(|| "Unknown".to_string());

        let facts = json!({
            "hostname": hostname,
            "current_user": current_user(),
            "serial_number": read_serial_number(),
            "manufacturer": read_dmi("sys_vendor"),
            "model": read_dmi("product_name"),
            "os_name": System::name().unwrap_or_default(),
            "os_version": System::os_version().unwrap_or_default(),
            "kernel_version": System::kernel_version().unwrap_or_default(),
            "architecture": std::env::consts::ARCH,
        });

        debug!(hostname = %facts["hostname"], "Collected system identity facts");
        Ok(facts)
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "Unknown".to_string())
}

fn read_dmi(key: &str) -> String {
    std::fs::read_to_string(format!("/sys/class/dmi/id/{}", key))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// 序列号：优先 DMI，读不到（虚机、权限）回退到 machine-id，
/// 保证自然键在一台机器上稳定且非空
fn read_serial_number() -> String {
    let dmi = read_dmi("product_serial");
    if !dmi.is_empty() && dmi != "None" {
        return dmi;
    }
    std::fs::read_to_string("/etc/machine-id")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_always_has_identity_keys() {
        let facts = SystemIdentityCollector::new().collect().await.unwrap();
        for key in [
            "hostname",
            "current_user",
            "serial_number",
            "manufacturer",
            "model",
            "os_name",
            "architecture",
        ] {
            assert!(facts.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn test_current_user_never_empty() {
        assert!(!current_user().is_empty());
    }
}
