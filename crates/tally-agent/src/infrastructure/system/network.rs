//! 网络分区采集（接口、地址、MAC）

use crate::application::ports::FactCollectorPort;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use sysinfo::Networks;
use tally_core::error::Result;
use tracing::debug;

pub struct NetworkCollector;

impl NetworkCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NetworkCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct InterfaceFacts {
    ipv4: Vec<String>,
    ipv6: Vec<String>,
    loopback: bool,
}

#[async_trait]
impl FactCollectorPort for NetworkCollector {
    fn section(&self) -> &'static str {
        "network"
    }

    async fn collect(&self) -> Result<Value> {
        // 地址来自 if_addrs，MAC 来自 sysinfo，按接口名汇合
        let mut interfaces: BTreeMap<String, InterfaceFacts> = BTreeMap::new();

        for ifa in if_addrs::get_if_addrs().unwrap_or_default() {
            let entry = interfaces.entry(ifa.name.clone()).or_default();
            entry.loopback = ifa.is_loopback();
            match ifa.addr {
                if_addrs::IfAddr::V4(v4) => entry.ipv4.push(v4.ip.to_string()),
                if_addrs::IfAddr::V6(v6) => entry.ipv6.push(v6.ip.to_string()),
            }
        }

        let networks = Networks::new_with_refreshed_list();
        let mac_map: BTreeMap<&str, String> = networks
            .iter()
            .map(|(name, data)| (name.as_str(), data.mac_address().to_string()))
            .collect();

        let rows: Vec<Value> = interfaces
            .iter()
            .map(|(name, facts)| {
                json!({
                    "name": name,
                    "mac": mac_map.get(name.as_str()),
                    "ipv4": facts.ipv4,
                    "ipv6": facts.ipv6,
                    "loopback": facts.loopback,
                })
            })
            .collect();

        debug!(interfaces = rows.len(), "Collected network facts");
        Ok(json!({ "interfaces": rows }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_returns_interface_list() {
        let facts = NetworkCollector::new().collect().await.unwrap();
        assert!(facts["interfaces"].is_array());
    }
}
