//! 硬件分区采集（CPU、内存、磁盘）

use crate::application::ports::FactCollectorPort;
use async_trait::async_trait;
use serde_json::{Value, json};
use sysinfo::{Disks, System};
use tally_core::error::Result;
use tracing::debug;

pub struct HardwareCollector;

impl HardwareCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HardwareCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactCollectorPort for HardwareCollector {
    fn section(&self) -> &'static str {
        "hardware"
    }

    async fn collect(&self) -> Result<Value> {
        let mut sys = System::new_all();
        sys.refresh_all();

        let disks = Disks::new_with_refreshed_list();
        let disk_facts: Vec<Value> = disks
            .iter()
            .map(|disk| {
                json!({
                    "name": disk.name().to_string_lossy(),
                    "mount_point": disk.mount_point().to_string_lossy(),
                    "file_system": disk.file_system().to_string_lossy(),
                    "total_bytes": disk.total_space(),
                    "available_bytes": disk.available_space(),
                })
            })
            .collect();

        let cpu_brand = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().to_string())
            .unwrap_or_default();

        let facts = json!({
            "cpu": {
                "brand": cpu_brand,
                "logical_cores": sys.cpus().len(),
                "frequency_mhz": sys.cpus().first().map(|c| c.frequency()).unwrap_or(0),
            },
            "memory": {
                "total_bytes": sys.total_memory(),
                "available_bytes": sys.available_memory(),
            },
            "disks": disk_facts,
        });

        debug!(
            cpus = sys.cpus().len(),
            disks = disks.len(),
            "Collected hardware facts"
        );
        Ok(facts)
    }
}
