//! 集成测试共用的桩实现：可脚本化的远端仓储 + 固定内容的采集器
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tally_agent::application::ports::{
    AssetRepositoryPort, FactCollectorPort, SoftwareSourcePort,
};
use tally_core::error::{Result, SyncError};
use tally_core::inventory::{
    AssetSnapshot, BatchResult, RemoteAsset, SoftwareFact, SyncOutcome,
};
use tally_core::types::{AssetId, SerialNumber};

#[derive(Default)]
pub struct MockState {
    pub assets: HashMap<String, RemoteAsset>,
    pub next_id: i64,
    /// 操作日志，按调用顺序
    pub calls: Vec<String>,
    pub outcomes: Vec<(String, SyncOutcome)>,
    /// 最近一次 bulk 调用收到的条目
    pub last_batch_items: Vec<SoftwareFact>,
    /// 预设的 bulk 响应；None 则按条目数全部计为 created
    pub bulk_response: Option<BatchResult>,
    /// 所有远端调用都以传输错误失败
    pub fail_all_transport: bool,
    /// create_asset 固定返回键冲突
    pub create_conflicts: bool,
    /// 前 N 次 lookup 假装未找到（用于构造 create 竞态）
    pub lookup_misses_remaining: u32,
}

#[derive(Default, Clone)]
pub struct MockRepository {
    pub state: Arc<Mutex<MockState>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            })),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    pub fn outcomes(&self) -> Vec<(String, SyncOutcome)> {
        self.state.lock().unwrap().outcomes.clone()
    }

    /// 往远端预置一个资产
    pub fn seed_asset(&self, remote: RemoteAsset) {
        let mut state = self.state.lock().unwrap();
        state
            .assets
            .insert(remote.snapshot.serial_number.as_str().to_string(), remote);
    }

    fn check_transport(&self, op: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op.to_string());
        if state.fail_all_transport {
            Err(SyncError::transport(format!("{}: connection refused", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AssetRepositoryPort for MockRepository {
    async fn lookup_asset_by_serial(&self, serial: &SerialNumber) -> Result<Option<RemoteAsset>> {
        self.check_transport("lookup")?;
        let mut state = self.state.lock().unwrap();
        if state.lookup_misses_remaining > 0 {
            state.lookup_misses_remaining -= 1;
            return Ok(None);
        }
        Ok(state.assets.get(serial.as_str()).cloned())
    }

    async fn create_asset(&self, snapshot: &AssetSnapshot) -> Result<AssetId> {
        self.check_transport("create")?;
        let mut state = self.state.lock().unwrap();
        if state.create_conflicts || state.assets.contains_key(snapshot.serial_number.as_str()) {
            return Err(SyncError::identity_conflict(snapshot.serial_number.as_str()));
        }
        let id = AssetId::new(state.next_id);
        state.next_id += 1;
        state.assets.insert(
            snapshot.serial_number.as_str().to_string(),
            RemoteAsset {
                id,
                snapshot: snapshot.clone(),
            },
        );
        Ok(id)
    }

    async fn update_asset(&self, id: AssetId, snapshot: &AssetSnapshot) -> Result<()> {
        self.check_transport("update")?;
        let mut state = self.state.lock().unwrap();
        state.assets.insert(
            snapshot.serial_number.as_str().to_string(),
            RemoteAsset {
                id,
                snapshot: snapshot.clone(),
            },
        );
        Ok(())
    }

    async fn bulk_upsert_software(
        &self,
        _id: AssetId,
        items: &[SoftwareFact],
    ) -> Result<BatchResult> {
        self.check_transport("bulk")?;
        let mut state = self.state.lock().unwrap();
        state.last_batch_items = items.to_vec();
        match &state.bulk_response {
            Some(canned) => Ok(canned.clone()),
            None => Ok(BatchResult {
                created: items.len() as u32,
                updated: 0,
                item_errors: vec![],
            }),
        }
    }

    async fn record_outcome(&self, serial: &SerialNumber, outcome: &SyncOutcome) -> Result<()> {
        // 审计通道独立于 fail_all_transport，便于断言错误轮次也有记录
        let mut state = self.state.lock().unwrap();
        state.calls.push("record".to_string());
        state
            .outcomes
            .push((serial.as_str().to_string(), outcome.clone()));
        Ok(())
    }
}

/// 返回固定事实树的采集器
pub struct CannedCollector {
    section: &'static str,
    tree: Value,
}

impl CannedCollector {
    pub fn new(section: &'static str, tree: Value) -> Self {
        Self { section, tree }
    }
}

#[async_trait]
impl FactCollectorPort for CannedCollector {
    fn section(&self) -> &'static str {
        self.section
    }

    async fn collect(&self) -> Result<Value> {
        Ok(self.tree.clone())
    }
}

/// 总是失败的采集器，用于验证分区降级
pub struct FailingCollector {
    section: &'static str,
}

impl FailingCollector {
    pub fn new(section: &'static str) -> Self {
        Self { section }
    }
}

#[async_trait]
impl FactCollectorPort for FailingCollector {
    fn section(&self) -> &'static str {
        self.section
    }

    async fn collect(&self) -> Result<Value> {
        Err(SyncError::collection(self.section, "probe failed"))
    }
}

/// 返回固定条目列表的软件来源
pub struct CannedSource {
    name: &'static str,
    items: Vec<SoftwareFact>,
}

impl CannedSource {
    pub fn new(name: &'static str, items: Vec<SoftwareFact>) -> Self {
        Self { name, items }
    }
}

#[async_trait]
impl SoftwareSourcePort for CannedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn enumerate(&self) -> Result<Vec<SoftwareFact>> {
        Ok(self.items.clone())
    }
}
