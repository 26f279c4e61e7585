use async_trait::async_trait;
use tally_core::error::Result;
use tally_core::inventory::{AssetSnapshot, BatchResult, RemoteAsset, SoftwareFact, SyncOutcome};
use tally_core::types::{AssetId, SerialNumber};

/// 远端清单存储的窄契约
///
/// 每个操作都可独立重试、可安全重复；远端按 `(assetId, name, version)`
/// 做软件 upsert，按序列号保证资产唯一。
#[async_trait]
pub trait AssetRepositoryPort: Send + Sync {
    /// 按序列号查询资产，不存在返回 None
    async fn lookup_asset_by_serial(&self, serial: &SerialNumber) -> Result<Option<RemoteAsset>>;

    /// 创建资产；序列号已存在时返回 `SyncError::IdentityConflict`
    async fn create_asset(&self, snapshot: &AssetSnapshot) -> Result<AssetId>;

    /// 更新可变字段并刷新 last_seen
    async fn update_asset(&self, id: AssetId, snapshot: &AssetSnapshot) -> Result<()>;

    /// 整批软件 upsert；接受零条或多条，单条失败不终止批次
    async fn bulk_upsert_software(
        &self,
        id: AssetId,
        items: &[SoftwareFact],
    ) -> Result<BatchResult>;

    /// 追加一条审计记录（尽力而为，失败由调用方记日志）
    async fn record_outcome(&self, serial: &SerialNumber, outcome: &SyncOutcome) -> Result<()>;
}
