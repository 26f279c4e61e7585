//! 同步引擎
//!
//! 每轮按状态机推进：COLLECTING → MERGING → CHECKING → SYNCING_ASSET
//! → SYNCING_SOFTWARE → DONE，任一步骤失败进入 ERROR 后短路到 DONE，
//! 但绝不中止调度器。每个终态恰好产生一条审计记录。

use crate::application::ports::{AssetRepositoryPort, FactCollectorPort, SoftwareSourcePort};
use crate::application::services::change::{changed_fields, has_changed};
use crate::application::services::merge::{filter_software, merge_software};
use crate::domain::{CycleReport, CycleResult};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tally_core::error::{Result, SyncError};
use tally_core::inventory::{
    AssetSnapshot, AssetWrite, BatchResult, RemoteAsset, SoftwareFact, SyncOutcome,
};
use tally_core::retry::{RetryPolicy, retry_with_policy};
use tally_core::types::{AssetId, SerialNumber};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Collecting,
    Merging,
    Checking,
    SyncingAsset,
    SyncingSoftware,
    Done,
    Error,
}

impl CycleState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Merging => "merging",
            Self::Checking => "checking",
            Self::SyncingAsset => "syncing_asset",
            Self::SyncingSoftware => "syncing_software",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

/// 一轮采集的分区结果；失败分区降级为空对象并记入 errors
struct CollectedFacts {
    system: Value,
    hardware: Value,
    network: Value,
    errors: Vec<String>,
}

impl CollectedFacts {
    fn empty() -> Self {
        Self {
            system: json!({}),
            hardware: json!({}),
            network: json!({}),
            errors: Vec::new(),
        }
    }
}

pub struct SyncEngine {
    collectors: Vec<Arc<dyn FactCollectorPort>>,
    /// 软件来源，按优先级排列（排前者对同名条目胜出）
    software_sources: Vec<Arc<dyn SoftwareSourcePort>>,
    repository: Arc<dyn AssetRepositoryPort>,
    excluded_keywords: Vec<String>,
    retry_policy: RetryPolicy,
}

impl SyncEngine {
    pub fn new(
        collectors: Vec<Arc<dyn FactCollectorPort>>,
        software_sources: Vec<Arc<dyn SoftwareSourcePort>>,
        repository: Arc<dyn AssetRepositoryPort>,
        excluded_keywords: Vec<String>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            collectors,
            software_sources,
            repository,
            excluded_keywords,
            retry_policy,
        }
    }

    /// 执行一轮完整的采集-合并-检测-同步
    ///
    /// 永不失败：所有错误被吸收进报告与审计记录。`last_synced` 是
    /// 上一轮成功同步后的远端表示，由工作线程在轮与轮之间显式传递；
    /// 返回更新后的缓存值。
    pub async fn run_cycle(
        &self,
        last_synced: Option<RemoteAsset>,
    ) -> (CycleReport, Option<RemoteAsset>) {
        let cycle_id = Uuid::now_v7().to_string();
        let started_at = Utc::now();
        info!(cycle = %cycle_id, "Starting inventory scan cycle");
        transition(CycleState::Collecting, &cycle_id);

        let facts = self.collect_sections().await;
        let mut collection_errors = facts.errors.clone();

        transition(CycleState::Merging, &cycle_id);
        let software = self.gather_software(&mut collection_errors).await;
        let local = self.build_snapshot(&facts);

        transition(CycleState::Checking, &cycle_id);
        let step = async {
            let known = self.resolve_remote(&local, last_synced.as_ref()).await?;
            if let Some(existing) = &known {
                if !has_changed(Some(&existing.snapshot), &local) {
                    debug!(
                        serial = %local.serial_number,
                        "No material change detected, skipping asset write"
                    );
                    return Ok((existing.clone(), AssetWrite::Unchanged));
                }
            }
            transition(CycleState::SyncingAsset, &cycle_id);
            self.write_asset(&local, known).await
        };
        let (remote, asset_write) = match step.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // 资产身份未确立，软件无从挂靠，本轮中止
                transition(CycleState::Error, &cycle_id);
                let report = self.failed_report(
                    &cycle_id,
                    started_at,
                    None,
                    software.len(),
                    collection_errors,
                    &e,
                );
                self.record(
                    &local.serial_number,
                    SyncOutcome::error(
                        format!("Scan cycle aborted: {}", e),
                        json!({
                            "cycle_id": &cycle_id,
                            "step": "asset",
                            "error_kind": e.kind_label(),
                        }),
                    ),
                )
                .await;
                transition(CycleState::Done, &cycle_id);
                return (report, last_synced);
            }
        };

        transition(CycleState::SyncingSoftware, &cycle_id);
        let batch = if software.is_empty() {
            debug!(cycle = %cycle_id, "No software facts collected, skipping batch");
            None
        } else {
            match self.sync_software(remote.id, &software).await {
                Ok(batch) => Some(batch),
                Err(e) => {
                    transition(CycleState::Error, &cycle_id);
                    let report = self.failed_report(
                        &cycle_id,
                        started_at,
                        Some(asset_write),
                        software.len(),
                        collection_errors,
                        &e,
                    );
                    self.record(
                        &local.serial_number,
                        SyncOutcome::error(
                            format!("Software batch failed: {}", e),
                            json!({
                                "cycle_id": &cycle_id,
                                "step": "software",
                                "error_kind": e.kind_label(),
                                "asset_write": asset_write.as_str(),
                            }),
                        ),
                    )
                    .await;
                    transition(CycleState::Done, &cycle_id);
                    // 资产步骤已完成，缓存推进到新的远端表示
                    return (report, Some(remote));
                }
            }
        };

        transition(CycleState::Done, &cycle_id);

        if asset_write == AssetWrite::Created {
            // 首次注册是重要的远端状态迁移，额外打一个 sync 标记
            self.record(
                &local.serial_number,
                SyncOutcome::sync(
                    "Asset registered",
                    json!({ "cycle_id": &cycle_id, "serial_number": local.serial_number.as_str() }),
                ),
            )
            .await;
        }

        let details = json!({
            "cycle_id": &cycle_id,
            "asset_write": asset_write.as_str(),
            "software_total": software.len(),
            "batch_created": batch.as_ref().map(|b| b.created),
            "batch_updated": batch.as_ref().map(|b| b.updated),
            "item_errors": batch.as_ref().map(|b| b.item_errors.clone()),
            "collection_errors": &collection_errors,
        });

        let wrote = asset_write != AssetWrite::Unchanged;
        let outcome = if wrote {
            SyncOutcome::change(
                format!("Asset {} during scan", asset_write.as_str()),
                details,
            )
        } else {
            SyncOutcome::scan("Scan completed, no material change", details)
        };
        self.record(&local.serial_number, outcome).await;

        let report = CycleReport {
            cycle_id,
            result: if wrote {
                CycleResult::Changed
            } else {
                CycleResult::Clean
            },
            asset_write: Some(asset_write),
            software_total: software.len(),
            batch,
            collection_errors,
            error: None,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            cycle = %report.cycle_id,
            result = ?report.result,
            software = report.software_total,
            "Scan cycle finished"
        );
        (report, Some(remote))
    }

    /// 资产同步：有缓存先比对缓存省掉远端读；否则按序列号查询。
    /// 不存在则创建，存在且无变化则免写返回现有 id，有变化则更新。
    pub async fn sync_asset(
        &self,
        local: &AssetSnapshot,
        cached: Option<&RemoteAsset>,
    ) -> Result<(RemoteAsset, AssetWrite)> {
        let known = self.resolve_remote(local, cached).await?;
        if let Some(existing) = &known {
            if !has_changed(Some(&existing.snapshot), local) {
                debug!(
                    serial = %local.serial_number,
                    "No material change detected, skipping asset write"
                );
                return Ok((existing.clone(), AssetWrite::Unchanged));
            }
        }
        self.write_asset(local, known).await
    }

    /// 取得远端当前表示：同序列号的缓存直接用，否则按序列号查询
    async fn resolve_remote(
        &self,
        local: &AssetSnapshot,
        cached: Option<&RemoteAsset>,
    ) -> Result<Option<RemoteAsset>> {
        match cached {
            Some(c) if c.snapshot.serial_number == local.serial_number => Ok(Some(c.clone())),
            _ => {
                retry_with_policy(
                    || self.repository.lookup_asset_by_serial(&local.serial_number),
                    self.retry_policy,
                    "asset.lookup",
                )
                .await
            }
        }
    }

    /// 执行实际写入：已知则更新，未知则创建（键冲突回退为更新）
    async fn write_asset(
        &self,
        local: &AssetSnapshot,
        known: Option<RemoteAsset>,
    ) -> Result<(RemoteAsset, AssetWrite)> {
        if let Some(existing) = known {
            let fields = changed_fields(Some(&existing.snapshot), local);
            info!(serial = %local.serial_number, ?fields, "Asset changed, updating");
            retry_with_policy(
                || self.repository.update_asset(existing.id, local),
                self.retry_policy,
                "asset.update",
            )
            .await?;
            return Ok((
                RemoteAsset {
                    id: existing.id,
                    snapshot: local.clone(),
                },
                AssetWrite::Updated,
            ));
        }

        match retry_with_policy(
            || self.repository.create_asset(local),
            self.retry_policy,
            "asset.create",
        )
        .await
        {
            Ok(id) => {
                info!(serial = %local.serial_number, %id, "Asset created");
                Ok((
                    RemoteAsset {
                        id,
                        snapshot: local.clone(),
                    },
                    AssetWrite::Created,
                ))
            }
            Err(SyncError::IdentityConflict { .. }) => {
                // 序列号已被抢先注册：回退为 lookup-then-update
                warn!(
                    serial = %local.serial_number,
                    "Serial already registered remotely, falling back to update"
                );
                let existing = retry_with_policy(
                    || self.repository.lookup_asset_by_serial(&local.serial_number),
                    self.retry_policy,
                    "asset.lookup",
                )
                .await?
                .ok_or_else(|| {
                    SyncError::internal(format!(
                        "Asset {} vanished after identity conflict",
                        local.serial_number
                    ))
                })?;
                retry_with_policy(
                    || self.repository.update_asset(existing.id, local),
                    self.retry_policy,
                    "asset.update",
                )
                .await?;
                Ok((
                    RemoteAsset {
                        id: existing.id,
                        snapshot: local.clone(),
                    },
                    AssetWrite::Updated,
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// 软件批量同步：归一化 + 截断后整批上送；单条失败记录在
    /// `item_errors` 里，不终止批次。
    pub async fn sync_software(
        &self,
        asset_id: AssetId,
        items: &[SoftwareFact],
    ) -> Result<BatchResult> {
        let sanitized: Vec<SoftwareFact> = items.iter().map(SoftwareFact::sanitized).collect();

        let batch = retry_with_policy(
            || self.repository.bulk_upsert_software(asset_id, &sanitized),
            self.retry_policy,
            "software.bulk_upsert",
        )
        .await?;

        if batch.item_errors.is_empty() {
            info!(
                created = batch.created,
                updated = batch.updated,
                "Software batch synchronized"
            );
        } else {
            warn!(
                created = batch.created,
                updated = batch.updated,
                rejected = batch.item_errors.len(),
                "Software batch synchronized with per-item errors"
            );
        }
        Ok(batch)
    }

    async fn collect_sections(&self) -> CollectedFacts {
        let mut facts = CollectedFacts::empty();
        for collector in &self.collectors {
            let section = collector.section();
            match collector.collect().await {
                Ok(tree) => match section {
                    "system" => facts.system = tree,
                    "hardware" => facts.hardware = tree,
                    "network" => facts.network = tree,
                    other => warn!(section = other, "Ignoring unknown fact section"),
                },
                Err(e) => {
                    warn!(section, error = %e, "Fact section failed, proceeding without it");
                    facts.errors.push(format!("{}: {}", section, e));
                }
            }
        }
        facts
    }

    async fn gather_software(&self, errors: &mut Vec<String>) -> Vec<SoftwareFact> {
        let mut lists = Vec::new();
        for source in &self.software_sources {
            match source.enumerate().await {
                Ok(list) => {
                    debug!(source = source.name(), count = list.len(), "Software source enumerated");
                    lists.push(list);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Software source failed, skipping");
                    errors.push(format!("software/{}: {}", source.name(), e));
                }
            }
        }
        filter_software(merge_software(lists), &self.excluded_keywords)
    }

    /// 从采集到的事实树组装本地快照；身份字段显式取默认值
    fn build_snapshot(&self, facts: &CollectedFacts) -> AssetSnapshot {
        let field = |key: &str| -> String {
            facts
                .system
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Unknown")
                .to_string()
        };

        let mut snapshot = AssetSnapshot::new(SerialNumber::new(field("serial_number")));
        snapshot.hostname = field("hostname");
        snapshot.manufacturer = field("manufacturer");
        snapshot.model = field("model");
        snapshot.current_user = field("current_user");
        snapshot.system_info = facts.system.clone();
        snapshot.hardware_info = facts.hardware.clone();
        snapshot.network_info = facts.network.clone();
        snapshot.last_seen = Utc::now();
        snapshot
    }

    fn failed_report(
        &self,
        cycle_id: &str,
        started_at: chrono::DateTime<Utc>,
        asset_write: Option<AssetWrite>,
        software_total: usize,
        collection_errors: Vec<String>,
        error: &SyncError,
    ) -> CycleReport {
        CycleReport {
            cycle_id: cycle_id.to_string(),
            result: CycleResult::Failed,
            asset_write,
            software_total,
            batch: None,
            collection_errors,
            error: Some(error.to_string()),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// 审计记录是尽力而为的：失败打日志，绝不影响本轮结果
    async fn record(&self, serial: &SerialNumber, outcome: SyncOutcome) {
        if let Err(e) = self.repository.record_outcome(serial, &outcome).await {
            warn!(
                error = %e,
                kind = outcome.kind.as_str(),
                "Failed to record sync outcome"
            );
        }
    }
}

fn transition(to: CycleState, cycle_id: &str) {
    debug!(cycle = cycle_id, state = to.as_str(), "Cycle state");
}
