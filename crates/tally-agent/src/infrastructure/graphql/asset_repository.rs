//! 远端清单仓储的 GraphQL 实现
//!
//! 查询/变更文档与服务端 schema 一一对应；事实块按规范化序列化
//! 作为 JSONString 上送，回读时保持原样交给变更检测处理。

use crate::application::ports::AssetRepositoryPort;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tally_core::canonical::canonical_string;
use tally_core::error::{Result, SyncError};
use tally_core::inventory::{AssetSnapshot, BatchResult, RemoteAsset, SoftwareFact, SyncOutcome};
use tally_core::types::{AssetId, SerialNumber};

use super::client::GraphQlClient;

const ASSET_BY_SERIAL: &str = r#"
    query AssetBySerial($serialNumber: String!) {
        assetBySerial(serialNumber: $serialNumber) {
            id
            hostname
            serialNumber
            manufacturer
            model
            currentUser
            systemInfo
            hardwareInfo
            networkInfo
            lastSeen
        }
    }
"#;

const CREATE_ASSET: &str = r#"
    mutation CreateAsset($input: AssetInput!) {
        createAsset(input: $input) {
            asset {
                id
                serialNumber
            }
            success
            errors
        }
    }
"#;

const UPDATE_ASSET: &str = r#"
    mutation UpdateAsset($id: ID!, $input: AssetInput!) {
        updateAsset(id: $id, input: $input) {
            asset {
                id
                serialNumber
            }
            success
            errors
        }
    }
"#;

const BULK_UPSERT_SOFTWARE: &str = r#"
    mutation BulkUpsertSoftware($assetId: Int!, $items: [SoftwareItemInput!]!) {
        bulkUpsertSoftware(assetId: $assetId, items: $items) {
            created
            updated
            success
            errors
        }
    }
"#;

const RECORD_OUTCOME: &str = r#"
    mutation RecordOutcome($serialNumber: String!, $input: SyncOutcomeInput!) {
        recordOutcome(serialNumber: $serialNumber, input: $input) {
            success
            errors
        }
    }
"#;

/// 远端资产行的 wire 形状；缺失字段归一为空串/Null
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRow {
    id: Value,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    serial_number: Option<String>,
    #[serde(default)]
    manufacturer: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    current_user: Option<String>,
    #[serde(default)]
    system_info: Value,
    #[serde(default)]
    hardware_info: Value,
    #[serde(default)]
    network_info: Value,
    #[serde(default)]
    last_seen: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MutationPayload {
    #[serde(default)]
    asset: Option<AssetRef>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AssetRef {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct BulkPayload {
    #[serde(default)]
    created: u32,
    #[serde(default)]
    updated: u32,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct GraphQlAssetRepository {
    client: GraphQlClient,
}

impl GraphQlAssetRepository {
    pub fn new(client: GraphQlClient) -> Self {
        Self { client }
    }

    fn asset_input(snapshot: &AssetSnapshot) -> Value {
        json!({
            "hostname": snapshot.hostname,
            "serialNumber": snapshot.serial_number.as_str(),
            "manufacturer": snapshot.manufacturer,
            "model": snapshot.model,
            "currentUser": snapshot.current_user,
            "systemInfo": canonical_string(&snapshot.system_info),
            "hardwareInfo": canonical_string(&snapshot.hardware_info),
            "networkInfo": canonical_string(&snapshot.network_info),
        })
    }

    fn software_item(fact: &SoftwareFact) -> Value {
        json!({
            "name": fact.name,
            "version": fact.version,
            "publisher": fact.publisher,
            "installDate": fact.install_date,
            "installLocation": fact.install_location,
            "uninstallString": fact.uninstall_string,
            "source": fact.source,
            "detectionDate": fact.detection_date.to_rfc3339(),
        })
    }

    fn payload(data: &Value, field: &str) -> Result<MutationPayload> {
        let node = data
            .get(field)
            .cloned()
            .ok_or_else(|| SyncError::transport(format!("Response missing {} payload", field)))?;
        serde_json::from_value(node)
            .map_err(|e| SyncError::transport(format!("Unexpected {} payload shape: {}", field, e)))
    }
}

/// GraphQL ID 既可能是字符串也可能是数字
fn parse_asset_id(raw: &Value) -> Result<AssetId> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(AssetId::new)
        .ok_or_else(|| SyncError::transport(format!("Unparseable asset id: {}", raw)))
}

fn parse_last_seen(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// 远端把自然键冲突包装成业务错误字符串返回，这里据此分类
fn is_conflict(errors: &[String]) -> bool {
    errors.iter().any(|e| {
        let lowered = e.to_lowercase();
        lowered.contains("unique")
            || lowered.contains("already exists")
            || lowered.contains("duplicate")
    })
}

fn row_to_remote(row: AssetRow) -> Result<RemoteAsset> {
    let id = parse_asset_id(&row.id)?;
    let mut snapshot = AssetSnapshot::new(SerialNumber::new(row.serial_number.unwrap_or_default()));
    snapshot.hostname = row.hostname.unwrap_or_default();
    snapshot.manufacturer = row.manufacturer.unwrap_or_default();
    snapshot.model = row.model.unwrap_or_default();
    snapshot.current_user = row.current_user.unwrap_or_default();
    snapshot.system_info = row.system_info;
    snapshot.hardware_info = row.hardware_info;
    snapshot.network_info = row.network_info;
    snapshot.last_seen = parse_last_seen(row.last_seen.as_deref());
    Ok(RemoteAsset { id, snapshot })
}

#[async_trait]
impl AssetRepositoryPort for GraphQlAssetRepository {
    async fn lookup_asset_by_serial(&self, serial: &SerialNumber) -> Result<Option<RemoteAsset>> {
        let data = self
            .client
            .execute(ASSET_BY_SERIAL, json!({ "serialNumber": serial.as_str() }))
            .await?;

        match data.get("assetBySerial") {
            None | Some(Value::Null) => Ok(None),
            Some(node) => {
                let row: AssetRow = serde_json::from_value(node.clone()).map_err(|e| {
                    SyncError::transport(format!("Unexpected asset row shape: {}", e))
                })?;
                row_to_remote(row).map(Some)
            }
        }
    }

    async fn create_asset(&self, snapshot: &AssetSnapshot) -> Result<AssetId> {
        let data = self
            .client
            .execute(
                CREATE_ASSET,
                json!({ "input": Self::asset_input(snapshot) }),
            )
            .await?;

        let payload = Self::payload(&data, "createAsset")?;
        if !payload.success {
            if is_conflict(&payload.errors) {
                return Err(SyncError::identity_conflict(
                    snapshot.serial_number.as_str(),
                ));
            }
            return Err(SyncError::validation(payload.errors.join("; ")));
        }

        let asset = payload
            .asset
            .ok_or_else(|| SyncError::transport("createAsset succeeded without an asset"))?;
        parse_asset_id(&asset.id)
    }

    async fn update_asset(&self, id: AssetId, snapshot: &AssetSnapshot) -> Result<()> {
        let data = self
            .client
            .execute(
                UPDATE_ASSET,
                json!({
                    "id": id.value().to_string(),
                    "input": Self::asset_input(snapshot),
                }),
            )
            .await?;

        let payload = Self::payload(&data, "updateAsset")?;
        if !payload.success {
            return Err(SyncError::validation(payload.errors.join("; ")));
        }
        Ok(())
    }

    async fn bulk_upsert_software(
        &self,
        id: AssetId,
        items: &[SoftwareFact],
    ) -> Result<BatchResult> {
        let wire_items: Vec<Value> = items.iter().map(Self::software_item).collect();
        let data = self
            .client
            .execute(
                BULK_UPSERT_SOFTWARE,
                json!({ "assetId": id.value(), "items": wire_items }),
            )
            .await?;

        let node = data.get("bulkUpsertSoftware").cloned().ok_or_else(|| {
            SyncError::transport("Response missing bulkUpsertSoftware payload")
        })?;
        let payload: BulkPayload = serde_json::from_value(node).map_err(|e| {
            SyncError::transport(format!("Unexpected bulkUpsertSoftware shape: {}", e))
        })?;

        // 单条失败已体现在 errors 里；整体 success 标志不再单独处理
        Ok(BatchResult {
            created: payload.created,
            updated: payload.updated,
            item_errors: payload.errors,
        })
    }

    async fn record_outcome(&self, serial: &SerialNumber, outcome: &SyncOutcome) -> Result<()> {
        let data = self
            .client
            .execute(
                RECORD_OUTCOME,
                json!({
                    "serialNumber": serial.as_str(),
                    "input": {
                        "kind": outcome.kind.as_str(),
                        "message": outcome.message,
                        "details": canonical_string(&outcome.details),
                        "createdAt": outcome.created_at.to_rfc3339(),
                    },
                }),
            )
            .await?;

        let payload = Self::payload(&data, "recordOutcome")?;
        if !payload.success {
            return Err(SyncError::validation(payload.errors.join("; ")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asset_id_accepts_string_and_number() {
        assert_eq!(parse_asset_id(&json!("42")).unwrap(), AssetId::new(42));
        assert_eq!(parse_asset_id(&json!(7)).unwrap(), AssetId::new(7));
        assert!(parse_asset_id(&json!(null)).is_err());
        assert!(parse_asset_id(&json!("abc")).is_err());
    }

    #[test]
    fn test_conflict_detection_on_error_strings() {
        assert!(is_conflict(&["UNIQUE constraint failed".to_string()]));
        assert!(is_conflict(&["asset already exists".to_string()]));
        assert!(!is_conflict(&["hostname is required".to_string()]));
    }

    #[test]
    fn test_row_to_remote_normalizes_missing_fields() {
        let row: AssetRow = serde_json::from_value(json!({
            "id": "3",
            "serialNumber": "SN-3",
        }))
        .unwrap();
        let remote = row_to_remote(row).unwrap();
        assert_eq!(remote.id, AssetId::new(3));
        assert_eq!(remote.snapshot.hostname, "");
        assert_eq!(remote.snapshot.current_user, "");
        assert!(remote.snapshot.system_info.is_null());
    }

    #[test]
    fn test_asset_input_serializes_blobs_canonically() {
        let mut snapshot = AssetSnapshot::new(SerialNumber::new("SN-1"));
        snapshot.system_info = json!({"b": 1, "a": 2});
        let input = GraphQlAssetRepository::asset_input(&snapshot);
        assert_eq!(input["systemInfo"], json!(r#"{"a":2,"b":1}"#));
        assert_eq!(input["serialNumber"], json!("SN-1"));
    }
}
