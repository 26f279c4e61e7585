//! 变更检测
//!
//! 固定轮询下绝大多数轮次没有真实变化，这一步只为省掉无谓的远端
//! 写入，不承担正确性：误报（多写一次）安全，因为 upsert 幂等。

use tally_core::canonical::blob_string;
use tally_core::inventory::AssetSnapshot;

/// 判断本地快照相对远端表示是否有实质变化
///
/// 远端缺失（首次同步）恒为 true；字符串字段以空串归一比较，
/// 三个事实块统一走规范化序列化比较，序列化差异不算变化。
pub fn has_changed(remote: Option<&AssetSnapshot>, local: &AssetSnapshot) -> bool {
    !changed_fields(remote, local).is_empty()
}

/// 列出发生变化的字段名，用于审计明细
pub fn changed_fields(remote: Option<&AssetSnapshot>, local: &AssetSnapshot) -> Vec<&'static str> {
    let remote = match remote {
        Some(r) => r,
        None => {
            return vec![
                "hostname",
                "manufacturer",
                "model",
                "current_user",
                "system_info",
                "hardware_info",
                "network_info",
            ];
        }
    };

    let mut changed = Vec::new();

    // 字符串字段在 wire 解析时已把 null/缺失归一为空串，这里直接比较
    if remote.hostname != local.hostname {
        changed.push("hostname");
    }
    if remote.manufacturer != local.manufacturer {
        changed.push("manufacturer");
    }
    if remote.model != local.model {
        changed.push("model");
    }
    if remote.current_user != local.current_user {
        changed.push("current_user");
    }

    if blob_string(&remote.system_info) != blob_string(&local.system_info) {
        changed.push("system_info");
    }
    if blob_string(&remote.hardware_info) != blob_string(&local.hardware_info) {
        changed.push("hardware_info");
    }
    if blob_string(&remote.network_info) != blob_string(&local.network_info) {
        changed.push("network_info");
    }

    changed
}
