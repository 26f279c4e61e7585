use async_trait::async_trait;
use serde_json::Value;
use tally_core::error::Result;

/// 单个分区的事实采集接口
///
/// 返回的事实树形状由采集源决定，引擎只透传；分区之间相互独立，
/// 单个分区失败不阻塞其它分区。
#[async_trait]
pub trait FactCollectorPort: Send + Sync {
    /// 分区名（system / hardware / network）
    fn section(&self) -> &'static str;

    /// 采集本分区的事实树
    async fn collect(&self) -> Result<Value>;
}
