use async_trait::async_trait;
use tally_core::error::Result;
use tally_core::inventory::SoftwareFact;

/// 已安装软件的枚举源
///
/// 多个源按调用方给定的优先级合并，排在前面的源对同名条目胜出。
#[async_trait]
pub trait SoftwareSourcePort: Send + Sync {
    /// 来源标签，写入每条记录的 `source` 字段
    fn name(&self) -> &'static str;

    async fn enumerate(&self) -> Result<Vec<SoftwareFact>>;
}
