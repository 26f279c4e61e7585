use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::inventory::{AssetWrite, BatchResult};

/// Agent 运行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentStatus {
    Initializing,
    Running,
    Stopping, // 已收到停止信号，等待当前轮结束
    Stopped,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

/// 一轮扫描的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleResult {
    /// 成功且无远端写入
    Clean,
    /// 成功且发生了写入
    Changed,
    /// 本轮被中止
    Failed,
}

/// 一轮扫描的汇总报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: String,
    pub result: CycleResult,
    pub asset_write: Option<AssetWrite>,
    /// 合并去重过滤之后实际上送的软件条数
    pub software_total: usize,
    pub batch: Option<BatchResult>,
    /// 采集阶段被吸收的分区错误（分区独立，互不阻塞）
    pub collection_errors: Vec<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn succeeded(&self) -> bool {
        self.result != CycleResult::Failed
    }
}
