use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tally_agent::application::ports::{FactCollectorPort, SoftwareSourcePort};
use tally_agent::application::services::{ScanScheduler, SyncEngine};
use tally_agent::infrastructure::{
    graphql::{GraphQlAssetRepository, GraphQlClient},
    system::{
        DesktopEntrySource, DpkgSource, HardwareCollector, NetworkCollector,
        SystemIdentityCollector,
    },
};
use tally_core::config::AgentConfig;
use tally_core::shutdown::GracefulShutdown;
use tally_core::telemetry::{LogConfig, init_tracing_with};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 统一配置加载（默认值 + 文件 + 环境变量覆盖）
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = AgentConfig::load(config_path.as_deref())?;

    init_tracing_with(&LogConfig::from(&cfg.telemetry));

    info!("Starting Tally inventory agent...");
    info!("  API endpoint: {}", cfg.graphql_endpoint());
    info!("  Scan interval: {}s", cfg.scan.interval_sec);
    info!("  Log level: {}", cfg.telemetry.log_level);

    let client = GraphQlClient::new(cfg.graphql_endpoint(), cfg.call_timeout())?;
    let repository = Arc::new(GraphQlAssetRepository::new(client));

    // 分区采集器按配置开关装配；关掉的分区保持空对象
    let mut collectors: Vec<Arc<dyn FactCollectorPort>> = Vec::new();
    if cfg.collect.system {
        collectors.push(Arc::new(SystemIdentityCollector::new()));
    }
    if cfg.collect.hardware {
        collectors.push(Arc::new(HardwareCollector::new()));
    }
    if cfg.collect.network {
        collectors.push(Arc::new(NetworkCollector::new()));
    }

    // 软件来源按优先级排列：包管理器数据库优先于 desktop 条目
    let mut software_sources: Vec<Arc<dyn SoftwareSourcePort>> = Vec::new();
    if cfg.collect.software {
        software_sources.push(Arc::new(DpkgSource::new()));
        software_sources.push(Arc::new(DesktopEntrySource::new()));
    }

    let engine = Arc::new(SyncEngine::new(
        collectors,
        software_sources,
        repository,
        cfg.scan.excluded_software.clone(),
        cfg.retry_policy(),
    ));

    let shutdown = GracefulShutdown::new();
    let scheduler = ScanScheduler::new(
        engine,
        cfg.scan_interval(),
        cfg.stop_timeout(),
        shutdown.child_token(),
    );

    scheduler.start().await;
    info!("Inventory agent started");

    // 等待全局关闭信号
    shutdown.wait_for_signal().await;

    info!("Shutdown signal received, stopping scheduler...");
    scheduler.stop().await;

    info!("Inventory agent shut down gracefully");
    Ok(())
}
