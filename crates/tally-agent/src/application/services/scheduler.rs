//! 扫描调度器
//!
//! 单个后台工作任务顺序执行扫描轮次，轮与轮之间固定延迟（fixed-delay
//! 而非 fixed-rate），绝不重叠。取消是协作式的：只在轮与轮之间和
//! 睡眠期间检查信号，远端调用允许跑完自己的重试预算。

use crate::application::services::sync::SyncEngine;
use crate::domain::{AgentStatus, CycleReport, CycleResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 对外暴露的调度器状态快照（copy-on-read，读写互不阻塞）
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub agent: AgentStatus,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub last_report: Option<CycleReport>,
}

impl SchedulerStatus {
    fn initial() -> Self {
        Self {
            agent: AgentStatus::Initializing,
            cycles_completed: 0,
            cycles_failed: 0,
            last_report: None,
        }
    }
}

pub struct ScanScheduler {
    engine: Arc<SyncEngine>,
    interval: Duration,
    stop_timeout: Duration,
    cancel: CancellationToken,
    status: Arc<RwLock<SchedulerStatus>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ScanScheduler {
    /// `parent_token` 通常来自进程级的 GracefulShutdown，使进程停机
    /// 信号与显式 stop() 走同一条取消路径
    pub fn new(
        engine: Arc<SyncEngine>,
        interval: Duration,
        stop_timeout: Duration,
        parent_token: CancellationToken,
    ) -> Self {
        Self {
            engine,
            interval,
            stop_timeout,
            cancel: parent_token,
            status: Arc::new(RwLock::new(SchedulerStatus::initial())),
            worker: Mutex::new(None),
        }
    }

    /// 启动扫描循环；重复启动是带警告的 no-op，不是错误
    pub async fn start(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                warn!("Scan scheduler already running, ignoring start");
                return;
            }
        }

        info!(interval_sec = self.interval.as_secs(), "Starting scan scheduler");
        {
            let mut status = self.status.write().await;
            status.agent = AgentStatus::Running;
        }

        let engine = self.engine.clone();
        let interval = self.interval;
        let cancel = self.cancel.clone();
        let status = self.status.clone();

        *worker = Some(tokio::spawn(async move {
            scan_loop(engine, interval, cancel, status).await;
        }));
    }

    /// 优雅停止：通知循环在当前轮结束后退出，等待不超过 stop_timeout；
    /// 超时则放弃等待直接返回（尽力而为，不无限阻塞）
    pub async fn stop(&self) {
        let handle = {
            let mut worker = self.worker.lock().await;
            worker.take()
        };

        let handle = match handle {
            Some(h) => h,
            None => {
                warn!("Scan scheduler is not running, ignoring stop");
                return;
            }
        };

        info!("Stopping scan scheduler...");
        {
            let mut status = self.status.write().await;
            status.agent = AgentStatus::Stopping;
        }
        self.cancel.cancel();

        match tokio::time::timeout(self.stop_timeout, handle).await {
            Ok(Ok(())) => info!("Scan scheduler stopped"),
            Ok(Err(e)) => error!(error = %e, "Scan loop terminated abnormally"),
            Err(_) => warn!(
                timeout_sec = self.stop_timeout.as_secs(),
                "Scan loop did not exit within stop timeout, detaching"
            ),
        }

        let mut status = self.status.write().await;
        status.agent = AgentStatus::Stopped;
    }

    /// 状态快照（按值拷贝，调用方拿到的是一致的瞬时视图）
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        let worker = self.worker.lock().await;
        worker.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// 扫描主循环
///
/// 上一轮同步成功后的远端表示只在这个任务里流转（worker-local），
/// 对外只发布只读的状态快照。轮内的意外失败在循环边界吸收，
/// 循环照常进入下一轮。
async fn scan_loop(
    engine: Arc<SyncEngine>,
    interval: Duration,
    cancel: CancellationToken,
    status: Arc<RwLock<SchedulerStatus>>,
) {
    let mut last_synced = None;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let (report, next_synced) = engine.run_cycle(last_synced).await;
        last_synced = next_synced;

        if let Some(e) = &report.error {
            error!(cycle = %report.cycle_id, error = %e, "Scan cycle failed");
        }

        {
            let mut status = status.write().await;
            if report.result == CycleResult::Failed {
                status.cycles_failed += 1;
            } else {
                status.cycles_completed += 1;
            }
            status.last_report = Some(report);
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Scan loop exited");
}
