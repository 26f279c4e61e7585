//! 固定次数、固定间隔的重试策略
//!
//! 重试只针对被分类为可重试的错误（见 `SyncError::is_retriable`）；
//! 校验类错误重发也会被拒绝，立即返回。

use crate::error::{Result, SyncError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 重试策略：尝试上限 + 相邻两次之间的固定延迟
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// 按策略执行操作；耗尽后返回最后一次的错误
pub async fn retry_with_policy<F, Fut, T>(
    mut operation: F,
    policy: RetryPolicy,
    context: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retriable() && attempt < policy.max_attempts => {
                warn!(
                    error = %e,
                    attempt,
                    max_attempts = policy.max_attempts,
                    context,
                    "Attempt failed, retrying after delay"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retriable() {
                    warn!(error = %e, attempts = attempt, context, "Retry budget exhausted");
                }
                return Err(e);
            }
        }
    }
}
