//! 启动期连接重试（指数退避）

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 总尝试次数（至少 1 次）
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// 第 n 次失败后的等待时间（每次翻倍，封顶 max_delay）
    fn delay_after(&self, failures: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(failures))
            .min(self.max_delay)
    }
}

/// 执行操作，失败时按策略重试；全部失败返回最后一次的错误
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut failures = 0;

    loop {
        let e = match operation().await {
            Ok(value) => {
                if failures > 0 {
                    info!(operation = operation_name, failures, "Connected after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        failures += 1;
        if failures >= max_attempts {
            warn!(operation = operation_name, attempts = failures, error = %e, "Giving up");
            return Err(e);
        }

        let delay = config.delay_after(failures - 1);
        warn!(
            operation = operation_name,
            attempt = failures,
            max_attempts,
            error = %e,
            delay_ms = delay.as_millis() as u64,
            "Attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// 可选组件（Redis）：全部失败时返回 None，服务退回进程内实现
pub async fn with_retry_optional<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry(config, operation_name, operation).await.ok()
}
