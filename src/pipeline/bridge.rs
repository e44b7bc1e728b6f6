//! 异步到同步的桥接
//!
//! 每次调用都创建独立的单线程运行时，执行完毕后立即关闭，
//! 调用之间不共享任何运行时状态。

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::error::BridgeError;

/// 运行时关闭时等待后台任务的最长时间
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AsyncBridge {
    shutdown_timeout: Duration,
}

impl Default for AsyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncBridge {
    pub fn new() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// 同步执行异步操作，返回完整结果或单一错误
    ///
    /// 若当前线程已处于tokio运行时中，则在独立线程上创建运行时，避免嵌套阻塞。
    pub fn run<F>(&self, future: F) -> Result<F::Output, BridgeError>
    where
        F: Future + Send,
        F::Output: Send,
    {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.run_isolated(future);
        }

        std::thread::scope(|scope| {
            scope
                .spawn(move || self.run_isolated(future))
                .join()
                .map_err(|payload| BridgeError::Panicked(panic_message(payload)))?
        })
    }

    fn run_isolated<F>(&self, future: F) -> Result<F::Output, BridgeError>
    where
        F: Future,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name("smartninja-bridge")
            .build()?;

        let outcome = runtime.block_on(AssertUnwindSafe(future).catch_unwind());
        // 关闭运行时，未完成的后台任务随之取消
        runtime.shutdown_timeout(self.shutdown_timeout);

        outcome.map_err(|payload| {
            let message = panic_message(payload);
            tracing::error!("💥 桥接执行的异步操作发生panic: {}", message);
            BridgeError::Panicked(message)
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
