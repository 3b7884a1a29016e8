//! Competition phases and cooperative background tasks
//!
//! Background work (color sorting, telemetry) runs as periodic tokio tasks.
//! A task is never aborted: it observes its [`CancelToken`] between
//! iterations and finishes the iteration it is in.

use crate::error::CoreError;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Competition phase published by the field controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disabled,
    Autonomous,
    DriverControl,
}

/// Cooperative cancellation flag shared between a task and its owner
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        CancelToken {
            flag: Arc::new(flag),
        }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A periodic worker running on the tokio runtime
pub struct BackgroundTask {
    name: String,
    cancel: CancelToken,
    handle: JoinHandle<u64>,
}

impl BackgroundTask {
    /// Spawn `tick` every `period` until it breaks or `cancel` fires
    ///
    /// The first tick runs immediately. `on_exit` runs once on the task after
    /// the last tick, whichever way the loop ended.
    pub fn spawn<F, E>(
        name: &str,
        period: Duration,
        cancel: CancelToken,
        mut tick: F,
        on_exit: E,
    ) -> Result<Self, CoreError>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| CoreError::NoRuntime(name.to_string()))?;

        let task_name = name.to_string();
        let token = cancel.clone();
        let handle = runtime.spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("{}: cancelled after {} ticks", task_name, ticks);
                        break;
                    }
                    _ = interval.tick() => {
                        ticks += 1;
                        if tick().is_break() {
                            debug!("{}: finished after {} ticks", task_name, ticks);
                            break;
                        }
                    }
                }
            }

            on_exit();
            ticks
        });

        info!("Started background task {}", name);
        Ok(BackgroundTask {
            name: name.to_string(),
            cancel,
            handle,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request the task to finish after its current iteration
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the task; returns the number of ticks it ran
    pub async fn stop(self) -> Result<u64, CoreError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the task to finish on its own
    pub async fn join(self) -> Result<u64, CoreError> {
        let name = self.name;
        self.handle
            .await
            .map_err(|e| CoreError::lifecycle(&name, format!("task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_task_between_ticks() {
        let count = Arc::new(AtomicU32::new(0));
        let exited = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let e = exited.clone();

        let task = BackgroundTask::spawn(
            "counter",
            Duration::from_millis(10),
            CancelToken::new(),
            move || {
                c.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            },
            move || {
                e.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

        time::sleep(Duration::from_millis(95)).await;
        let ticks = task.stop().await.unwrap();

        assert_eq!(ticks, 10);
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(exited.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn break_ends_task() {
        let mut remaining = 3;
        let task = BackgroundTask::spawn(
            "countdown",
            Duration::from_millis(10),
            CancelToken::new(),
            move || {
                remaining -= 1;
                if remaining == 0 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
            || {},
        )
        .unwrap();

        assert_eq!(task.join().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn spawn_without_runtime_is_an_error() {
        let result = BackgroundTask::spawn(
            "orphan",
            Duration::from_millis(10),
            CancelToken::new(),
            || ControlFlow::Continue(()),
            || {},
        );
        assert!(matches!(result, Err(CoreError::NoRuntime(_))));
    }
}
