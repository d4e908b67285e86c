use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// A task running on the single browser thread
pub type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

/// The named tasks the sync controller schedules
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ReadSync,
    QueueDrain,
    CacheWriteBack,
    Reconciliation,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::ReadSync => "read-sync",
            TaskKind::QueueDrain => "queue-drain",
            TaskKind::CacheWriteBack => "cache-write-back",
            TaskKind::Reconciliation => "reconciliation",
        }
    }
}

/// Fire-and-forget execution of a task after `delay`. Tasks are never
/// cancelled; they run to completion or log their failure.
pub trait Scheduler {
    fn schedule(&self, kind: TaskKind, delay: Duration, task: LocalTask);
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserScheduler;

#[cfg(target_arch = "wasm32")]
mod browser {
    use std::time::Duration;

    use gloo_timers::future::TimeoutFuture;
    use wasm_bindgen_futures::spawn_local;

    use super::{LocalTask, Scheduler, TaskKind};

    /// `spawn_local` + `setTimeout`
    #[derive(Clone, Copy, Debug, Default)]
    pub struct BrowserScheduler;

    impl Scheduler for BrowserScheduler {
        fn schedule(&self, kind: TaskKind, delay: Duration, task: LocalTask) {
            let delay_ms = delay.as_millis().min(u32::MAX as u128) as u32;
            log::debug!("⏰ Scheduling {} in {}ms", kind.name(), delay_ms);
            spawn_local(async move {
                if delay_ms > 0 {
                    TimeoutFuture::new(delay_ms).await;
                }
                task.await;
            });
        }
    }
}
