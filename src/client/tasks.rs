//! Registry of background tasks owned by a client.
//!
//! Tasks spawned through the registry are tracked in a `JoinSet`. Finished
//! tasks are reaped on every spawn and on shutdown, and a task that panicked
//! is logged at ERROR level instead of disappearing silently. Dropping the
//! registry aborts whatever is still running.

use std::any::Any;
use std::future::Future;
use std::sync::Mutex;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinSet};

use crate::error::LockResultExt;

#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    tasks: Mutex<JoinSet<&'static str>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawn a named task on the given runtime.
    pub(crate) fn spawn<F>(&self, runtime: &Handle, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().recover_poison("TaskRegistry::spawn");
        reap_finished(&mut tasks);
        tasks.spawn_on(
            async move {
                task.await;
                name
            },
            runtime,
        );
    }

    /// Number of tracked tasks that have not been reaped yet.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().recover_poison("TaskRegistry::len").len()
    }

    /// Abort every tracked task.
    pub(crate) fn abort_all(&self) {
        let mut tasks = self.tasks.lock().recover_poison("TaskRegistry::abort_all");
        reap_finished(&mut tasks);
        tasks.abort_all();
    }
}

fn reap_finished(tasks: &mut JoinSet<&'static str>) {
    while let Some(result) = tasks.try_join_next() {
        match result {
            Ok(name) => {
                log::debug!(
                    target: "moonlink::tasks",
                    "Background task {} exited normally",
                    name
                );
            }
            Err(e) => log_join_error(e),
        }
    }
}

/// Log a task that did not exit normally.
pub(crate) fn log_join_error(e: JoinError) {
    if e.is_panic() {
        log::error!(
            target: "moonlink::tasks",
            "Background task PANICKED: {}",
            panic_message(e.into_panic().as_ref())
        );
    } else {
        log::debug!(
            target: "moonlink::tasks",
            "Background task was cancelled: {}",
            e
        );
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
