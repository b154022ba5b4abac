//! Single-slot guard for the output task.

use std::future::Future;

use tokio::task::JoinHandle;

/// Runs at most one output task at a time.
///
/// The slot frees itself when the task finishes, including when it panics
/// or is aborted, so it can never get stuck busy.
#[derive(Debug, Default)]
pub struct OutputSlot {
    active: Option<JoinHandle<()>>,
}

impl OutputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an output task is still running
    pub fn is_busy(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn `task` unless one is already running. Returns whether it started.
    pub fn try_spawn<F>(&mut self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_busy() {
            return false;
        }
        self.active = Some(tokio::spawn(task));
        true
    }

    /// Abort the running task, if any. Returns whether one was running.
    pub fn abandon(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                was_running
            }
            None => false,
        }
    }
}

impl Drop for OutputSlot {
    fn drop(&mut self) {
        if let Some(handle) = &self.active {
            handle.abort();
        }
    }
}
