//! Execution-in-progress flag
//!
//! The coordinator owns the only writer. Anything else (export tooling,
//! loading indicators) holds an [`ExecutionObserver`] and either reads the
//! current value or waits for the next transition.

use tokio::sync::watch;

#[derive(Debug)]
pub struct ExecutionFlag {
    tx: watch::Sender<bool>,
}

impl Default for ExecutionFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn observer(&self) -> ExecutionObserver {
        ExecutionObserver {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        *self.tx.borrow()
    }

    /// Mark a render pass as running until the guard finishes or drops.
    pub(crate) fn begin(&self) -> ExecutionGuard<'_> {
        self.tx.send_replace(true);
        ExecutionGuard {
            flag: self,
            finished: false,
        }
    }
}

/// Clears the flag exactly once, on `finish` or on drop (error and panic paths).
#[derive(Debug)]
pub(crate) struct ExecutionGuard<'a> {
    flag: &'a ExecutionFlag,
    finished: bool,
}

impl ExecutionGuard<'_> {
    pub(crate) fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.flag.tx.send_replace(false);
        }
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionObserver {
    rx: watch::Receiver<bool>,
}

impl ExecutionObserver {
    pub fn is_in_progress(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once no render pass is running.
    pub async fn wait_until_idle(&mut self) {
        // Sender dropped means the coordinator is gone; nothing is running.
        let _ = self.rx.wait_for(|running| !*running).await;
    }
}
