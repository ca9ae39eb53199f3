//! In-flight event handlers
//!
//! Handlers are spawned onto a [`JoinSet`] instead of being detached, so
//! shutdown can stop taking events and still let a running batch finish and
//! reply.

use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct EventTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl EventTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a handler, reaping any that already finished
    pub fn spawn<F>(&self, handler: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(done) = tasks.try_join_next() {
            log_panic(done);
        }
        tasks.spawn(handler);
    }

    /// Handlers spawned and not yet reaped
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every handler, including any spawned while draining
    pub async fn drain(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.lock());
            if pending.is_empty() {
                return;
            }
            info!(handlers = pending.len(), "Waiting for in-flight handlers");
            while let Some(done) = pending.join_next().await {
                log_panic(done);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        // A poisoned set is still a valid set
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_panic(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        warn!(error = %e, "Event handler did not complete");
    }
}
