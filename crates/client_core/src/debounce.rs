//! Keyed trailing-edge debounce on top of tokio timers.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

struct PendingCall {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    next_generation: u64,
    pending: HashMap<String, PendingCall>,
}

/// Collapses bursts of `schedule` calls per key into one delayed call.
///
/// Only the last call scheduled for a key within its quiet period runs.
/// Must be used from within a tokio runtime.
#[derive(Default)]
pub struct DebouncedTrigger {
    timers: Arc<Mutex<Timers>>,
}

impl DebouncedTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let mut timers = lock(&self.timers);
        timers.next_generation += 1;
        let generation = timers.next_generation;

        if let Some(previous) = timers.pending.remove(&key) {
            debug!(key = %key, discarded = previous.generation, "rescheduling debounced call");
            previous.task.abort();
        }

        let deadline = Instant::now() + delay;
        let registry = Arc::clone(&self.timers);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut timers = lock(&registry);
                match timers.pending.get(&task_key) {
                    Some(entry) if entry.generation == generation => {
                        timers.pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            fut.await;
        });

        timers.pending.insert(key, PendingCall { generation, task });
    }

    pub fn cancel(&self, key: &str) -> bool {
        match lock(&self.timers).pending.remove(key) {
            Some(call) => {
                call.task.abort();
                true
            }
            None => false,
        }
    }

    /// Clears every pending timer. Returns how many were discarded.
    pub fn cancel_all(&self) -> usize {
        let mut timers = lock(&self.timers);
        let count = timers.pending.len();
        for (_, call) in timers.pending.drain() {
            call.task.abort();
        }
        count
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.timers).pending.contains_key(key)
    }

    pub fn pending(&self) -> usize {
        lock(&self.timers).pending.len()
    }
}

impl Drop for DebouncedTrigger {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn lock(timers: &Mutex<Timers>) -> MutexGuard<'_, Timers> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
