//! One in-flight request per logical resource.
//!
//! Starting a request for a stage cancels the handle of any earlier request
//! for the same stage. Cancellation is advisory: the superseded future is
//! dropped at its next suspension point, and whatever it produced is
//! reported as [`LoadError::Aborted`] instead of being handed back.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::LoadError;

/// Cancellation token bound to one outstanding request.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    stage: String,
    generation: u64,
    token: CancellationToken,
}

impl RequestHandle {
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drives `fut` until it completes or this handle is cancelled.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, LoadError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.aborted()),
            result = fut => {
                if self.token.is_cancelled() {
                    return Err(self.aborted());
                }
                result.map_err(|err| LoadError::network(&err))
            }
        }
    }

    fn aborted(&self) -> LoadError {
        LoadError::Aborted {
            stage: self.stage.clone(),
        }
    }
}

#[derive(Default)]
struct GateState {
    next_generation: u64,
    active: HashMap<String, RequestHandle>,
}

#[derive(Default)]
pub struct RequestGate {
    inner: Mutex<GateState>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh handle for `stage`, cancelling the previous one.
    pub fn begin(&self, stage: &str) -> RequestHandle {
        let mut guard = self.lock();
        guard.next_generation += 1;
        let handle = RequestHandle {
            stage: stage.to_string(),
            generation: guard.next_generation,
            token: CancellationToken::new(),
        };
        if let Some(previous) = guard.active.insert(stage.to_string(), handle.clone()) {
            debug!(
                stage,
                superseded = previous.generation,
                generation = handle.generation,
                "superseding in-flight request"
            );
            previous.token.cancel();
        }
        handle
    }

    /// Releases `handle`. Returns whether it was still the active request.
    pub fn finish(&self, handle: &RequestHandle) -> bool {
        let mut guard = self.lock();
        let current = guard
            .active
            .get(&handle.stage)
            .is_some_and(|active| active.generation == handle.generation);
        if current {
            guard.active.remove(&handle.stage);
        }
        current && !handle.is_cancelled()
    }

    pub fn cancel(&self, stage: &str) -> bool {
        match self.lock().active.remove(stage) {
            Some(handle) => {
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) -> usize {
        let mut guard = self.lock();
        let count = guard.active.len();
        for (_, handle) in guard.active.drain() {
            handle.token.cancel();
        }
        count
    }

    pub fn is_in_flight(&self, stage: &str) -> bool {
        self.lock().active.contains_key(stage)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().active.len()
    }

    /// Runs `fut` as the newest request for `stage`.
    ///
    /// Resolves with [`LoadError::Aborted`] when a later `run`/`begin` for
    /// the same stage superseded this one, even if `fut` itself failed.
    pub async fn run<T, F>(&self, stage: &str, fut: F) -> Result<T, LoadError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let handle = self.begin(stage);
        let result = handle.run(fut).await;
        if self.finish(&handle) {
            result
        } else {
            Err(handle.aborted())
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/request_gate_tests.rs"]
mod tests;
