//! Cancellation and readiness primitives shared by the table builder,
//! the search loop and the decryptor.

use parking_lot::{Condvar, Mutex};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::errors::{Error, Result};

/// Receives human readable progress messages from long running operations.
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A status callback that drops every message.
pub fn silent() -> StatusCallback {
    Arc::new(|_: &str| {})
}

/// A cloneable cancellation flag.
///
/// Clones share the same flag. A signal created with [`StopSignal::child`]
/// or [`StopSignal::linked`] also reports stopped once any of its parents is
/// stopped, while stopping it leaves the parents untouched.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
    parents: Vec<StopSignal>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire) || self.parents.iter().any(StopSignal::is_stopped)
    }

    pub fn child(&self) -> Self {
        Self {
            flag: Default::default(),
            parents: vec![self.clone()],
        }
    }

    /// A signal that stops when either `self` or `other` does.
    pub fn linked(&self, other: &StopSignal) -> Self {
        Self {
            flag: Default::default(),
            parents: vec![self.clone(), other.clone()],
        }
    }
}

/// A one-shot latch. The first `resolve` wins and wakes every waiter.
pub(crate) struct Readiness<T> {
    outcome: Mutex<Option<Result<T>>>,
    resolved: Condvar,
}

impl<T: Clone> Readiness<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            resolved: Condvar::new(),
        }
    }

    /// Returns `false` if the latch was already resolved.
    pub(crate) fn resolve(&self, outcome: Result<T>) -> bool {
        let mut guard = self.outcome.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(outcome);
        self.resolved.notify_all();
        true
    }

    pub(crate) fn peek(&self) -> Option<Result<T>> {
        self.outcome.lock().clone()
    }

    /// Blocks until the latch resolves or `stop` fires.
    ///
    /// `stop` is re-checked every `poll` so a cancelled waiter returns
    /// within one interval.
    pub(crate) fn wait(&self, stop: &StopSignal, poll: Duration) -> Result<T> {
        let mut guard = self.outcome.lock();
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            if stop.is_stopped() {
                return Err(Error::ConstructionAborted);
            }
            self.resolved.wait_for(&mut guard, poll);
        }
    }
}
