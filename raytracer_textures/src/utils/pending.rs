/// One-shot completion cell shared between a producer and many waiters.
///
/// The producer side (`Completer`) is held by whoever runs the work; every
/// `Pending` clone observes the same outcome. Waiters may block on it
/// (`wait`) from worker threads, or `.await` it from an async executor; the
/// cell itself does not pick a threading model.
///
/// If a `Completer` is dropped without completing (the producer unwound),
/// waiters receive `Error::BackendError` instead of blocking forever.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use crate::error::{Error, Result};

struct Slot<T> {
    outcome: Option<Result<T>>,
    wakers: Vec<Waker>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a linked producer/waiter pair
pub fn pending<T: Clone>() -> (Completer<T>, Pending<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot { outcome: None, wakers: Vec::new() }),
        ready: Condvar::new(),
    });
    (
        Completer { shared: Some(Arc::clone(&shared)) },
        Pending { shared },
    )
}

/// Waiter side of a completion cell (cheap to clone)
pub struct Pending<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T: Clone> Pending<T> {
    /// An already-completed cell
    pub fn ready(outcome: Result<T>) -> Self {
        let (completer, pending) = pending();
        completer.complete(outcome);
        pending
    }

    /// Block the current thread until the outcome is available
    pub fn wait(&self) -> Result<T> {
        let mut slot = self.shared.lock();
        loop {
            if let Some(outcome) = &slot.outcome {
                return outcome.clone();
            }
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// The outcome if already available, without blocking
    pub fn try_get(&self) -> Option<Result<T>> {
        self.shared.lock().outcome.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.lock().outcome.is_some()
    }
}

impl<T: Clone> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.lock();
        if let Some(outcome) = &slot.outcome {
            return Poll::Ready(outcome.clone());
        }
        if !slot.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// Producer side of a completion cell
pub struct Completer<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Completer<T> {
    /// Publish the outcome and wake every waiter
    pub fn complete(mut self, outcome: Result<T>) {
        self.fulfill(outcome);
    }

    fn fulfill(&mut self, outcome: Result<T>) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        let wakers = {
            let mut slot = shared.lock();
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.wakers)
        };
        shared.ready.notify_all();
        for waker in wakers {
            waker.wake();
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if self.shared.is_some() {
            self.fulfill(Err(Error::BackendError(
                "request abandoned before completion".to_string(),
            )));
        }
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
