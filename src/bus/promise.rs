//! # Promise
//!
//! A single-assignment cell carrying the eventual result of an event. Built
//! on `std::sync::{Mutex, Condvar}` — the primitives the teacher's runtime
//! already reaches for throughout `runtime/mod.rs` — rather than an async
//! channel, since this crate has no async runtime (see the concurrency
//! model in the crate root docs).

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitOutcome<T> {
    Ready(T),
    Timeout,
}

struct Inner<T> {
    value: Mutex<Option<T>>,
    condvar: Condvar,
}

/// A single-assignment container. Cloning a `Promise` shares the same cell;
/// `resolve` fills it at most once and wakes every waiter.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ready = self.inner.value.lock().map(|g| g.is_some()).unwrap_or(false);
        f.debug_struct("Promise").field("ready", &ready).finish()
    }
}

impl<T: Clone> Promise<T> {
    pub fn new() -> Self {
        Promise {
            inner: Arc::new(Inner {
                value: Mutex::new(None),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Fill the cell. Idempotent: a second call is a silent no-op.
    pub fn resolve(&self, value: T) {
        let mut guard = self.inner.value.lock().unwrap();
        if guard.is_none() {
            *guard = Some(value);
            self.inner.condvar.notify_all();
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.value.lock().unwrap().is_some()
    }

    /// Blocks until the cell is filled, then returns the value.
    pub fn await_value(&self) -> T {
        let mut guard = self.inner.value.lock().unwrap();
        while guard.is_none() {
            guard = self.inner.condvar.wait(guard).unwrap();
        }
        guard.clone().unwrap()
    }

    /// Blocks until the cell is filled or `timeout` elapses, whichever
    /// comes first.
    pub fn await_for(&self, timeout: Duration) -> AwaitOutcome<T> {
        let guard = self.inner.value.lock().unwrap();
        let (guard, wait_result) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |v| v.is_none())
            .unwrap();
        match guard.clone() {
            Some(v) => AwaitOutcome::Ready(v),
            None => {
                debug_assert!(wait_result.timed_out());
                AwaitOutcome::Timeout
            }
        }
    }
}

impl<T: Clone> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn resolve_then_await_returns_value() {
        let promise: Promise<i32> = Promise::new();
        promise.resolve(42);
        assert!(promise.is_ready());
        assert_eq!(promise.await_value(), 42);
    }

    #[test]
    fn second_resolve_is_a_no_op() {
        let promise: Promise<i32> = Promise::new();
        promise.resolve(1);
        promise.resolve(2);
        assert_eq!(promise.await_value(), 1);
    }

    #[test]
    fn await_blocks_until_resolved_from_another_thread() {
        let promise: Promise<i32> = Promise::new();
        let resolver = promise.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resolver.resolve(7);
        });
        assert_eq!(promise.await_value(), 7);
        handle.join().unwrap();
    }

    #[test]
    fn await_for_times_out_when_unresolved() {
        let promise: Promise<i32> = Promise::new();
        let outcome = promise.await_for(Duration::from_millis(10));
        assert_eq!(outcome, AwaitOutcome::Timeout);
    }

    #[test]
    fn await_for_returns_value_when_resolved_in_time() {
        let promise: Promise<i32> = Promise::new();
        promise.resolve(9);
        let outcome = promise.await_for(Duration::from_millis(10));
        assert_eq!(outcome, AwaitOutcome::Ready(9));
    }
}
