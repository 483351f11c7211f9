//! One-shot asynchronous result container.
//!
//! [`Eventual<T>`] is the future primitive every executor operation speaks:
//! an opaque container that becomes ready exactly once, supports attaching a
//! continuation, and gives up its value exactly once.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      EVENTUAL LIFECYCLE                       │
//! │                                                               │
//! │  Promise ── fulfill(v) ──► Ready(Ok(v))  ── take() ──► Ok(v)  │
//! │     │                                                         │
//! │     │────── fail(e) ─────► Ready(Err(e)) ── take() ──► Err(e) │
//! │     │                                                         │
//! │  (drop) ─────────────────► Ready(Err(Dropped))                │
//! │                                                               │
//! │  deferred(f) ── first wait()/take() forces f ──► Ready(..)    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Semantics
//!
//! A panic inside a continuation or spawned body is caught and stored as
//! [`Error`] with kind `Panicked`. The stored failure is surfaced only by
//! [`Eventual::take`]; [`Eventual::wait`] observes completion, not success.
//! A future that is waited on but never taken silently discards its failure.
//!
//! # Launch Policies
//!
//! [`Launch::Thread`] runs a continuation on a fresh OS thread that blocks on
//! the predecessor. [`Launch::Deferred`] stores the continuation and runs it
//! on the first thread that waits on the new future.

use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::error::Error;
use crate::tracing_compat::trace;

/// Launch policy for [`Eventual::then`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Run the continuation on a fresh OS thread, started immediately.
    Thread,
    /// Run the continuation on the first thread that waits on the result.
    Deferred,
}

type DeferredFn<T> = Box<dyn FnOnce() -> Result<T, Error> + Send>;

enum State<T> {
    /// No value yet; a promise (or running continuation) will settle it.
    Pending,
    /// A stored computation to run on the first wait.
    Deferred(DeferredFn<T>),
    /// A deferred computation is being forced by some waiter.
    Running,
    /// Settled.
    Ready(Result<T, Error>),
    /// The value has been moved out.
    Taken,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

/// A one-shot future: becomes ready exactly once, yields its value exactly
/// once.
pub struct Eventual<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> std::fmt::Debug for Eventual<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eventual")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl<T: Send + 'static> Eventual<T> {
    /// Creates an already-complete future holding `value`.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// Creates an already-complete future holding a failure.
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self::settled(Err(error))
    }

    fn settled(result: Result<T, Error>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Ready(result)),
                cond: Condvar::new(),
            }),
        }
    }

    /// Creates a deferred future: `f` runs on the first thread that waits.
    ///
    /// Until then the future reports not-ready.
    #[must_use]
    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Deferred(Box::new(f))),
                cond: Condvar::new(),
            }),
        }
    }

    /// Creates an unsettled future together with its producing half.
    #[must_use]
    pub fn promise() -> (Promise<T>, Self) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Pending),
            cond: Condvar::new(),
        });
        (
            Promise {
                shared: Arc::clone(&shared),
                settled: false,
            },
            Self { shared },
        )
    }

    /// Returns `true` if a value (or failure) is present right now.
    ///
    /// Never blocks and never forces a deferred computation.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let state = self.shared.state.lock().expect("eventual lock poisoned");
        matches!(*state, State::Ready(_))
    }

    /// Blocks until the future is complete.
    ///
    /// Forces a deferred computation. Does **not** consume the value and does
    /// not observe a stored failure; a failure that is only waited on is
    /// discarded when the future is dropped.
    pub fn wait(&self) {
        let mut guard = self.shared.state.lock().expect("eventual lock poisoned");
        loop {
            match mem::replace(&mut *guard, State::Running) {
                state @ (State::Ready(_) | State::Taken) => {
                    *guard = state;
                    return;
                }
                State::Deferred(run) => {
                    drop(guard);
                    let result = catch(run);
                    let mut settled = self.shared.state.lock().expect("eventual lock poisoned");
                    *settled = State::Ready(result);
                    self.shared.cond.notify_all();
                    return;
                }
                state @ (State::Pending | State::Running) => {
                    *guard = state;
                    guard = self
                        .shared
                        .cond
                        .wait(guard)
                        .expect("eventual lock poisoned");
                }
            }
        }
    }

    /// Blocks until complete and retrieves the value exactly once.
    ///
    /// A stored failure is re-raised here (as `Err`) exactly once.
    pub fn take(self) -> Result<T, Error> {
        self.wait();
        let mut state = self.shared.state.lock().expect("eventual lock poisoned");
        match mem::replace(&mut *state, State::Taken) {
            State::Ready(result) => result,
            _ => Err(Error::internal("eventual value already taken")),
        }
    }

    /// Attaches a continuation, producing a future for its result.
    ///
    /// The continuation receives the predecessor's settled `Result` and runs
    /// per `launch`. A panic inside `f` is caught and stored as a `Panicked`
    /// failure on the returned future.
    pub fn then<R, F>(self, launch: Launch, f: F) -> Eventual<R>
    where
        R: Send + 'static,
        F: FnOnce(Result<T, Error>) -> Result<R, Error> + Send + 'static,
    {
        match launch {
            Launch::Deferred => Eventual::deferred(move || {
                let result = self.take();
                catch(move || f(result))
            }),
            Launch::Thread => {
                let (promise, eventual) = Eventual::promise();
                trace!("spawning continuation thread");
                thread::Builder::new()
                    .name("agentry-then".to_string())
                    .spawn(move || {
                        let result = self.take();
                        promise.settle(catch(move || f(result)));
                    })
                    .expect("failed to spawn continuation thread");
                eventual
            }
        }
    }
}

/// Runs `f` on a fresh OS thread, capturing a panic into the future.
pub fn spawn<R, F>(f: F) -> Eventual<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    Eventual::ready(()).then(Launch::Thread, move |_| Ok(f()))
}

/// Joins a homogeneous set of futures.
///
/// The returned (deferred) future completes with every value, in input
/// order. Every input is retrieved even after a failure is seen; the first
/// failure in input order is reported.
pub fn when_all<T: Send + 'static>(futures: Vec<Eventual<T>>) -> Eventual<Vec<T>> {
    Eventual::deferred(move || {
        let mut values = Vec::with_capacity(futures.len());
        let mut first_failure: Option<Error> = None;
        for future in futures {
            match future.take() {
                Ok(value) => values.push(value),
                Err(error) => {
                    first_failure.get_or_insert(error);
                }
            }
        }
        match first_failure {
            None => Ok(values),
            Some(error) => Err(error),
        }
    })
}

/// Runs a fallible closure, converting a panic into a `Panicked` error.
pub(crate) fn catch<R>(f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::panicked(payload)),
    }
}

/// The producing half of an [`Eventual`].
///
/// Settle it with [`Promise::fulfill`] or [`Promise::fail`]; dropping it
/// unsettled stores a `Dropped` failure.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    settled: bool,
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.settled)
            .finish()
    }
}

impl<T> Promise<T> {
    /// Completes the future with `value`.
    pub fn fulfill(mut self, value: T) {
        self.store(Ok(value));
    }

    /// Completes the future with a failure.
    pub fn fail(mut self, error: Error) {
        self.store(Err(error));
    }

    pub(crate) fn settle(mut self, result: Result<T, Error>) {
        self.store(result);
    }

    fn store(&mut self, result: Result<T, Error>) {
        self.settled = true;
        let mut state = self.shared.state.lock().expect("eventual lock poisoned");
        *state = State::Ready(result);
        self.shared.cond.notify_all();
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.store(Err(Error::dropped()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn ready_is_immediately_complete() {
        let fut = Eventual::ready(7);
        assert!(fut.is_ready());
        assert_eq!(fut.take().expect("value"), 7);
    }

    #[test]
    fn promise_fulfill_wakes_waiter() {
        let (promise, fut) = Eventual::promise();
        let waiter = thread::spawn(move || fut.take());
        thread::sleep(Duration::from_millis(10));
        promise.fulfill(42);
        assert_eq!(waiter.join().expect("waiter").expect("value"), 42);
    }

    #[test]
    fn dropped_promise_is_a_failure() {
        let (promise, fut) = Eventual::<i32>::promise();
        drop(promise);
        let err = fut.take().expect_err("dropped promise must fail");
        assert_eq!(err.kind(), ErrorKind::Dropped);
    }

    #[test]
    fn deferred_runs_on_first_wait() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let fut = Eventual::deferred(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(9)
        });
        assert!(!fut.is_ready());
        assert!(!ran.load(Ordering::SeqCst));
        fut.wait();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(fut.take().expect("value"), 9);
    }

    #[test]
    fn then_thread_chains_value() {
        let fut = Eventual::ready(10).then(Launch::Thread, |v| Ok(v? * 2));
        assert_eq!(fut.take().expect("value"), 20);
    }

    #[test]
    fn then_deferred_chains_value() {
        let fut = Eventual::ready(10).then(Launch::Deferred, |v| Ok(v? + 3));
        assert_eq!(fut.take().expect("value"), 13);
    }

    #[test]
    fn panic_in_continuation_is_captured() {
        let fut: Eventual<i32> =
            Eventual::ready(()).then(Launch::Thread, |_| -> Result<i32, Error> {
                panic!("continuation blew up")
            });
        let err = fut.take().expect_err("panic must surface");
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(err.message(), Some("continuation blew up"));
    }

    #[test]
    fn predecessor_failure_propagates_through_then() {
        let failed: Eventual<i32> = Eventual::failed(Error::dropped());
        let fut = failed.then(Launch::Deferred, |v| Ok(v? + 1));
        assert_eq!(
            fut.take().expect_err("must propagate").kind(),
            ErrorKind::Dropped
        );
    }

    #[test]
    fn wait_does_not_consume_failure() {
        let fut: Eventual<()> = Eventual::failed(Error::dropped());
        fut.wait();
        // Still there for take; wait alone never observes it.
        assert!(fut.take().is_err());
    }

    #[test]
    fn spawn_runs_on_another_thread() {
        let here = thread::current().id();
        let fut = spawn(move || thread::current().id() != here);
        assert!(fut.take().expect("value"));
    }

    #[test]
    fn when_all_preserves_input_order() {
        let futures = vec![
            spawn(|| 1),
            Eventual::ready(2),
            Eventual::deferred(|| Ok(3)),
        ];
        assert_eq!(when_all(futures).take().expect("values"), vec![1, 2, 3]);
    }

    #[test]
    fn when_all_retrieves_everything_and_reports_first_failure() {
        let taken = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&taken);
        let futures = vec![
            Eventual::failed(Error::dropped()),
            Eventual::deferred(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(5)
            }),
        ];
        let err = when_all(futures).take().expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Dropped);
        // The later future was still retrieved, not abandoned.
        assert!(taken.load(Ordering::SeqCst));
    }

    #[test]
    fn when_all_of_nothing_is_ready_work() {
        let futures: Vec<Eventual<i32>> = Vec::new();
        assert!(when_all(futures).take().expect("values").is_empty());
    }
}
