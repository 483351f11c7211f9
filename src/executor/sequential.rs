//! Single-threaded reference backend.
//!
//! [`SequentialExecutor`] runs every agent in strictly increasing index
//! order on one thread. It is the correctness baseline the fork-join backend
//! is compared against, and the minimal backend the resolver can synthesize
//! everything else from. Its asynchronous forms are deferred: the loop runs
//! on the first thread that waits on the result, after the predecessor is
//! satisfied.

use crate::future::{Eventual, Launch};

use super::capability::{CapabilitySet, Op, Source};
use super::Executor;

/// The trivial one-agent-at-a-time executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    /// Creates a sequential executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// The strictly-increasing index loop every operation bottoms out in.
fn run_loop<T, S, F>(body: &F, n: usize, past: &T, shared: &S)
where
    F: Fn(usize, &T, &S),
{
    for index in 0..n {
        body(index, past, shared);
    }
}

impl Executor for SequentialExecutor {
    fn then_execute<T, R, F>(&self, predecessor: Eventual<T>, f: F) -> Eventual<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        predecessor.then(Launch::Deferred, move |past| Ok(f(past?)))
    }

    fn execute<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        f()
    }

    fn async_execute<R, F>(&self, f: F) -> Eventual<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        Eventual::deferred(move || Ok(f()))
    }

    fn bulk_execute<S, F>(&self, body: F, n: usize, shared: S)
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) + Send + Sync + 'static,
    {
        run_loop(&|index, (): &(), state: &S| body(index, state), n, &(), &shared);
    }

    fn bulk_async_execute<S, F>(&self, body: F, n: usize, shared: S) -> Eventual<()>
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) + Send + Sync + 'static,
    {
        Eventual::deferred(move || {
            run_loop(&|index, (): &(), state: &S| body(index, state), n, &(), &shared);
            Ok(())
        })
    }

    fn bulk_then_execute<T, S, F>(
        &self,
        predecessor: Eventual<T>,
        body: F,
        n: usize,
        shared: S,
    ) -> Eventual<()>
    where
        T: Send + Sync + 'static,
        S: Send + Sync + 'static,
        F: Fn(usize, &T, &S) + Send + Sync + 'static,
    {
        predecessor.then(Launch::Deferred, move |past| {
            // One combined parameter: the moved predecessor value next to the
            // materialized shared state, both referenced by the loop.
            let combined = (past?, shared);
            run_loop(&body, n, &combined.0, &combined.1);
            Ok(())
        })
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::then_execute_only()
            .with(Op::Execute, Source::Native)
            .with(Op::AsyncExecute, Source::Native)
            .with(Op::BulkExecute, Source::Native)
            .with(Op::BulkAsyncExecute, Source::Native)
            .with(Op::BulkThenExecute, Source::Native)
            .with(Op::BulkCollect, Source::ViaBulkExecute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn indices_run_in_strictly_increasing_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&order);
        SequentialExecutor::new().bulk_execute(
            move |i, (): &()| sink.lock().expect("order lock").push(i),
            6,
            (),
        );
        assert_eq!(*order.lock().expect("order lock"), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn async_loop_is_deferred_until_waited() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&calls);
        let fut = SequentialExecutor::new().bulk_async_execute(
            move |_, (): &()| {
                sink.fetch_add(1, Ordering::SeqCst);
            },
            4,
            (),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        fut.take().expect("bulk completion");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn then_composes_predecessor_and_shared_state() {
        let total = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&total);
        let fut = SequentialExecutor::new().bulk_then_execute(
            Eventual::ready(10_usize),
            move |_, past: &usize, bonus: &usize| {
                sink.fetch_add(past + bonus, Ordering::SeqCst);
            },
            3,
            1_usize,
        );
        fut.take().expect("bulk completion");
        assert_eq!(total.load(Ordering::SeqCst), 33);
    }

    #[test]
    fn reports_native_bulk_operations() {
        let caps = SequentialExecutor::new().capabilities();
        assert!(caps.is_native(Op::BulkExecute));
        assert!(caps.is_native(Op::ThenExecute));
        assert_eq!(caps.resolve(Op::BulkCollect), Source::ViaBulkExecute);
    }
}
