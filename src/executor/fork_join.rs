//! Thread-per-split parallel backend.
//!
//! [`ForkJoinExecutor`] runs a bulk operation by recursively halving the
//! agent range. Each node of the split tree spawns its two halves as scoped
//! threads, runs its own midpoint agent inline, and joins both halves before
//! returning:
//!
//! ```text
//!                 [0, n)
//!                /  |   \
//!        [0, mid)  mid  [mid+1, n)
//!        (thread) (here) (thread)
//! ```
//!
//! The scope is the completion barrier: a node cannot return while a child
//! is still running, so the batch future completes only after every agent
//! has. Ranges at or below `sequential_cutoff` run as a plain loop on
//! whichever thread owns them.
//!
//! Every child is retrieved even after a failure has been observed; the
//! first failure in index order settles the batch future.

use std::thread::{self, Scope, ScopedJoinHandle};

use crate::error::Error;
use crate::future::{self, Eventual, Launch};
use crate::processor::{self, ProcessorId};
use crate::tracing_compat::trace;

use super::capability::{CapabilitySet, Op, Source};
use super::Executor;

/// A blocking executor that forks one thread per range split.
///
/// Cheap to copy; carries only its tuning knobs. Threads are spawned per
/// operation and joined before the operation's future completes, so the
/// executor itself holds no resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkJoinExecutor {
    sequential_cutoff: usize,
    pin: Option<ProcessorId>,
}

impl ForkJoinExecutor {
    /// Creates an executor that splits all the way down to single agents.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sequential_cutoff: 1,
            pin: None,
        }
    }

    /// Stops splitting once a range holds at most `cutoff` agents; those run
    /// as a plain loop on one thread.
    #[must_use]
    pub const fn with_sequential_cutoff(mut self, cutoff: usize) -> Self {
        self.sequential_cutoff = cutoff;
        self
    }

    /// Pins the thread each asynchronous operation starts on to `processor`.
    ///
    /// A binding failure settles the operation's future with the error
    /// before the body runs.
    #[must_use]
    pub const fn pinned_to(mut self, processor: ProcessorId) -> Self {
        self.pin = Some(processor);
        self
    }

    /// The range size below which splitting stops.
    #[must_use]
    pub const fn sequential_cutoff(&self) -> usize {
        self.sequential_cutoff
    }

    fn maybe_pin(&self) -> Result<(), Error> {
        match self.pin {
            Some(p) => processor::pin_current(p),
            None => Ok(()),
        }
    }
}

impl Default for ForkJoinExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// One node of the split tree, run on the thread that owns `[first, last)`.
fn run_range<'scope, 'env, T, S, F>(
    scope: &'scope Scope<'scope, 'env>,
    cutoff: usize,
    body: &'env F,
    first: usize,
    last: usize,
    past: &'env T,
    shared: &'env S,
) -> Result<(), Error>
where
    T: Sync,
    S: Sync,
    F: Fn(usize, &T, &S) + Send + Sync,
{
    if last - first <= cutoff {
        for index in first..last {
            future::catch(|| {
                body(index, past, shared);
                Ok(())
            })?;
        }
        return Ok(());
    }

    let mid = first + (last - first) / 2;
    trace!(first, mid, last, "splitting agent range");

    let left = (first < mid).then(|| {
        scope.spawn(move || run_range(scope, cutoff, body, first, mid, past, shared))
    });
    let right = (mid + 1 < last).then(|| {
        scope.spawn(move || run_range(scope, cutoff, body, mid + 1, last, past, shared))
    });

    let here = future::catch(|| {
        body(mid, past, shared);
        Ok(())
    });

    // Join both halves before reporting anything, then surface the first
    // failure in index order.
    let left = join_child(left);
    let right = join_child(right);
    left?;
    here?;
    right
}

fn join_child(handle: Option<ScopedJoinHandle<'_, Result<(), Error>>>) -> Result<(), Error> {
    match handle {
        None => Ok(()),
        Some(handle) => match handle.join() {
            Ok(outcome) => outcome,
            Err(payload) => Err(Error::panicked(payload)),
        },
    }
}

impl Executor for ForkJoinExecutor {
    fn then_execute<T, R, F>(&self, predecessor: Eventual<T>, f: F) -> Eventual<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let this = *self;
        predecessor.then(Launch::Thread, move |past| {
            this.maybe_pin()?;
            Ok(f(past?))
        })
    }

    fn async_execute<R, F>(&self, f: F) -> Eventual<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        self.then_execute(Eventual::ready(()), move |()| f())
    }

    fn bulk_execute<S, F>(&self, body: F, n: usize, shared: S)
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) + Send + Sync + 'static,
    {
        // Synchronous form is the degenerate loop on the calling thread, no
        // concurrency; the caller's affinity is left untouched.
        for index in 0..n {
            body(index, &shared);
        }
    }

    fn bulk_async_execute<S, F>(&self, body: F, n: usize, shared: S) -> Eventual<()>
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) + Send + Sync + 'static,
    {
        self.bulk_then_execute(
            Eventual::ready(()),
            move |index, (): &(), state| body(index, state),
            n,
            shared,
        )
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
        if n == 0 {
            return Eventual::ready(());
        }
        let this = *self;
        predecessor.then(Launch::Thread, move |past| {
            this.maybe_pin()?;
            // The predecessor value is moved out exactly once and the shared
            // prototype sits on this frame; the split tree only ever borrows
            // them.
            let past = past?;
            thread::scope(|scope| {
                run_range(scope, this.sequential_cutoff, &body, 0, n, &past, &shared)
            })
        })
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::then_execute_only()
            .with(Op::AsyncExecute, Source::Native)
            .with(Op::BulkExecute, Source::Native)
            .with(Op::BulkAsyncExecute, Source::Native)
            .with(Op::BulkThenExecute, Source::Native)
            .with(Op::BulkCollect, Source::ViaBulkExecute)
    }
}
