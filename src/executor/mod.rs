//! The bulk-execution contract and its capability resolver.
//!
//! An executor runs a body once per agent index in `[0, n)`, optionally
//! seeded with the value of a predecessor future, optionally sharing a
//! single state instance across all agents, and hands back a future for the
//! whole batch.
//!
//! # Capability Resolution
//!
//! Backends implement only what they can do well; the [`Executor`] trait
//! synthesizes the rest. The sole required method is the single-agent
//! [`then_execute`] primitive. Every other operation has a default body
//! built from more primitive operations (see [`resolve`] for the fallback
//! order). Overriding a default *is* declaring native support: the choice is
//! made per executor type at compile time, adds no overhead to native calls,
//! and cannot fail at run time — a type without the primitive simply does
//! not implement the trait.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  CAPABILITY LATTICE (defaults)               │
//! │                                                              │
//! │   then_execute (required primitive)                          │
//! │        │                                                     │
//! │        ├──► async_execute ──► execute                        │
//! │        │         │                                           │
//! │        │         └──► bulk_then_execute ─┬─► bulk_async      │
//! │        │                   (n singles)   │      │            │
//! │        │                                 │      └─► bulk     │
//! │        │                                 └─► *_collect       │
//! │        └──► when_all_execute_and_select (generic)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Shared State
//!
//! The shared prototype is passed by value and materialized exactly once per
//! top-level bulk operation; every agent references that one instance. The
//! framework performs no synchronization on it — mutation discipline
//! (locks, atomics, partitioning) belongs to the body.
//!
//! [`then_execute`]: Executor::then_execute

pub mod capability;
pub mod fork_join;
pub mod resolve;
pub mod sequential;

pub use capability::{CapabilitySet, Op, Source};
pub use fork_join::ForkJoinExecutor;
pub use resolve::{FutureSet, ResultContainer};
pub use sequential::SequentialExecutor;

use crate::future::Eventual;

/// A bulk-execution backend.
///
/// Implementors must supply the single-agent [`then_execute`] primitive;
/// everything else is synthesized by default method bodies and may be
/// overridden where the backend has a better native shape. Executors are
/// cheap handles: `Clone` hands out another reference to the same backend.
///
/// [`then_execute`]: Executor::then_execute
pub trait Executor: Clone + Send + Sync + 'static {
    /// Runs `f` with the predecessor's value once the predecessor completes.
    ///
    /// The required primitive. The returned future settles with `f`'s result;
    /// a predecessor failure, or a panic inside `f`, settles it with the
    /// failure instead.
    fn then_execute<T, R, F>(&self, predecessor: Eventual<T>, f: F) -> Eventual<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: FnOnce(T) -> R + Send + 'static;

    /// Runs `f` to completion on this executor, synchronously.
    ///
    /// A failure is re-raised as a panic on the calling thread.
    fn execute<R, F>(&self, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        resolve::execute_via_async(self, f)
    }

    /// Runs `f` asynchronously, returning a future for its result.
    fn async_execute<R, F>(&self, f: F) -> Eventual<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        resolve::async_via_then(self, f)
    }

    /// Runs `body(i, &shared)` once per `i` in `[0, n)`, synchronously.
    ///
    /// Blocks until every agent has run. A failure is re-raised as a panic.
    fn bulk_execute<S, F>(&self, body: F, n: usize, shared: S)
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) + Send + Sync + 'static,
    {
        resolve::bulk_execute_blocking(self, body, n, shared);
    }

    /// Runs `body(i, &shared)` once per `i` in `[0, n)`.
    ///
    /// The returned future completes only after all `n` invocations have.
    /// For `n == 0` it is already complete and the body is never invoked.
    fn bulk_async_execute<S, F>(&self, body: F, n: usize, shared: S) -> Eventual<()>
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) + Send + Sync + 'static,
    {
        resolve::bulk_async_via_single_agents(self, body, n, shared)
    }

    /// Runs `body(i, &past, &shared)` once per `i` in `[0, n)` after the
    /// predecessor completes.
    ///
    /// The predecessor value is retrieved exactly once (moved, not copied)
    /// and shared by reference across all agents, like the shared state.
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
        resolve::bulk_then_via_single_agents(self, predecessor, body, n, shared)
    }

    /// Collecting form of [`bulk_execute`]: each agent's result lands at its
    /// index in a container of the caller's choosing (`Vec<R>` by default).
    ///
    /// [`bulk_execute`]: Executor::bulk_execute
    fn bulk_execute_collect<C, R, S, F>(&self, body: F, n: usize, shared: S) -> C
    where
        C: ResultContainer<R> + Send + 'static,
        R: Send + 'static,
        S: Send + Sync + 'static,
        F: Fn(usize, &S) -> R + Send + Sync + 'static,
    {
        match self.bulk_async_execute_collect(body, n, shared).take() {
            Ok(container) => container,
            Err(error) => error.resume(),
        }
    }

    /// Collecting form of [`bulk_async_execute`].
    ///
    /// [`bulk_async_execute`]: Executor::bulk_async_execute
    fn bulk_async_execute_collect<C, R, S, F>(&self, body: F, n: usize, shared: S) -> Eventual<C>
    where
        C: ResultContainer<R> + Send + 'static,
        R: Send + 'static,
        S: Send + Sync + 'static,
        F: Fn(usize, &S) -> R + Send + Sync + 'static,
    {
        resolve::bulk_async_collect_via_void(self, body, n, shared)
    }

    /// Collecting form of [`bulk_then_execute`].
    ///
    /// [`bulk_then_execute`]: Executor::bulk_then_execute
    fn bulk_then_execute_collect<C, R, T, S, F>(
        &self,
        predecessor: Eventual<T>,
        body: F,
        n: usize,
        shared: S,
    ) -> Eventual<C>
    where
        C: ResultContainer<R> + Send + 'static,
        R: Send + 'static,
        T: Send + Sync + 'static,
        S: Send + Sync + 'static,
        F: Fn(usize, &T, &S) -> R + Send + Sync + 'static,
    {
        resolve::bulk_then_collect_via_void(self, predecessor, body, n, shared)
    }

    /// Waits on every future in `futures`, runs `f` over all the values,
    /// then returns the subset chosen by `select`.
    ///
    /// `select` typically moves a few of the values out and drops the rest,
    /// which is how "return only these members" is expressed here.
    fn when_all_execute_and_select<Futs, F, Sel, Out>(
        &self,
        futures: Futs,
        f: F,
        select: Sel,
    ) -> Eventual<Out>
    where
        Futs: FutureSet,
        F: FnOnce(&mut Futs::Values) + Send + 'static,
        Sel: FnOnce(Futs::Values) -> Out + Send + 'static,
        Out: Send + 'static,
    {
        resolve::when_all_execute_and_select(futures, f, select)
    }

    /// Reports which operations this backend supplies natively and which
    /// synthesis path covers the rest.
    ///
    /// Purely informational; dispatch never consults it. Backends overriding
    /// operations should override the report alongside.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::then_execute_only()
    }
}
