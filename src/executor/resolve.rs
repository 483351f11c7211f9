//! Synthesis of missing operation shapes from more primitive ones.
//!
//! Every default method body of [`Executor`] delegates here. The free
//! functions compose a requested operation out of whatever the backend
//! actually supplies, in the documented order of preference:
//!
//! - `async_execute` ← `then_execute` on an already-ready predecessor
//!   ("run now" synthesized from "run after a trivial predecessor").
//! - synchronous forms ← asynchronous forms, blocked on and retrieved
//!   (a retrieved failure is re-raised on the calling thread).
//! - multi-agent void forms ← `n` independent single-agent operations,
//!   joined by [`when_all`]-style retrieval of every agent future.
//! - collecting forms ← the void multi-agent form, each agent writing its
//!   result into the container at its own index under a lock.
//! - `when_all_execute_and_select` ← the generic implementation that waits
//!   on every future in the set and returns the selected subset.
//!
//! The compositions are themselves expressed through `Executor` methods, so
//! they chain: a backend supplying only single-agent `then_execute` gets
//! every other shape derived purely from that primitive.
//!
//! [`when_all`]: crate::future::when_all

use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::future::{Eventual, Launch};
use crate::tracing_compat::trace;

use super::Executor;

/// Single-agent `async_execute` from the `then_execute` primitive.
pub fn async_via_then<E, R, F>(executor: &E, f: F) -> Eventual<R>
where
    E: Executor,
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    executor.then_execute(Eventual::ready(()), move |()| f())
}

/// Single-agent synchronous `execute` from `async_execute`.
///
/// Blocks until the agent completes; a failure is re-raised as a panic on
/// the calling thread, since the synchronous signature has no error channel.
pub fn execute_via_async<E, R, F>(executor: &E, f: F) -> R
where
    E: Executor,
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    match executor.async_execute(f).take() {
        Ok(value) => value,
        Err(error) => error.resume(),
    }
}

/// Multi-agent `bulk_then_execute` from `n` independent single-agent
/// `async_execute`s.
///
/// The predecessor value is retrieved exactly once and moved next to the
/// shared-state instance; both are referenced (never copied) by every agent.
/// Every agent future is retrieved, even after a failure has been observed;
/// the first failure in index order is reported.
pub fn bulk_then_via_single_agents<E, T, S, F>(
    executor: &E,
    predecessor: Eventual<T>,
    body: F,
    n: usize,
    shared: S,
) -> Eventual<()>
where
    E: Executor,
    T: Send + Sync + 'static,
    S: Send + Sync + 'static,
    F: Fn(usize, &T, &S) + Send + Sync + 'static,
{
    if n == 0 {
        return Eventual::ready(());
    }
    let executor = executor.clone();
    let body = Arc::new(body);
    predecessor.then(Launch::Deferred, move |past| {
        // Moved exactly once; agents only ever see a reference.
        let shared = Arc::new((past?, shared));
        trace!(n, "fanning out single-agent operations");
        let agents: Vec<Eventual<()>> = (0..n)
            .map(|index| {
                let shared = Arc::clone(&shared);
                let body = Arc::clone(&body);
                executor.async_execute(move || {
                    let (past, state) = &*shared;
                    body(index, past, state);
                })
            })
            .collect();
        join_agents(agents)
    })
}

/// Multi-agent `bulk_async_execute` from `n` independent single-agent
/// operations (no predecessor).
pub fn bulk_async_via_single_agents<E, S, F>(
    executor: &E,
    body: F,
    n: usize,
    shared: S,
) -> Eventual<()>
where
    E: Executor,
    S: Send + Sync + 'static,
    F: Fn(usize, &S) + Send + Sync + 'static,
{
    bulk_then_via_single_agents(
        executor,
        Eventual::ready(()),
        move |index, (): &(), state| body(index, state),
        n,
        shared,
    )
}

/// Synchronous multi-agent `bulk_execute` from the asynchronous form.
pub fn bulk_execute_blocking<E, S, F>(executor: &E, body: F, n: usize, shared: S)
where
    E: Executor,
    S: Send + Sync + 'static,
    F: Fn(usize, &S) + Send + Sync + 'static,
{
    if let Err(error) = executor.bulk_async_execute(body, n, shared).take() {
        error.resume();
    }
}

/// Collecting `bulk_then_execute` from the void multi-agent form.
///
/// The container is created with `n` slots up front; each agent stores its
/// result at its own index under a lock. The lock serializes only the
/// stores, not the body invocations.
pub fn bulk_then_collect_via_void<E, C, R, T, S, F>(
    executor: &E,
    predecessor: Eventual<T>,
    body: F,
    n: usize,
    shared: S,
) -> Eventual<C>
where
    E: Executor,
    C: ResultContainer<R> + Send + 'static,
    R: Send + 'static,
    T: Send + Sync + 'static,
    S: Send + Sync + 'static,
    F: Fn(usize, &T, &S) -> R + Send + Sync + 'static,
{
    let results = Arc::new(Mutex::new(Some(C::with_len(n))));
    let sink = Arc::clone(&results);
    let done = executor.bulk_then_execute(
        predecessor,
        move |index, past, state| {
            let value = body(index, past, state);
            let mut slot = sink.lock().expect("result container lock poisoned");
            if let Some(container) = slot.as_mut() {
                container.put(index, value);
            }
        },
        n,
        shared,
    );
    done.then(Launch::Deferred, move |completed| {
        completed?;
        results
            .lock()
            .expect("result container lock poisoned")
            .take()
            .ok_or_else(|| Error::internal("result container already taken"))
    })
}

/// Collecting `bulk_async_execute` from the void multi-agent form.
pub fn bulk_async_collect_via_void<E, C, R, S, F>(
    executor: &E,
    body: F,
    n: usize,
    shared: S,
) -> Eventual<C>
where
    E: Executor,
    C: ResultContainer<R> + Send + 'static,
    R: Send + 'static,
    S: Send + Sync + 'static,
    F: Fn(usize, &S) -> R + Send + Sync + 'static,
{
    bulk_then_collect_via_void(
        executor,
        Eventual::ready(()),
        move |index, (): &(), state| body(index, state),
        n,
        shared,
    )
}

/// Generic `when_all_execute_and_select`, independent of the backend.
///
/// Waits on every future in the set, runs `f` over all the values, then
/// returns the subset chosen by `select`. Used whenever an executor has no
/// native combinator.
pub fn when_all_execute_and_select<Futs, F, Sel, Out>(
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
    Eventual::deferred(move || {
        let mut values = futures.take_all()?;
        f(&mut values);
        Ok(select(values))
    })
}

fn join_agents(agents: Vec<Eventual<()>>) -> Result<(), Error> {
    let mut first_failure: Option<Error> = None;
    for agent in agents {
        if let Err(error) = agent.take() {
            first_failure.get_or_insert(error);
        }
    }
    first_failure.map_or(Ok(()), Err)
}

/// An indexable destination for multi-agent results.
///
/// `Vec<R>` is the default container; user containers implement this trait
/// and are filled at each agent's index by the collecting operations.
pub trait ResultContainer<R> {
    /// Creates the container with `n` slots.
    fn with_len(n: usize) -> Self;

    /// Stores `value` at `index`. Each index is written exactly once.
    fn put(&mut self, index: usize, value: R);
}

impl<R: Default> ResultContainer<R> for Vec<R> {
    fn with_len(n: usize) -> Self {
        let mut values = Self::new();
        values.resize_with(n, R::default);
        values
    }

    fn put(&mut self, index: usize, value: R) {
        self[index] = value;
    }
}

/// A heterogeneous, fixed-arity set of futures.
///
/// Implemented for tuples of [`Eventual`] up to arity four. `take_all`
/// retrieves every member even after a failure, then reports the first
/// failure in tuple order.
pub trait FutureSet: Send + 'static {
    /// The tuple of settled values.
    type Values: Send + 'static;

    /// Blocks until every future is complete and retrieves all of them.
    fn take_all(self) -> Result<Self::Values, Error>;
}

macro_rules! impl_future_set {
    ($(($($name:ident),+))+) => {$(
        impl<$($name: Send + 'static),+> FutureSet for ($(Eventual<$name>,)+) {
            type Values = ($($name,)+);

            #[allow(non_snake_case)]
            fn take_all(self) -> Result<Self::Values, Error> {
                let ($($name,)+) = self;
                $(let $name = $name.take();)+
                Ok(($($name?,)+))
            }
        }
    )+};
}

impl_future_set! {
    (A)
    (A, B)
    (A, B, C)
    (A, B, C, D)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::future;

    #[test]
    fn vec_is_the_default_container() {
        let mut values: Vec<i32> = ResultContainer::with_len(3);
        assert_eq!(values, vec![0, 0, 0]);
        values.put(1, 7);
        assert_eq!(values, vec![0, 7, 0]);
    }

    #[test]
    fn future_set_takes_in_tuple_order() {
        let set = (Eventual::ready(1), future::spawn(|| "two"), Eventual::ready(3.0_f64));
        let (a, b, c) = set.take_all().expect("all ready");
        assert_eq!(a, 1);
        assert_eq!(b, "two");
        assert!((c - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn future_set_reports_first_failure_after_retrieving_all() {
        let set = (
            Eventual::<i32>::failed(Error::dropped()),
            Eventual::ready(2),
        );
        let err = set.take_all().expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Dropped);
    }

    #[test]
    fn generic_when_all_runs_body_then_selects() {
        let futures = (Eventual::ready(5), Eventual::ready(String::from("keep")));
        let out = when_all_execute_and_select(
            futures,
            |(count, label): &mut (i32, String)| {
                *count += 1;
                label.push('!');
            },
            |(_, label)| label,
        );
        assert_eq!(out.take().expect("selected"), "keep!");
    }
}
