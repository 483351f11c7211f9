//! Processor identity and CPU-pinned execution.
//!
//! A [`ProcessorId`] is either a concrete CPU or the explicit unknown
//! processor — a sum type, not a sentinel value. Operations that need a
//! concrete CPU fail with `NoProcessor` when handed the unknown variant.
//!
//! Pinning goes through the `core_affinity` crate; this module never touches
//! the platform API directly. The "current processor" query is best-effort:
//! it reports the last CPU this thread was successfully pinned to, and
//! `Unknown` for threads that were never pinned.

use core::fmt;
use std::cell::Cell;
use std::sync::Arc;

use crate::error::Error;
use crate::future::{self, Eventual, Launch};
use crate::tracing_compat::debug;

/// An opaque identifier for one CPU core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(usize);

impl CpuId {
    /// Wraps a platform core index.
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the platform core index.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// A processor to run on: a concrete CPU, or explicitly none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessorId {
    /// No processor. Pinned operations on this variant fail with
    /// `NoProcessor` rather than silently running unpinned.
    #[default]
    Unknown,
    /// A concrete CPU core.
    Cpu(CpuId),
}

impl fmt::Display for ProcessorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("<unknown processor>"),
            Self::Cpu(id) => write!(f, "{id}"),
        }
    }
}

thread_local! {
    static CURRENT: Cell<ProcessorId> = const { Cell::new(ProcessorId::Unknown) };
}

/// Returns the processor this thread was last successfully pinned to.
#[must_use]
pub fn current() -> ProcessorId {
    CURRENT.with(Cell::get)
}

/// Lists the CPUs available for pinning.
#[must_use]
pub fn available() -> Vec<CpuId> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .map(|core| CpuId::new(core.id))
        .collect()
}

/// Binds the calling thread to `processor`.
///
/// # Errors
///
/// `NoProcessor` for [`ProcessorId::Unknown`]; `Affinity` if the platform
/// rejects the binding.
pub fn pin_current(processor: ProcessorId) -> Result<(), Error> {
    match processor {
        ProcessorId::Unknown => Err(Error::no_processor()),
        ProcessorId::Cpu(id) => {
            if core_affinity::set_for_current(core_affinity::CoreId { id: id.get() }) {
                debug!(%id, "pinned thread");
                CURRENT.with(|current| current.set(processor));
                Ok(())
            } else {
                Err(Error::affinity(format!("failed to pin thread to {id}")))
            }
        }
    }
}

/// Runs `f` on a fresh thread pinned to `processor`.
///
/// A binding failure settles the returned future with the error; `f` is not
/// invoked in that case.
pub fn spawn_on<R, F>(processor: ProcessorId, f: F) -> Eventual<R>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    Eventual::ready(()).then(Launch::Thread, move |_| {
        pin_current(processor)?;
        Ok(f())
    })
}

/// Runs `body(i)` once per `i` in `[0, n)`, each on its own thread pinned to
/// `processor`, joined into one future.
pub fn bulk_spawn_on<F>(processor: ProcessorId, n: usize, body: F) -> Eventual<()>
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let body = Arc::new(body);
    let tasks: Vec<Eventual<()>> = (0..n)
        .map(|index| {
            let body = Arc::clone(&body);
            spawn_on(processor, move || body(index))
        })
        .collect();
    future::when_all(tasks).then(Launch::Deferred, |joined| joined.map(|_| ()))
}

/// Runs `f` on `processor`, inline when this thread is already there.
///
/// # Errors
///
/// `NoProcessor` for [`ProcessorId::Unknown`]; otherwise whatever
/// [`spawn_on`] reports.
pub fn sync_on<R, F>(processor: ProcessorId, f: F) -> Result<R, Error>
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    match processor {
        ProcessorId::Unknown => Err(Error::no_processor()),
        ProcessorId::Cpu(_) if processor == current() => Ok(f()),
        ProcessorId::Cpu(_) => spawn_on(processor, f).take(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn unknown_processor_is_an_explicit_failure() {
        let err = spawn_on(ProcessorId::Unknown, || 1)
            .take()
            .expect_err("unknown must fail");
        assert_eq!(err.kind(), ErrorKind::NoProcessor);

        let err = sync_on(ProcessorId::Unknown, || 1).expect_err("unknown must fail");
        assert_eq!(err.kind(), ErrorKind::NoProcessor);
    }

    #[test]
    fn processor_ids_order_and_display() {
        let a = ProcessorId::Cpu(CpuId::new(0));
        let b = ProcessorId::Cpu(CpuId::new(3));
        assert!(a < b);
        assert_eq!(b.to_string(), "cpu3");
        assert_eq!(ProcessorId::Unknown.to_string(), "<unknown processor>");
    }

    #[test]
    fn unpinned_thread_reports_unknown() {
        std::thread::spawn(|| assert_eq!(current(), ProcessorId::Unknown))
            .join()
            .expect("probe thread");
    }

    #[test]
    fn spawn_on_runs_on_the_requested_cpu() {
        let Some(&cpu) = available().first() else {
            return; // no pinnable cores in this environment
        };
        let processor = ProcessorId::Cpu(cpu);
        let observed = spawn_on(processor, current).take().expect("pinned task");
        assert_eq!(observed, processor);
    }

    #[test]
    fn bulk_spawn_on_runs_every_index() {
        let Some(&cpu) = available().first() else {
            return;
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&calls);
        bulk_spawn_on(ProcessorId::Cpu(cpu), 8, move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .take()
        .expect("bulk completion");
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn sync_on_runs_inline_when_already_there() {
        let Some(&cpu) = available().first() else {
            return;
        };
        let processor = ProcessorId::Cpu(cpu);
        let result = spawn_on(processor, move || {
            let here = std::thread::current().id();
            let observed =
                sync_on(processor, move || std::thread::current().id()).expect("inline run");
            here == observed
        })
        .take()
        .expect("outer task");
        assert!(result);
    }
}
