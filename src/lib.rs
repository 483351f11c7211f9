//! agentry: bulk execution over groups of agents.
//!
//! An *agent* is one invocation of a user body at an index in `[0, n)`. An
//! [`Executor`] runs whole groups of them, optionally after a predecessor
//! future, optionally sharing one state instance across the group, and hands
//! back an [`Eventual`] for the batch.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        AGENTRY                              │
//! │                                                             │
//! │  executor ─ the bulk contract + capability resolution       │
//! │    ├─ sequential ─ strictly-ordered single-thread backend   │
//! │    └─ fork_join ─ thread-per-split parallel backend         │
//! │  future ─ one-shot settled values (Eventual / Promise)      │
//! │  processor ─ CPU identity and pinned execution              │
//! │  error ─ the crate-wide failure type                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backends implement only the single-agent `then_execute` primitive plus
//! whatever they do natively; the [`Executor`] trait's default methods
//! synthesize every other operation shape at compile time. See the
//! [`executor`] module docs for the fallback lattice.
//!
//! # Example
//!
//! ```
//! use agentry::{Executor, Eventual, ForkJoinExecutor};
//!
//! let exec = ForkJoinExecutor::new();
//! let squares: Vec<usize> = exec
//!     .bulk_then_execute_collect(
//!         Eventual::ready(10_usize),
//!         |i, base: &usize, (): &()| (base + i) * (base + i),
//!         4,
//!         (),
//!     )
//!     .take()
//!     .expect("batch");
//! assert_eq!(squares, vec![100, 121, 144, 169]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod executor;
pub mod future;
pub mod processor;
pub mod tracing_compat;

pub use error::{Error, ErrorKind};
pub use executor::{
    CapabilitySet, Executor, ForkJoinExecutor, FutureSet, Op, ResultContainer,
    SequentialExecutor, Source,
};
pub use future::{Eventual, Launch, Promise};
pub use processor::{CpuId, ProcessorId};
