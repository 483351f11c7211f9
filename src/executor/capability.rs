//! Capability descriptors: which operations a backend supplies natively.
//!
//! Resolution of a bulk operation happens at compile time — an executor that
//! overrides a default method of [`Executor`] is dispatched to directly, with
//! no runtime branch. The descriptor here is the *reportable* side of that
//! fact: a static table, one entry per operation shape, stating whether the
//! backend implements it natively or which synthesis path the resolver uses
//! instead. It exists for introspection and tests; it never influences
//! dispatch.
//!
//! Resolution is idempotent by construction: the table is a pure function of
//! the executor type, so repeated queries return identical answers.
//!
//! [`Executor`]: crate::executor::Executor

use core::fmt;

/// An operation shape in the bulk-execution contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Single-agent synchronous `execute`.
    Execute,
    /// Single-agent `async_execute`.
    AsyncExecute,
    /// Single-agent `then_execute` (the required primitive).
    ThenExecute,
    /// Heterogeneous `when_all_execute_and_select`.
    WhenAllExecuteAndSelect,
    /// Multi-agent synchronous `bulk_execute`.
    BulkExecute,
    /// Multi-agent `bulk_async_execute`.
    BulkAsyncExecute,
    /// Multi-agent `bulk_then_execute`.
    BulkThenExecute,
    /// Multi-agent collecting forms (`*_collect`).
    BulkCollect,
}

impl Op {
    /// Every operation shape, in table order.
    pub const ALL: [Self; 8] = [
        Self::Execute,
        Self::AsyncExecute,
        Self::ThenExecute,
        Self::WhenAllExecuteAndSelect,
        Self::BulkExecute,
        Self::BulkAsyncExecute,
        Self::BulkThenExecute,
        Self::BulkCollect,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Execute => 0,
            Self::AsyncExecute => 1,
            Self::ThenExecute => 2,
            Self::WhenAllExecuteAndSelect => 3,
            Self::BulkExecute => 4,
            Self::BulkAsyncExecute => 5,
            Self::BulkThenExecute => 6,
            Self::BulkCollect => 7,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Execute => "execute",
            Self::AsyncExecute => "async_execute",
            Self::ThenExecute => "then_execute",
            Self::WhenAllExecuteAndSelect => "when_all_execute_and_select",
            Self::BulkExecute => "bulk_execute",
            Self::BulkAsyncExecute => "bulk_async_execute",
            Self::BulkThenExecute => "bulk_then_execute",
            Self::BulkCollect => "bulk_collect",
        };
        f.write_str(s)
    }
}

/// How an operation shape is supplied for a given executor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// The backend implements the operation itself.
    Native,
    /// Synthesized from the single-agent `then_execute` primitive (an
    /// already-ready predecessor turns "run after" into "run now").
    ViaThenExecute,
    /// Synthesized on top of the backend's multi-agent void operation
    /// (collecting forms fill the container under a lock).
    ViaBulkExecute,
    /// Synthesized from `n` independent single-agent operations joined by
    /// `when_all`.
    ViaSingleAgentLoop,
    /// The generic free-function implementation, independent of the backend.
    Generic,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Native => "native",
            Self::ViaThenExecute => "via then_execute",
            Self::ViaBulkExecute => "via bulk_execute",
            Self::ViaSingleAgentLoop => "via single-agent loop",
            Self::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// The full capability table for one executor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    sources: [Source; 8],
}

impl CapabilitySet {
    /// The table for a backend that supplies only the required single-agent
    /// `then_execute` primitive; everything else is synthesized.
    ///
    /// This is the default reported by [`Executor::capabilities`]; backends
    /// that override operations should override the report alongside.
    ///
    /// [`Executor::capabilities`]: crate::executor::Executor::capabilities
    #[must_use]
    pub const fn then_execute_only() -> Self {
        let mut sources = [Source::ViaSingleAgentLoop; 8];
        sources[Op::Execute.index()] = Source::ViaThenExecute;
        sources[Op::AsyncExecute.index()] = Source::ViaThenExecute;
        sources[Op::ThenExecute.index()] = Source::Native;
        sources[Op::WhenAllExecuteAndSelect.index()] = Source::Generic;
        Self { sources }
    }

    /// Returns a copy with `op` resolved from `source`.
    #[must_use]
    pub const fn with(mut self, op: Op, source: Source) -> Self {
        self.sources[op.index()] = source;
        self
    }

    /// Resolves the implementation source for `op`.
    #[must_use]
    pub const fn resolve(&self, op: Op) -> Source {
        self.sources[op.index()]
    }

    /// Returns `true` if `op` is supplied natively.
    #[must_use]
    pub const fn is_native(&self, op: Op) -> bool {
        matches!(self.resolve(op), Source::Native)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in Op::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{op}: {}", self.resolve(*op))?;
        }
        Ok(())
    }
}
