//! Tracing shim for structured diagnostics.
//!
//! Executor internals emit `trace!`/`debug!` events at spawn, split, join and
//! pin points. With the `tracing-integration` feature enabled these are the
//! real `tracing` macros; without it they compile to nothing, so the default
//! build carries no logging dependency at runtime cost.
//!
//! ```toml
//! agentry = { version = "0.1", features = ["tracing-integration"] }
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, trace};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    //! No-op macro expansions when tracing is disabled.

    /// No-op trace-level logging macro.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op debug-level logging macro.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    pub use crate::{debug, trace};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;

#[cfg(test)]
mod tests {
    #[allow(unused_imports)]
    use super::*;

    #[test]
    fn macros_compile_in_both_modes() {
        trace!("split range");
        debug!(agents = 4, "joined subtree");
    }
}
