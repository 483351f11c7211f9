//! Error types for bulk execution.
//!
//! Errors here are runtime failures only: a panicking agent body, a dropped
//! promise, or a failed processor binding. Capability-resolution failures are
//! deliberately *not* representable — an executor type that lacks the
//! required primitive simply does not implement [`Executor`], and the request
//! fails at compile time.
//!
//! [`Executor`]: crate::executor::Executor

use core::fmt;
use std::any::Any;
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An agent body (or continuation) panicked; the payload is preserved as
    /// a message.
    Panicked,
    /// The producing side of a future was dropped without settling it.
    Dropped,
    /// An operation required a concrete processor but was given the unknown
    /// processor.
    NoProcessor,
    /// Binding a thread to a processor failed.
    Affinity,
    /// Internal invariant violation (a bug in this crate).
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Panicked => "panicked",
            Self::Dropped => "dropped",
            Self::NoProcessor => "no processor",
            Self::Affinity => "affinity",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A runtime failure carried by an [`Eventual`].
///
/// A failure is surfaced exactly once, by [`Eventual::take`]; merely waiting
/// on a future does not observe it.
///
/// [`Eventual`]: crate::future::Eventual
/// [`Eventual::take`]: crate::future::Eventual::take
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<Arc<str>>,
}

impl Error {
    /// Creates an error of the given kind with no message.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    /// Creates an error of the given kind with a message.
    #[must_use]
    pub fn with_message(kind: ErrorKind, message: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    /// Converts a caught panic payload into a `Panicked` error.
    ///
    /// String payloads (the common case from `panic!` with a literal or a
    /// formatted message) are preserved; anything else is summarized.
    #[must_use]
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|payload| payload.downcast::<String>().map(|s| *s))
            .unwrap_or_else(|_| "non-string panic payload".to_string());
        Self::with_message(ErrorKind::Panicked, message)
    }

    /// Creates a `Dropped` error.
    #[must_use]
    pub fn dropped() -> Self {
        Self::new(ErrorKind::Dropped)
    }

    /// Creates a `NoProcessor` error.
    #[must_use]
    pub fn no_processor() -> Self {
        Self::new(ErrorKind::NoProcessor)
    }

    /// Creates an `Affinity` error with a message.
    #[must_use]
    pub fn affinity(message: impl Into<Arc<str>>) -> Self {
        Self::with_message(ErrorKind::Affinity, message)
    }

    /// Creates an `Internal` error with a message.
    #[must_use]
    pub fn internal(message: impl Into<Arc<str>>) -> Self {
        Self::with_message(ErrorKind::Internal, message)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Re-raises this failure as a panic.
    ///
    /// Used where an infallible signature (the synchronous `execute` forms)
    /// must surface a retrieved failure.
    pub fn resume(self) -> ! {
        panic!("{self}")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.kind, message),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_and_without_message() {
        let bare = Error::new(ErrorKind::Dropped);
        assert_eq!(bare.to_string(), "dropped");

        let with = Error::affinity("core 3 rejected");
        assert_eq!(with.to_string(), "affinity: core 3 rejected");
    }

    #[test]
    fn panicked_preserves_string_payloads() {
        let from_str = Error::panicked(Box::new("boom"));
        assert_eq!(from_str.kind(), ErrorKind::Panicked);
        assert_eq!(from_str.message(), Some("boom"));

        let from_string = Error::panicked(Box::new(String::from("formatted boom")));
        assert_eq!(from_string.message(), Some("formatted boom"));

        let opaque = Error::panicked(Box::new(42_u32));
        assert_eq!(opaque.message(), Some("non-string panic payload"));
    }

    #[test]
    fn resume_panics_with_display() {
        let err = Error::with_message(ErrorKind::Panicked, "agent 5 failed");
        let caught = std::panic::catch_unwind(move || err.resume());
        let payload = caught.expect_err("resume must panic");
        let roundtrip = Error::panicked(payload);
        assert_eq!(roundtrip.message(), Some("panicked: agent 5 failed"));
    }
}
