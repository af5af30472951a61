//! Error taxonomy for the vector storage substrate.
//!
//! Every fallible operation in this crate returns one of the kinds below.
//! Lifecycle violations treated as programmer error (calling a mutator
//! before `initialize`, freeing into the reserved range) are not
//! represented here: they are fatal and enforced with `assert!`/
//! `debug_assert!` at the call site instead.

use thiserror::Error;

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the identifier manager, vector store, and operator
/// registry.
///
/// Each variant carries the offending label, local id, or description so
/// the `Display` message is diagnostic without any extra formatting at the
/// call site. [`Error::code`] returns a stable short code suitable for log
/// correlation across process restarts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An enum axis (metric, element type, SIMD level) was out of range, or
    /// `reserved_id > next_id` was passed to `initialize`.
    #[error("[VSTORE-001] invalid argument: {0}")]
    InvalidArgument(String),

    /// A label or registry cell that must be unique was already present.
    #[error("[VSTORE-002] already exists: {0}")]
    AlreadyExists(String),

    /// A label or local id lookup found nothing.
    #[error("[VSTORE-003] not found: {0}")]
    NotFound(String),

    /// A local id was at or beyond `max_elements`, or its batch slot has no
    /// backing storage yet.
    #[error("[VSTORE-004] out of range: {0}")]
    OutOfRange(String),

    /// No free local id was available and growth is not permitted.
    #[error("[VSTORE-005] resource exhausted: {0}")]
    ResourceExhausted(String),

    /// An allocator failure or a missing kernel prevented construction.
    #[error("[VSTORE-006] unavailable: {0}")]
    Unavailable(String),

    /// An operation was attempted after a lifecycle boundary that forbids
    /// it (registering an operator after `finish_build`, for instance).
    #[error("[VSTORE-007] failed precondition: {0}")]
    FailedPrecondition(String),
}

impl Error {
    /// Returns the stable short code for this error (e.g. `"VSTORE-003"`).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "VSTORE-001",
            Self::AlreadyExists(_) => "VSTORE-002",
            Self::NotFound(_) => "VSTORE-003",
            Self::OutOfRange(_) => "VSTORE-004",
            Self::ResourceExhausted(_) => "VSTORE-005",
            Self::Unavailable(_) => "VSTORE-006",
            Self::FailedPrecondition(_) => "VSTORE-007",
        }
    }

    /// All of these are recoverable by construction: fatal programmer
    /// errors never reach this type, they abort via `assert!` instead.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<Error> {
        vec![
            Error::InvalidArgument("x".into()),
            Error::AlreadyExists("x".into()),
            Error::NotFound("x".into()),
            Error::OutOfRange("x".into()),
            Error::ResourceExhausted("x".into()),
            Error::Unavailable("x".into()),
            Error::FailedPrecondition("x".into()),
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(Error::code).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes.len(), sorted.len());
    }

    #[test]
    fn error_messages_include_offending_value() {
        let err = Error::NotFound("label 42".into());
        assert!(err.to_string().contains("label 42"));
        assert!(err.to_string().contains("VSTORE-003"));
    }

    #[test]
    fn all_errors_are_recoverable() {
        for err in all_variants() {
            assert!(err.is_recoverable());
        }
    }
}
