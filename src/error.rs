//! Error types for paraperm.

use thiserror::Error;

/// Result type alias using paraperm's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the permutation engine and its transports.
///
/// Every error is fatal to the `permute` call that produced it. The
/// engine makes no attempt at cross-rank agreement on error state;
/// callers layering fault tolerance must do so externally.
#[derive(Error, Debug)]
pub enum Error {
    /// The process group is empty (P = 0).
    #[error("process group is empty")]
    EmptyGroup,

    /// `n` exceeds the supported index range, or block arithmetic for
    /// this rank cannot be represented in 64 bits.
    #[error("index arithmetic overflow for n = {n}")]
    IndexOverflow {
        /// The requested permutation length.
        n: u64,
    },

    /// A collective or point-to-point primitive failed.
    #[error("transport failure in '{op}': {detail}")]
    Transport {
        /// The transport operation that failed.
        op: &'static str,
        /// Short description of the failure.
        detail: String,
    },

    /// A defensive invariant check tripped. Indicates a bug in the
    /// engine or a misbehaving transport, never a caller error.
    #[error("protocol violation: {detail}")]
    ProtocolViolation {
        /// What was observed.
        detail: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Transport`] with a formatted detail.
    pub(crate) fn transport(op: &'static str, detail: impl Into<String>) -> Self {
        Self::Transport {
            op,
            detail: detail.into(),
        }
    }

    /// Shorthand for a [`Error::ProtocolViolation`].
    pub(crate) fn protocol(detail: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            detail: detail.into(),
        }
    }
}
