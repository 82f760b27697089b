//! Error types for the A2DP codec adapter.

use crate::engine::EngineError;

/// Errors returned by the codec adapter.
///
/// Every failure is reported to the immediate caller (the transport
/// manager). Nothing is retried inside the adapter:
///
/// - **Wire**: [`MalformedInput`](Self::MalformedInput),
///   [`BufferTooSmall`](Self::BufferTooSmall).
/// - **Negotiation**: [`Unsupported`](Self::Unsupported).
/// - **Engine**: [`ResourceExhausted`](Self::ResourceExhausted),
///   [`InvalidConfiguration`](Self::InvalidConfiguration),
///   [`InvalidInput`](Self::InvalidInput).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A capability or configuration blob is shorter than the fixed structure.
    #[error("malformed input: expected at least {expected} bytes, got {actual}")]
    MalformedInput { expected: usize, actual: usize },

    /// No common sample rate or channel mode, or a parameter with no
    /// defined mapping.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// The encoding engine handle could not be acquired.
    #[error("encoding engine could not be acquired")]
    ResourceExhausted(#[source] EngineError),

    /// The engine rejected the configured parameters.
    #[error("engine rejected configuration")]
    InvalidConfiguration(#[source] EngineError),

    /// The engine reported a failure while encoding.
    #[error("engine failed to encode input")]
    InvalidInput(#[source] EngineError),

    /// A caller-supplied output buffer cannot hold the fixed structure.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
}

/// Convenience alias for `Result<T, CodecError>`.
pub type Result<T> = std::result::Result<T, CodecError>;
