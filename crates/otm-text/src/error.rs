//! Error types for the text algebra.

/// Errors raised by text operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtError {
    /// `apply` was given a document whose length differs from the base length.
    #[error("operation expects a document of {expected} chars, got {actual}")]
    ApplyLengthMismatch { expected: usize, actual: usize },

    /// `compose` operands do not line up: the first's output length differs
    /// from the second's input length.
    #[error("cannot compose: first operation produces {first_target} chars, second expects {second_base}")]
    ComposeLengthMismatch {
        first_target: usize,
        second_base: usize,
    },

    /// `transform` operands were not authored against the same document.
    #[error("cannot transform: operands expect {left_base} and {right_base} chars")]
    TransformLengthMismatch { left_base: usize, right_base: usize },

    /// A position or range falls outside the document.
    #[error("range {pos}..{end} is outside a document of {len} chars")]
    OutOfRange { pos: usize, end: usize, len: usize },

    /// The wire form contained a zero count or an empty insertion.
    #[error("invalid component in wire form: {0}")]
    InvalidComponent(String),
}

/// Convenience alias for text algebra results.
pub type OtResult<T> = Result<T, OtError>;
