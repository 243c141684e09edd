use thiserror::Error;

/// Failures raised by container operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    // === Concurrency Errors ===
    /// The underlying storage was structurally modified behind the back of
    /// a cursor or view.
    #[error("concurrent modification detected: expected modification count {expected}, found {actual}")]
    ConcurrentModification { expected: u64, actual: u64 },

    // === Access Errors ===
    /// Index outside `0..len` (or `0..=len` for insertion).
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Range with `from > to` or `to > len`.
    #[error("invalid range {from}..{to} for length {len}")]
    InvalidRange { from: usize, to: usize, len: usize },

    // === Usage Errors ===
    /// Operation called in a state where it is not allowed, e.g. removing
    /// through a cursor before the first `next`.
    #[error("illegal state: {detail}")]
    IllegalState { detail: &'static str },

    /// The view does not support the operation.
    #[error("{operation} is not supported by this view")]
    Unsupported { operation: &'static str },
}

impl CollectionError {
    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ConcurrentModification { .. } => Some(
                "Another thread changed the container while it was being traversed; synchronize access or traverse a copy",
            ),
            Self::IndexOutOfBounds { .. } | Self::InvalidRange { .. } => {
                Some("Check the container length before indexing")
            }
            Self::IllegalState { .. } => Some("Call `next` before `remove`, and remove at most once per element"),
            Self::Unsupported { .. } => Some("Modify the owning container instead of the view"),
        }
    }

    /// Whether the error signals a structural modification race.
    pub const fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Result type alias using [`CollectionError`].
pub type Result<T, E = CollectionError> = std::result::Result<T, E>;
