//! Error types surfaced by the dict and the builders.

use thiserror::Error;

/// Failures reported by `OrderedDict` and `DictCursor`.
///
/// `KeyNotFound` and `Empty` are both the runtime's `KeyError`; they are
/// kept apart so callers can word the message the way the language does.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq)]
pub enum DictError {
    /// Lookup, delete, pop or move_to_end on an absent key.
    #[error("key not found")]
    KeyNotFound,

    /// popitem on a dict with no live entries.
    #[error("popitem(): dictionary is empty")]
    Empty,

    /// The dict was cleared, compacted or reordered after the cursor was
    /// created, or the cursor belongs to another dict.
    #[error("dictionary changed structure during iteration")]
    IteratorInvalidated,
}

impl DictError {
    /// True for both flavours of the runtime's `KeyError`.
    pub fn is_key_error(&self) -> bool {
        matches!(self, DictError::KeyNotFound | DictError::Empty)
    }
}

/// Failures reported by `PieceBuilder` and `StringBuilder`.
#[derive(Error, Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuilderError {
    /// An `append*` call after `build()`.
    #[error("builder already consumed by build()")]
    AlreadyConsumed,

    /// `append_slice` range outside the source, or not on a char boundary.
    #[error("slice {start}..{end} out of bounds for source of length {len}")]
    SliceOutOfBounds { start: usize, end: usize, len: usize },
}
