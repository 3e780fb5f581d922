//! rt-collections: the ordered dict and string builders of a language
//! runtime, as a standalone library.
//!
//! Internal Design:
//!
//! Summary
//! - Two independent components:
//!   - OrderedDict<K, V, O>: insertion-ordered mapping. Assigning to an
//!     existing key keeps its position; `move_to_end` relocates a key to
//!     either end in O(1); a `DictCursor` survives mutation between steps.
//!   - PieceBuilder<T> / StringBuilder: append-only builders that chain
//!     filled buffers as pieces and concatenate once on `build`.
//! - Dict layers:
//!   - IndexTable: open-addressing slots (free / tombstone / offset) whose
//!     physical width tracks the table size.
//!   - EntryLog: append-only records with a doubly linked iteration order;
//!     removal empties a record in place.
//!   - DictCore: index + log + resize counter + structural stamp. Driven
//!     with precomputed hashes; never calls user code.
//!   - OrderedDict: adds the `KeyOps` capability and the reentrancy guard.
//!
//! Constraints
//! - `Send` but not `Sync`: no internal locking; an owner that shares a
//!   dict across threads wraps it in a lock.
//! - At least a third of the slots stay free, so every probe terminates.
//! - Offsets are stable until a reindex compacts the log; compaction
//!   changes the structural stamp.
//!
//! Reentrancy policy
//! - `KeyOps::hash`/`eq` run while probing. Every entry point that calls
//!   them holds a debug-only `DebugReentrancy` guard, so a `KeyOps` that
//!   reaches back into the same dict panics in debug builds instead of
//!   observing a half-updated index.
//!
//! Hashing invariants
//! - Each entry stores its `u64` hash; reindexing reuses stored hashes and
//!   never calls `KeyOps::hash`.
//! - Lookups compare stored hashes before calling `KeyOps::eq`.
//!
//! Notes and non-goals
//! - No weak-keyed, thread-safe or persistent variants.
//! - Builders are append-only; there is no insert-at or truncate.
//! - Lower layers are internal; the `bench_internal` feature exposes
//!   `index_table` for benchmarks.

mod builder;
mod dict_iter;
mod entry_log;
mod error;
#[cfg(feature = "bench_internal")]
pub mod index_table;
#[cfg(not(feature = "bench_internal"))]
mod index_table;
mod key_ops;
mod ordered_dict;
mod ordered_dict_proptest;
mod reentrancy;
mod string_builder;

// Public surface
pub use builder::{PieceBuilder, UnicodeBuilder, ADOPT_THRESHOLD, MAX_INITIAL_SIZE};
pub use dict_iter::{DictCursor, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use error::{BuilderError, DictError};
pub use index_table::SlotWidth;
pub use key_ops::{KeyOps, StdKeyOps};
pub use ordered_dict::OrderedDict;
pub use reentrancy::{DebugReentrancy, ReentrancyGuard};
pub use string_builder::StringBuilder;
