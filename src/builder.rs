//! PieceBuilder: append-only segmented buffer with one-shot consolidation.
//!
//! Writes go into a fixed-capacity current buffer. When it runs out, the
//! full buffer is pushed onto a newest-first chain of pieces and a new
//! buffer sized to the running total (rounded up to 64 elements) takes its
//! place, so total copying stays linear. `build` joins everything once.
//!
//! Accounting: `total_size` is the sum of every piece's length plus the
//! capacity of the current buffer, and the written length is
//! `total_size - (current_end - current.len())`.

use crate::error::BuilderError;
use tracing::trace;

/// Upper clamp for the initial capacity hint.
pub const MAX_INITIAL_SIZE: usize = 1280;

/// Owned buffers longer than this are adopted as a piece without copying.
pub const ADOPT_THRESHOLD: usize = 1280;

const GROWTH_ALIGN: usize = 64;

/// One retired buffer in the chain. `prev` links to the next-older piece.
struct Piece<T> {
    buf: Vec<T>,
    prev: Option<Box<Piece<T>>>,
}

/// Builder for a sequence of `T`, amortized O(1) per appended element.
///
/// After `build` the builder holds only the result: `build` may be called
/// again and returns the same slice, and every `append*` fails with
/// `AlreadyConsumed`.
pub struct PieceBuilder<T> {
    current: Vec<T>,
    current_end: usize,
    total_size: usize,
    extra_pieces: Option<Box<Piece<T>>>,
    built: bool,
}

/// Code-point builder: one `char` per element.
pub type UnicodeBuilder = PieceBuilder<char>;

fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}

impl<T: Copy> PieceBuilder<T> {
    /// `hint` is clamped to `MAX_INITIAL_SIZE`.
    pub fn new(hint: usize) -> Self {
        let hint = hint.min(MAX_INITIAL_SIZE);
        Self {
            current: Vec::with_capacity(hint),
            current_end: hint,
            total_size: hint,
            extra_pieces: None,
            built: false,
        }
    }

    /// Elements written so far. O(1), valid before and after `build`.
    #[inline]
    pub fn len(&self) -> usize {
        self.total_size - self.room()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    #[inline]
    fn room(&self) -> usize {
        self.current_end - self.current.len()
    }

    #[inline]
    fn check_open(&self) -> Result<(), BuilderError> {
        if self.built {
            Err(BuilderError::AlreadyConsumed)
        } else {
            Ok(())
        }
    }

    pub fn append(&mut self, s: &[T]) -> Result<(), BuilderError> {
        self.check_open()?;
        if s.len() <= self.room() {
            self.current.extend_from_slice(s);
        } else {
            self.grow_and_append(s);
        }
        Ok(())
    }

    pub fn append_char(&mut self, c: T) -> Result<(), BuilderError> {
        self.check_open()?;
        if self.room() == 0 {
            self.grow_by(1);
        }
        self.current.push(c);
        Ok(())
    }

    /// `append(&s[start..end])`, with the range checked.
    pub fn append_slice(&mut self, s: &[T], start: usize, end: usize) -> Result<(), BuilderError> {
        let part = s.get(start..end).ok_or(BuilderError::SliceOutOfBounds {
            start,
            end,
            len: s.len(),
        })?;
        self.append(part)
    }

    /// `count` copies of `c`, with at most one new buffer.
    pub fn append_multiple_char(&mut self, c: T, count: usize) -> Result<(), BuilderError> {
        self.append_repeated(core::slice::from_ref(&c), count)
    }

    /// `count` copies of `unit` back to back, with at most one new buffer.
    /// A copy of `unit` may straddle the old and new buffers.
    pub fn append_repeated(&mut self, unit: &[T], count: usize) -> Result<(), BuilderError> {
        self.check_open()?;
        let total = unit
            .len()
            .checked_mul(count)
            .unwrap_or_else(|| capacity_overflow());
        let mut items = unit.iter().copied().cycle().take(total);
        let here = total.min(self.room());
        self.current.extend(items.by_ref().take(here));
        if total > here {
            self.grow_by(total - here);
            self.current.extend(items);
        }
        Ok(())
    }

    /// Append an owned buffer. Buffers longer than `ADOPT_THRESHOLD` are
    /// linked in as a piece without copying.
    pub fn append_vec(&mut self, v: Vec<T>) -> Result<(), BuilderError> {
        self.check_open()?;
        if v.len() <= ADOPT_THRESHOLD {
            return self.append(&v);
        }
        let adopted = v.len();
        let unused = self.room();
        let retired = core::mem::take(&mut self.current);
        self.push_piece(retired);
        self.push_piece(v);
        // Pieces hold exactly their length; the unused tail is given back
        // and the new current buffer starts with no capacity.
        self.total_size = self.total_size - unused + adopted;
        self.current_end = 0;
        trace!(adopted, "adopted buffer as piece");
        Ok(())
    }

    /// Write what fits, retire the full buffer, then write the rest.
    fn grow_and_append(&mut self, s: &[T]) {
        let (head, rest) = s.split_at(self.room());
        self.current.extend_from_slice(head);
        self.grow_by(rest.len());
        self.current.extend_from_slice(rest);
    }

    /// Retire the (full) current buffer and start one with room for at
    /// least `needed` more elements.
    fn grow_by(&mut self, needed: usize) {
        debug_assert_eq!(self.room(), 0);
        let size = needed
            .checked_add(self.total_size)
            .and_then(|n| n.checked_add(GROWTH_ALIGN - 1))
            .unwrap_or_else(|| capacity_overflow())
            & !(GROWTH_ALIGN - 1);
        let retired = core::mem::replace(&mut self.current, Vec::with_capacity(size));
        self.push_piece(retired);
        self.total_size = self
            .total_size
            .checked_add(size)
            .unwrap_or_else(|| capacity_overflow());
        self.current_end = size;
    }

    fn push_piece(&mut self, buf: Vec<T>) {
        if buf.is_empty() {
            return;
        }
        let prev = self.extra_pieces.take();
        self.extra_pieces = Some(Box::new(Piece { buf, prev }));
    }

    /// Join everything written into one contiguous buffer.
    ///
    /// Reuses the current buffer when nothing was retired (shrinking it
    /// if partly filled), adopts a lone piece when nothing was written
    /// after it, and otherwise copies oldest piece first.
    pub fn build(&mut self) -> &[T] {
        if !self.built {
            self.consolidate();
        }
        &self.current
    }

    /// Build and take the result.
    pub fn into_vec(mut self) -> Vec<T> {
        if !self.built {
            self.consolidate();
        }
        core::mem::take(&mut self.current)
    }

    fn consolidate(&mut self) {
        let final_len = self.len();
        let mut joined = 0;
        let strategy = match self.extra_pieces.take() {
            None if self.current.len() == self.current_end => "exact",
            None => {
                self.current.shrink_to_fit();
                "shrink"
            }
            Some(piece) if piece.prev.is_none() && self.current.is_empty() => {
                self.current = piece.buf;
                joined = 1;
                "adopt"
            }
            Some(newest) => {
                let mut pieces = Vec::new();
                let mut next = Some(newest);
                while let Some(mut piece) = next {
                    next = piece.prev.take();
                    pieces.push(piece.buf);
                }
                let mut out = Vec::with_capacity(final_len);
                for buf in pieces.iter().rev() {
                    out.extend_from_slice(buf);
                }
                out.extend_from_slice(&self.current);
                joined = pieces.len();
                self.current = out;
                "copy"
            }
        };
        debug_assert_eq!(self.current.len(), final_len);
        trace!(strategy, pieces = joined, len = final_len, "consolidated builder");
        self.total_size = final_len;
        self.current_end = final_len;
        self.built = true;
    }
}

// Unlink iteratively so a long chain of adopted pieces cannot overflow the
// stack through recursive Box drops.
impl<T> Drop for PieceBuilder<T> {
    fn drop(&mut self) {
        let mut next = self.extra_pieces.take();
        while let Some(mut piece) = next {
            next = piece.prev.take();
        }
    }
}

impl<T: Copy> Default for PieceBuilder<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> PieceBuilder<T> {
    /// Retired buffers waiting for `build`.
    pub(crate) fn piece_count(&self) -> usize {
        let mut pieces = 0;
        let mut next = self.extra_pieces.as_deref();
        while let Some(piece) = next {
            pieces += 1;
            next = piece.prev.as_deref();
        }
        pieces
    }
}

impl<T> core::fmt::Debug for PieceBuilder<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let pieces = self.piece_count();
        f.debug_struct("PieceBuilder")
            .field("current_pos", &self.current.len())
            .field("current_end", &self.current_end)
            .field("total_size", &self.total_size)
            .field("pieces", &pieces)
            .field("built", &self.built)
            .finish()
    }
}
