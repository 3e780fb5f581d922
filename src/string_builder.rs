//! StringBuilder: UTF-8 text on top of `PieceBuilder<u8>`.
//!
//! Only whole `&str`s and `char`s go in, so the consolidated bytes are
//! always valid UTF-8 even though a single character may straddle two
//! pieces before `build`. Lengths are in bytes.

use crate::builder::PieceBuilder;
use crate::error::BuilderError;
use core::fmt;

#[derive(Debug, Default)]
pub struct StringBuilder {
    inner: PieceBuilder<u8>,
}

impl StringBuilder {
    /// `hint` (bytes) is clamped to `MAX_INITIAL_SIZE`.
    pub fn new(hint: usize) -> Self {
        Self {
            inner: PieceBuilder::new(hint),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.inner.is_built()
    }

    pub fn append(&mut self, s: &str) -> Result<(), BuilderError> {
        self.inner.append(s.as_bytes())
    }

    pub fn append_char(&mut self, c: char) -> Result<(), BuilderError> {
        if c.is_ascii() {
            self.inner.append_char(c as u8)
        } else {
            self.inner.append(c.encode_utf8(&mut [0; 4]).as_bytes())
        }
    }

    /// `append(&s[start..end])` by byte offsets; both ends must fall on
    /// char boundaries.
    pub fn append_slice(&mut self, s: &str, start: usize, end: usize) -> Result<(), BuilderError> {
        let part = s.get(start..end).ok_or(BuilderError::SliceOutOfBounds {
            start,
            end,
            len: s.len(),
        })?;
        self.append(part)
    }

    pub fn append_multiple_char(&mut self, c: char, count: usize) -> Result<(), BuilderError> {
        if c.is_ascii() {
            return self.inner.append_multiple_char(c as u8, count);
        }
        let mut buf = [0; 4];
        self.inner
            .append_repeated(c.encode_utf8(&mut buf).as_bytes(), count)
    }

    /// Append an owned string; long ones are adopted without copying.
    pub fn append_string(&mut self, s: String) -> Result<(), BuilderError> {
        self.inner.append_vec(s.into_bytes())
    }

    /// The consolidated text. Idempotent.
    pub fn build(&mut self) -> &str {
        let bytes = self.inner.build();
        // SAFETY: every append takes a whole `&str`, `String` or `char`, so
        // the joined bytes are a concatenation of valid UTF-8 sequences.
        unsafe { core::str::from_utf8_unchecked(bytes) }
    }

    pub fn into_string(self) -> String {
        let bytes = self.inner.into_vec();
        // SAFETY: as in `build`.
        unsafe { String::from_utf8_unchecked(bytes) }
    }
}

impl fmt::Write for StringBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s).map_err(|_| fmt::Error)
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.append_char(c).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    /// Invariant: a multi-byte char split across a grow boundary is
    /// reassembled intact.
    #[test]
    fn char_straddling_pieces() {
        let mut b = StringBuilder::new(2);
        b.append("a").unwrap();
        b.append_char('€').unwrap(); // 3 bytes, 1 fits
        b.append("b").unwrap();
        assert_eq!(b.len(), 5);
        assert_eq!(b.build(), "a€b");
    }

    #[test]
    fn slice_must_hit_char_boundaries() {
        let mut b = StringBuilder::new(8);
        assert_eq!(
            b.append_slice("h€llo", 1, 2),
            Err(BuilderError::SliceOutOfBounds {
                start: 1,
                end: 2,
                len: 7
            })
        );
        b.append_slice("h€llo", 1, 4).unwrap();
        assert_eq!(b.build(), "€");
    }

    /// Invariant: repeating a multi-byte char grows at most once, even
    /// when the first copy straddles the buffer boundary.
    #[test]
    fn non_ascii_repeat() {
        let mut b = StringBuilder::new(0);
        b.append_multiple_char('ß', 1000).unwrap();
        assert_eq!(b.inner.piece_count(), 0);
        assert_eq!(b.len(), 2000);

        let mut b = StringBuilder::new(1);
        b.append_multiple_char('ß', 1000).unwrap();
        assert_eq!(b.inner.piece_count(), 1);
        assert_eq!(b.len(), 2000);
        let s = b.into_string();
        assert_eq!(s.chars().count(), 1000);
        assert!(s.chars().all(|c| c == 'ß'));
    }

    #[test]
    fn formats_through_fmt_write() {
        let mut b = StringBuilder::new(4);
        write!(b, "{}-{:03}", "id", 7).unwrap();
        assert_eq!(b.build(), "id-007");
        assert!(write!(b, "more").is_err());
    }
}
