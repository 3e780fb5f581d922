//! Iteration over an `OrderedDict` in its linked order.
//!
//! Borrowing iterators (`Iter`, `Keys`, `Values`, `IterMut`, `ValuesMut`)
//! hold the dict for their whole life. `DictCursor` holds nothing: it is a
//! position that is handed the dict on every step, so the dict may be
//! mutated between steps.

use crate::entry_log::{EntryLog, NIL};
use crate::error::DictError;
use crate::ordered_dict::OrderedDict;
use core::iter::FusedIterator;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum CursorPos {
    Start,
    /// Last visited offset. Its record may since have been removed; its
    /// forward link is still valid until the stamp changes.
    After(usize),
    Done,
}

/// A resumable cursor over an `OrderedDict`.
///
/// Each `next` walks forward along the linked order from the last visited
/// entry, skipping removed records:
/// - removing the entry just visited, or any other entry, is allowed;
///   removed entries are never yielded;
/// - entries appended while the cursor is still short of the tail are
///   visited; entries appended after that are not (unspecified but safe);
/// - growth keeps the cursor valid: the index is rebuilt over the same
///   records unless removed records outnumber live ones;
/// - `clear`, `compact`, a growth that does compact (more removed than
///   live records), or a `move_to_end` that relocates an entry changes
///   the dict's stamp, and the next step reports `IteratorInvalidated`,
///   as does using the cursor on another dict.
///
/// Once `next` returns `Ok(None)` the cursor stays exhausted.
#[derive(Clone, Debug)]
pub struct DictCursor {
    pos: CursorPos,
    stamp: u64,
}

impl DictCursor {
    pub(crate) fn new(stamp: u64) -> Self {
        Self {
            pos: CursorPos::Start,
            stamp,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == CursorPos::Done
    }

    /// Advance and return the next live pair, `Ok(None)` at the end.
    #[allow(clippy::should_implement_trait)]
    pub fn next<'a, K, V, O>(
        &mut self,
        dict: &'a OrderedDict<K, V, O>,
    ) -> Result<Option<(&'a K, &'a V)>, DictError> {
        let core = dict.core();
        let entries = core.entries();
        let mut cur = match self.pos {
            CursorPos::Done => return Ok(None),
            _ if self.stamp != core.stamp() => return Err(DictError::IteratorInvalidated),
            CursorPos::Start => entries.head(),
            CursorPos::After(offset) => entries.record(offset).next,
        };
        while cur != NIL {
            let record = entries.record(cur);
            if let Some(b) = record.bucket.as_ref() {
                self.pos = CursorPos::After(cur);
                return Ok(Some((&b.key, &b.value)));
            }
            cur = record.next;
        }
        self.pos = CursorPos::Done;
        Ok(None)
    }
}

/// Iterator over `(&K, &V)` in order.
pub struct Iter<'a, K, V> {
    entries: &'a EntryLog<K, V>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(entries: &'a EntryLog<K, V>) -> Self {
        Self {
            entries,
            front: entries.head(),
            back: entries.tail(),
            remaining: entries.len(),
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Under a shared borrow every linked record is live.
        let record = self.entries.record(self.front);
        let b = record.bucket.as_ref()?;
        self.front = record.next;
        self.remaining -= 1;
        Some((&b.key, &b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let record = self.entries.record(self.back);
        let b = record.bucket.as_ref()?;
        self.back = record.prev;
        self.remaining -= 1;
        Some((&b.key, &b.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` in order.
///
/// The log is split into per-record borrows up front (one scratch vector
/// the length of the log), then walked along the copied links.
pub struct IterMut<'a, K, V> {
    links: Vec<MutLink<'a, K, V>>,
    front: usize,
    back: usize,
    remaining: usize,
}

struct MutLink<'a, K, V> {
    prev: usize,
    next: usize,
    item: Option<(&'a K, &'a mut V)>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(entries: &'a mut EntryLog<K, V>) -> Self {
        let (front, back, remaining) = (entries.head(), entries.tail(), entries.len());
        let links = entries
            .links_mut()
            .map(|(prev, next, b)| MutLink {
                prev,
                next,
                item: b.map(|b| (&b.key, &mut b.value)),
            })
            .collect();
        Self {
            links,
            front,
            back,
            remaining,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        // Under an exclusive borrow every linked record is live.
        let link = &mut self.links[self.front];
        let item = link.item.take()?;
        self.front = link.next;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let link = &mut self.links[self.back];
        let item = link.item.take()?;
        self.back = link.prev;
        self.remaining -= 1;
        Some(item)
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Owning iterator over `(K, V)` in order.
pub struct IntoIter<K, V> {
    inner: std::vec::IntoIter<(K, V)>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(pairs: Vec<(K, V)>) -> Self {
        Self {
            inner: pairs.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use crate::{DictError, OrderedDict};

    fn dict(pairs: &[(&'static str, i32)]) -> OrderedDict<&'static str, i32> {
        pairs.iter().copied().collect()
    }

    /// Invariant: forward and reverse iteration agree and meet in the middle.
    #[test]
    fn double_ended_meets_in_middle() {
        let d = dict(&[("a", 1), ("b", 2), ("c", 3)]);
        let mut it = d.iter();
        assert_eq!(it.len(), 3);
        assert_eq!(it.next(), Some((&"a", &1)));
        assert_eq!(it.next_back(), Some((&"c", &3)));
        assert_eq!(it.next(), Some((&"b", &2)));
        assert_eq!(it.next_back(), None);
        assert_eq!(it.next(), None);
    }

    /// Invariant: iter_mut follows the linked order, not the offset order.
    #[test]
    fn iter_mut_follows_moves() {
        let mut d = dict(&[("a", 1), ("b", 2), ("c", 3)]);
        d.move_to_end(&"a", true).unwrap();
        for (k, v) in d.iter_mut() {
            *v = match *k {
                "b" => 10,
                "c" => 20,
                _ => 30,
            };
        }
        let got: Vec<_> = d.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, [("b", 10), ("c", 20), ("a", 30)]);
        let vals: Vec<i32> = d.values_mut().map(|v| *v).collect();
        assert_eq!(vals, [10, 20, 30]);
    }

    /// Invariant: iter_mut walks both ends past removed records and meets
    /// in the middle without yielding a value twice.
    #[test]
    fn iter_mut_double_ended_over_tombstones() {
        let mut d = dict(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]);
        d.delete(&"b").unwrap();
        d.move_to_end(&"a", true).unwrap();
        let mut it = d.iter_mut();
        assert_eq!(it.len(), 4);
        let (k, v) = it.next_back().unwrap();
        assert_eq!(*k, "a");
        *v += 100;
        assert_eq!(it.next().map(|(k, _)| *k), Some("c"));
        assert_eq!(it.next_back().map(|(k, _)| *k), Some("e"));
        assert_eq!(it.next().map(|(k, _)| *k), Some("d"));
        assert!(it.next().is_none());
        assert!(it.next_back().is_none());
        assert_eq!(d.get(&"a"), Some(&101));
    }

    /// Invariant: a cursor on an empty dict picks up entries that arrive
    /// before it first steps.
    #[test]
    fn cursor_created_empty_sees_later_inserts() {
        let mut d: OrderedDict<&'static str, i32> = OrderedDict::new();
        let mut cur = d.cursor();
        d.set("a", 1);
        assert_eq!(cur.next(&d), Ok(Some((&"a", &1))));
        assert_eq!(cur.next(&d), Ok(None));
        assert!(cur.is_exhausted());
        d.set("b", 2);
        assert_eq!(cur.next(&d), Ok(None), "exhaustion is permanent");
    }

    /// Invariant: a cursor never crosses to a different dict.
    #[test]
    fn cursor_rejects_foreign_dict() {
        let d = dict(&[("a", 1)]);
        let other = d.clone();
        let mut cur = d.cursor();
        assert_eq!(cur.next(&other), Err(DictError::IteratorInvalidated));
    }
}
