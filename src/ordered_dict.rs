//! OrderedDict: insertion-ordered open-addressing dict.
//!
//! `DictCore` is the part that never calls user code: it owns the
//! `IndexTable`, the `EntryLog`, the resize counter and the structural
//! stamp, and is driven with precomputed hashes and equality closures.
//! `OrderedDict` layers the `KeyOps` capability and the reentrancy guard
//! on top.

use crate::dict_iter::{DictCursor, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::entry_log::{Bucket, EntryLog, NIL};
use crate::error::DictError;
use crate::index_table::{IndexTable, SlotWidth, INITIAL_SIZE};
use crate::key_ops::{KeyOps, StdKeyOps};
use crate::reentrancy::DebugReentrancy;
use core::fmt;
use core::hash::Hash;
use core::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique structural stamp. Distinct dicts never share one,
/// so a cursor cannot be replayed against the wrong dict.
fn fresh_stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// Smallest power of two `>= INITIAL_SIZE` strictly above `2 * items`.
fn slots_for(items: usize) -> usize {
    let estimate = items.saturating_mul(2);
    let mut n = INITIAL_SIZE;
    while n <= estimate {
        n = n
            .checked_mul(2)
            .unwrap_or_else(|| panic!("capacity overflow"));
    }
    n
}

#[derive(Clone, Debug)]
enum Index {
    Indexed(IndexTable),
    /// No table; shared lookups scan the log and the next mutation
    /// rebuilds one.
    MustReindex,
}

pub(crate) struct DictCore<K, V> {
    index: Index,
    entries: EntryLog<K, V>,
    /// Appends left before a reindex: starts at `2 * num_slots` and loses 3
    /// per appended record, which keeps a third of the slots free.
    resize_counter: isize,
    stamp: u64,
}

impl<K, V> DictCore<K, V> {
    fn with_capacity(n: usize) -> Self {
        let num_slots = slots_for(n);
        Self {
            index: Index::Indexed(IndexTable::with_slots(num_slots)),
            entries: EntryLog::with_capacity(n),
            resize_counter: (num_slots * 2) as isize,
            stamp: fresh_stamp(),
        }
    }

    #[inline]
    pub(crate) fn entries(&self) -> &EntryLog<K, V> {
        &self.entries
    }

    #[inline]
    pub(crate) fn stamp(&self) -> u64 {
        self.stamp
    }

    /// `None` while the index is dropped.
    pub(crate) fn index_table(&self) -> Option<&IndexTable> {
        match &self.index {
            Index::Indexed(t) => Some(t),
            Index::MustReindex => None,
        }
    }

    fn slot_width(&self) -> Option<SlotWidth> {
        self.index_table().map(IndexTable::width)
    }

    /// Offset of the live entry with this hash for which `eq` holds.
    fn find<F>(&self, hash: u64, mut eq: F) -> Option<usize>
    where
        F: FnMut(&K) -> bool,
    {
        match &self.index {
            Index::Indexed(table) => table
                .find(hash, |offset| match self.entries.bucket(offset) {
                    Some(b) => b.hash == hash && eq(&b.key),
                    None => false,
                })
                .map(|(_, offset)| offset),
            Index::MustReindex => self
                .entries
                .live_buckets()
                .find(|(_, b)| b.hash == hash && eq(&b.key))
                .map(|(offset, _)| offset),
        }
    }

    /// Make room for one append and point a slot at the offset it will
    /// land on.
    fn reserve(&mut self, hash: u64) {
        if self.resize_counter <= 3 || matches!(self.index, Index::MustReindex) {
            self.reindex(1, false);
        }
        let offset = self.entries.ever_used();
        if let Index::Indexed(table) = &mut self.index {
            let slot = table.find_insert_slot(hash);
            table.set_valid(slot, offset);
        }
        self.resize_counter -= 3;
    }

    /// Append a new entry; the caller has checked the key is absent.
    fn push(&mut self, hash: u64, key: K, value: V) -> &mut V {
        self.reserve(hash);
        &mut self.entries.push(Bucket { hash, key, value }).value
    }

    /// Value at `found`, or `value` appended under `key` if `found` is
    /// `None`.
    fn get_or_push(&mut self, found: Option<usize>, hash: u64, key: K, value: V) -> &mut V {
        let offset = match found.filter(|&o| self.entries.bucket(o).is_some()) {
            Some(offset) => offset,
            None => {
                self.reserve(hash);
                NIL
            }
        };
        &mut self
            .entries
            .get_or_push(offset, || Bucket { hash, key, value })
            .value
    }

    fn replace_value(&mut self, offset: usize, value: V) -> Option<V> {
        self.entries
            .bucket_mut(offset)
            .map(|b| core::mem::replace(&mut b.value, value))
    }

    /// Tombstone the slot and empty the record at `offset`.
    fn remove_at(&mut self, offset: usize) -> Option<Bucket<K, V>> {
        let hash = self.entries.bucket(offset)?.hash;
        if let Index::Indexed(table) = &mut self.index {
            let slot = table.find_slot_of(hash, offset);
            debug_assert!(slot.is_some(), "live entry {offset} missing from index");
            if let Some(slot) = slot {
                table.set_deleted(slot);
            }
        }
        self.entries.invalidate(offset)
    }

    fn move_to_end(&mut self, offset: usize, last: bool) {
        let moved = if last {
            self.entries.move_to_back(offset)
        } else {
            self.entries.move_to_front(offset)
        };
        if moved {
            self.stamp = fresh_stamp();
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index = Index::Indexed(IndexTable::with_slots(INITIAL_SIZE));
        self.resize_counter = (INITIAL_SIZE * 2) as isize;
        self.stamp = fresh_stamp();
    }

    fn drop_index(&mut self) {
        if let Index::Indexed(table) = &self.index {
            debug!(
                num_slots = table.num_slots(),
                live = self.entries.len(),
                "dropping dict index"
            );
        }
        self.index = Index::MustReindex;
    }

    /// Rebuild the index with room for `extra` more appends.
    ///
    /// The log is compacted when `force_compact` is set or when removed
    /// records outnumber live ones; otherwise the table is rebuilt over
    /// the same offsets, so outstanding cursors stay valid.
    ///
    /// The index is detached for the duration, so a panic part-way leaves
    /// the dict in the linear-scan state rather than with stale offsets.
    fn reindex(&mut self, extra: usize, force_compact: bool) {
        let old = core::mem::replace(&mut self.index, Index::MustReindex);
        let old_slots = match &old {
            Index::Indexed(t) => t.num_slots(),
            Index::MustReindex => 0,
        };
        drop(old);

        let dead = self.entries.dead();
        let compacted = (force_compact || dead > self.entries.len()) && self.entries.compact();
        if compacted {
            self.stamp = fresh_stamp();
        }

        // Offsets run up to `ever_used`, which equals the live count only
        // after a compaction.
        let num_slots = slots_for(self.entries.ever_used() + extra);
        let mut table = IndexTable::with_slots(num_slots);
        for (offset, bucket) in self.entries.live_buckets() {
            let slot = table.find_insert_slot(bucket.hash);
            table.set_valid(slot, offset);
        }
        debug!(
            old_slots,
            new_slots = num_slots,
            width = ?table.width(),
            live = self.entries.len(),
            dead,
            compacted,
            "reindexed dict"
        );
        self.resize_counter = (num_slots * 2) as isize - (self.entries.ever_used() * 3) as isize;
        self.index = Index::Indexed(table);
    }
}

impl<K: Clone, V: Clone> Clone for DictCore<K, V> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            entries: self.entries.clone(),
            resize_counter: self.resize_counter,
            stamp: fresh_stamp(),
        }
    }
}

/// An insertion-ordered mapping backed by an open-addressing index over an
/// ordered entry log.
///
/// Assigning to an existing key keeps its position; deleting and
/// re-inserting a key moves it to the end. `move_to_end` relocates a key
/// to either end in O(1).
pub struct OrderedDict<K, V, O = StdKeyOps> {
    core: DictCore<K, V>,
    ops: O,
    reentrancy: DebugReentrancy,
}

impl<K, V> OrderedDict<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_key_ops(StdKeyOps::default())
    }

    /// Room for `n` insertions before the first reindex.
    pub fn with_capacity(n: usize) -> Self {
        Self::with_capacity_and_key_ops(n, StdKeyOps::default())
    }
}

// Operations that never hash or compare keys.
impl<K, V, O> OrderedDict<K, V, O> {
    pub fn with_key_ops(ops: O) -> Self {
        Self::with_capacity_and_key_ops(0, ops)
    }

    pub fn with_capacity_and_key_ops(n: usize, ops: O) -> Self {
        Self {
            core: DictCore::with_capacity(n),
            ops,
            reentrancy: DebugReentrancy::new(),
        }
    }

    #[inline]
    pub(crate) fn core(&self) -> &DictCore<K, V> {
        &self.core
    }

    pub fn key_ops(&self) -> &O {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.core.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active lookup variant; `None` while the index is dropped.
    pub fn slot_width(&self) -> Option<SlotWidth> {
        self.core.slot_width()
    }

    /// Remove every entry and reset the order. Outstanding cursors report
    /// `IteratorInvalidated` afterwards.
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Remove and return the most recently inserted live pair.
    pub fn popitem(&mut self) -> Result<(K, V), DictError> {
        self.pop_at(self.core.entries.tail())
    }

    /// Remove and return the oldest live pair.
    pub fn popitem_first(&mut self) -> Result<(K, V), DictError> {
        self.pop_at(self.core.entries.head())
    }

    fn pop_at(&mut self, offset: usize) -> Result<(K, V), DictError> {
        if offset == NIL {
            return Err(DictError::Empty);
        }
        self.core
            .remove_at(offset)
            .map(|b| (b.key, b.value))
            .ok_or(DictError::Empty)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.core
            .entries
            .bucket(self.core.entries.head())
            .map(|b| (&b.key, &b.value))
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        self.core
            .entries
            .bucket(self.core.entries.tail())
            .map(|b| (&b.key, &b.value))
    }

    /// Discard the index. Lookups, removals and moves fall back to a
    /// linear scan of the log until the next insertion rebuilds it.
    pub fn drop_index(&mut self) {
        self.core.drop_index();
    }

    /// Reindex now, physically dropping every removed entry.
    pub fn compact(&mut self) {
        self.core.reindex(0, true);
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.core.entries)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.core.entries)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// A resumable cursor that tolerates mutation of this dict between
    /// steps. See `DictCursor`.
    pub fn cursor(&self) -> DictCursor {
        DictCursor::new(self.core.stamp())
    }
}

impl<K, V, O> OrderedDict<K, V, O>
where
    O: KeyOps<K>,
{
    fn find_offset(&self, key: &K) -> Option<usize> {
        let _g = self.reentrancy.enter();
        let hash = self.ops.hash(key);
        self.core.find(hash, |k| self.ops.eq(k, key))
    }

    /// Value for `key`, or `None`.
    pub fn get(&self, key: &K) -> Option<&V> {
        let offset = self.find_offset(key)?;
        self.core.entries.bucket(offset).map(|b| &b.value)
    }

    /// Value for `key`, or `KeyNotFound`.
    pub fn get_item(&self, key: &K) -> Result<&V, DictError> {
        self.get(key).ok_or(DictError::KeyNotFound)
    }

    pub fn get_or_default<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let offset = self.find_offset(key)?;
        self.core.entries.bucket_mut(offset).map(|b| &mut b.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find_offset(key).is_some()
    }

    /// Insert or overwrite. Overwriting keeps the key's position and
    /// returns the old value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter();
        let hash = self.ops.hash(&key);
        match self.core.find(hash, |k| self.ops.eq(k, &key)) {
            Some(offset) => self.core.replace_value(offset, value),
            None => {
                self.core.push(hash, key, value);
                None
            }
        }
    }

    /// Value for `key`, inserting `default` at the end first if absent.
    pub fn setdefault(&mut self, key: K, default: V) -> &mut V {
        let _g = self.reentrancy.enter();
        let hash = self.ops.hash(&key);
        let found = self.core.find(hash, |k| self.ops.eq(k, &key));
        self.core.get_or_push(found, hash, key, default)
    }

    pub fn delete(&mut self, key: &K) -> Result<(), DictError> {
        self.pop(key).map(drop)
    }

    pub fn pop(&mut self, key: &K) -> Result<V, DictError> {
        let offset = self.find_offset(key).ok_or(DictError::KeyNotFound)?;
        self.core
            .remove_at(offset)
            .map(|b| b.value)
            .ok_or(DictError::KeyNotFound)
    }

    pub fn pop_default(&mut self, key: &K, default: V) -> V {
        self.pop(key).unwrap_or(default)
    }

    /// Relocate `key` to the end (`last`) or the start of the order.
    pub fn move_to_end(&mut self, key: &K, last: bool) -> Result<(), DictError> {
        let offset = self.find_offset(key).ok_or(DictError::KeyNotFound)?;
        self.core.move_to_end(offset, last);
        Ok(())
    }

    /// Overwrite/extend from `other`: existing keys keep their position,
    /// new keys are appended in `other`'s order.
    pub fn update<O2>(&mut self, other: &OrderedDict<K, V, O2>)
    where
        K: Clone,
        V: Clone,
    {
        for (k, v) in other.iter() {
            self.set(k.clone(), v.clone());
        }
    }

    /// A new dict with the same entries in the same order.
    pub fn copy(&self) -> Self
    where
        K: Clone,
        V: Clone,
        O: Clone,
    {
        self.clone()
    }
}

impl<K, V, O> Clone for OrderedDict<K, V, O>
where
    K: Clone,
    V: Clone,
    O: Clone,
{
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            ops: self.ops.clone(),
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<K, V, O: Default> Default for OrderedDict<K, V, O> {
    fn default() -> Self {
        Self::with_key_ops(O::default())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O> fmt::Debug for OrderedDict<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// Order-sensitive, as between two ordered dicts.
impl<K, V, O, O2> PartialEq<OrderedDict<K, V, O2>> for OrderedDict<K, V, O>
where
    K: PartialEq,
    V: PartialEq,
{
    fn eq(&self, other: &OrderedDict<K, V, O2>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, O> Eq for OrderedDict<K, V, O> {}

impl<K, V, O> Extend<(K, V)> for OrderedDict<K, V, O>
where
    O: KeyOps<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V, O> FromIterator<(K, V)> for OrderedDict<K, V, O>
where
    O: KeyOps<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut dict = Self::with_capacity_and_key_ops(iter.size_hint().0, O::default());
        dict.extend(iter);
        dict
    }
}

impl<K, V, O> IntoIterator for OrderedDict<K, V, O> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter::new(self.core.entries.into_ordered())
    }
}

impl<'a, K, V, O> IntoIterator for &'a OrderedDict<K, V, O> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, O> IntoIterator for &'a mut OrderedDict<K, V, O> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
