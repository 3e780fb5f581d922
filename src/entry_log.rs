//! EntryLog: append-oriented record storage with a doubly linked order.
//!
//! Records are only ever appended. Removing an entry empties its record in
//! place and unlinks it from the order, but leaves the record's own links
//! untouched so a cursor parked on it can still step forward. Offsets stay
//! stable until `compact`, which is the only operation that moves records.

/// Link sentinel: no record.
pub(crate) const NIL: usize = usize::MAX;

#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

#[derive(Clone, Debug)]
pub(crate) struct Record<K, V> {
    /// `None` once the entry has been removed.
    pub(crate) bucket: Option<Bucket<K, V>>,
    pub(crate) prev: usize,
    pub(crate) next: usize,
}

#[derive(Clone, Debug)]
pub(crate) struct EntryLog<K, V> {
    records: Vec<Record<K, V>>,
    head: usize,
    tail: usize,
    live: usize,
}

impl<K, V> EntryLog<K, V> {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            records: Vec::with_capacity(n),
            head: NIL,
            tail: NIL,
            live: 0,
        }
    }

    /// `num_live_items`.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// `num_ever_used_items`: records appended since the last compaction.
    #[inline]
    pub(crate) fn ever_used(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub(crate) fn dead(&self) -> usize {
        self.records.len() - self.live
    }

    #[inline]
    pub(crate) fn head(&self) -> usize {
        self.head
    }

    #[inline]
    pub(crate) fn tail(&self) -> usize {
        self.tail
    }

    #[inline]
    pub(crate) fn record(&self, offset: usize) -> &Record<K, V> {
        &self.records[offset]
    }

    #[inline]
    pub(crate) fn bucket(&self, offset: usize) -> Option<&Bucket<K, V>> {
        self.records.get(offset).and_then(|r| r.bucket.as_ref())
    }

    #[inline]
    pub(crate) fn bucket_mut(&mut self, offset: usize) -> Option<&mut Bucket<K, V>> {
        self.records.get_mut(offset).and_then(|r| r.bucket.as_mut())
    }

    /// Live buckets in offset (not iteration) order.
    pub(crate) fn live_buckets(&self) -> impl Iterator<Item = (usize, &Bucket<K, V>)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.bucket.as_ref().map(|b| (i, b)))
    }

    /// Per-offset `(prev, next, bucket)` with the bucket mutably borrowed,
    /// for walking the order while handing out `&mut` values.
    pub(crate) fn links_mut(
        &mut self,
    ) -> impl Iterator<Item = (usize, usize, Option<&mut Bucket<K, V>>)> + '_ {
        self.records
            .iter_mut()
            .map(|r| (r.prev, r.next, r.bucket.as_mut()))
    }

    /// Append a live record at the tail of the order.
    pub(crate) fn push(&mut self, bucket: Bucket<K, V>) -> &mut Bucket<K, V> {
        self.get_or_push(NIL, || bucket)
    }

    /// The live bucket at `offset`, or `make`'s bucket appended as a new
    /// record at the tail when `offset` holds none. `make` runs only in
    /// the second case.
    pub(crate) fn get_or_push<F>(&mut self, offset: usize, make: F) -> &mut Bucket<K, V>
    where
        F: FnOnce() -> Bucket<K, V>,
    {
        let target = if self.bucket(offset).is_some() {
            offset
        } else {
            let fresh = self.records.len();
            self.records.push(Record {
                bucket: None,
                prev: self.tail,
                next: NIL,
            });
            self.link_after_tail(fresh);
            self.live += 1;
            fresh
        };
        self.records[target].bucket.get_or_insert_with(make)
    }

    /// Remove the entry at `offset`, leaving an empty record behind.
    pub(crate) fn invalidate(&mut self, offset: usize) -> Option<Bucket<K, V>> {
        let bucket = self.records.get_mut(offset)?.bucket.take()?;
        self.unlink(offset);
        self.live -= 1;
        Some(bucket)
    }

    /// Relink a live record as the last in order. Returns false if it
    /// already was.
    pub(crate) fn move_to_back(&mut self, offset: usize) -> bool {
        if self.tail == offset {
            return false;
        }
        self.unlink(offset);
        self.records[offset].prev = self.tail;
        self.records[offset].next = NIL;
        self.link_after_tail(offset);
        true
    }

    /// Relink a live record as the first in order. Returns false if it
    /// already was.
    pub(crate) fn move_to_front(&mut self, offset: usize) -> bool {
        if self.head == offset {
            return false;
        }
        self.unlink(offset);
        self.records[offset].prev = NIL;
        self.records[offset].next = self.head;
        match self.head {
            NIL => self.tail = offset,
            h => self.records[h].prev = offset,
        }
        self.head = offset;
        true
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.head = NIL;
        self.tail = NIL;
        self.live = 0;
    }

    /// Drop every empty record and lay the survivors out in iteration
    /// order. Returns true if any offset changed.
    pub(crate) fn compact(&mut self) -> bool {
        if self.is_sequential() {
            return false;
        }

        let mut records = Vec::with_capacity(self.live);
        let mut old = core::mem::take(&mut self.records);
        let mut cur = self.head;
        while cur != NIL {
            let rec = &mut old[cur];
            let next = rec.next;
            let new_offset = records.len();
            records.push(Record {
                bucket: rec.bucket.take(),
                prev: if new_offset == 0 { NIL } else { new_offset - 1 },
                next: new_offset + 1,
            });
            cur = next;
        }
        if let Some(last) = records.last_mut() {
            last.next = NIL;
        }
        self.head = if records.is_empty() { NIL } else { 0 };
        self.tail = records.len().checked_sub(1).unwrap_or(NIL);
        self.records = records;
        true
    }

    /// Consume the log, yielding live pairs in iteration order.
    pub(crate) fn into_ordered(mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.live);
        let mut cur = self.head;
        while cur != NIL {
            let rec = &mut self.records[cur];
            if let Some(b) = rec.bucket.take() {
                out.push((b.key, b.value));
            }
            cur = rec.next;
        }
        out
    }

    fn is_sequential(&self) -> bool {
        if self.dead() != 0 {
            return false;
        }
        let mut expected = 0;
        let mut cur = self.head;
        while cur != NIL {
            if cur != expected {
                return false;
            }
            expected += 1;
            cur = self.records[cur].next;
        }
        true
    }

    fn link_after_tail(&mut self, offset: usize) {
        match self.tail {
            NIL => self.head = offset,
            t => self.records[t].next = offset,
        }
        self.tail = offset;
    }

    // The unlinked record keeps its own prev/next.
    fn unlink(&mut self, offset: usize) {
        let (prev, next) = (self.records[offset].prev, self.records[offset].next);
        match prev {
            NIL => self.head = next,
            p => self.records[p].next = next,
        }
        match next {
            NIL => self.tail = prev,
            n => self.records[n].prev = prev,
        }
    }
}
