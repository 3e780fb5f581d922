//! IndexTable: open-addressing slot array mapping hashes to entry-log offsets.
//!
//! Each slot is one of three states, packed into an unsigned integer:
//! `0` is free, `1` is a tombstone, and `n >= 2` is a live reference to
//! entry-log offset `n - 2`. The physical width of a slot is chosen from
//! the table size so small dicts spend one byte per slot.
//!
//! The owner keeps at least a third of the slots free (see
//! `DictCore::resize_counter`), so every probe sequence terminates.

/// Number of slots in a freshly created table.
pub const INITIAL_SIZE: usize = 8;

/// Bits of hash folded into the probe position per step.
pub const PERTURB_SHIFT: u32 = 5;

const FREE: u64 = 0;
const DELETED: u64 = 1;
const VALID_OFFSET: u64 = 2;

/// Decoded state of one slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotState {
    Free,
    Deleted,
    Valid(usize),
}

/// Physical slot width, i.e. which lookup variant is active.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum SlotWidth {
    Byte,
    Short,
    Int,
    Long,
}

impl SlotWidth {
    /// Narrowest width able to address every offset a table of
    /// `num_slots` can hold (offsets stay below `num_slots * 2 / 3`).
    pub fn for_slots(num_slots: usize) -> Self {
        let n = num_slots as u64;
        if n <= 1 << 8 {
            SlotWidth::Byte
        } else if n <= 1 << 16 {
            SlotWidth::Short
        } else if n <= 1 << 32 {
            SlotWidth::Int
        } else {
            SlotWidth::Long
        }
    }
}

#[derive(Clone, Debug)]
enum Slots {
    Byte(Box<[u8]>),
    Short(Box<[u16]>),
    Int(Box<[u32]>),
    Long(Box<[u64]>),
}

impl Slots {
    fn zeroed(width: SlotWidth, n: usize) -> Self {
        match width {
            SlotWidth::Byte => Slots::Byte(vec![0; n].into_boxed_slice()),
            SlotWidth::Short => Slots::Short(vec![0; n].into_boxed_slice()),
            SlotWidth::Int => Slots::Int(vec![0; n].into_boxed_slice()),
            SlotWidth::Long => Slots::Long(vec![0; n].into_boxed_slice()),
        }
    }

    #[inline]
    fn get(&self, i: usize) -> u64 {
        match self {
            Slots::Byte(s) => s[i] as u64,
            Slots::Short(s) => s[i] as u64,
            Slots::Int(s) => s[i] as u64,
            Slots::Long(s) => s[i],
        }
    }

    // Callers only store values that fit the width picked by `for_slots`.
    #[inline]
    fn set(&mut self, i: usize, raw: u64) {
        match self {
            Slots::Byte(s) => s[i] = raw as u8,
            Slots::Short(s) => s[i] = raw as u16,
            Slots::Int(s) => s[i] = raw as u32,
            Slots::Long(s) => s[i] = raw,
        }
    }

    fn len(&self) -> usize {
        match self {
            Slots::Byte(s) => s.len(),
            Slots::Short(s) => s.len(),
            Slots::Int(s) => s.len(),
            Slots::Long(s) => s.len(),
        }
    }
}

/// Perturbation probe sequence over a power-of-two table.
///
/// Visits `hash & mask` first, then `(i * 5 + perturb + 1) & mask` with
/// `perturb` shifted right by `PERTURB_SHIFT` after every step. Once
/// `perturb` reaches zero the recurrence cycles through every slot.
pub(crate) struct Probe {
    i: usize,
    perturb: u64,
    mask: usize,
    started: bool,
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.started {
            self.i = (self.i.wrapping_mul(5))
                .wrapping_add(self.perturb as usize)
                .wrapping_add(1)
                & self.mask;
            self.perturb >>= PERTURB_SHIFT;
        } else {
            self.started = true;
        }
        Some(self.i)
    }
}

#[derive(Clone, Debug)]
pub struct IndexTable {
    slots: Slots,
    mask: usize,
}

impl IndexTable {
    /// Allocate an all-free table. `num_slots` must be a power of two.
    pub fn with_slots(num_slots: usize) -> Self {
        debug_assert!(num_slots.is_power_of_two());
        Self {
            slots: Slots::zeroed(SlotWidth::for_slots(num_slots), num_slots),
            mask: num_slots - 1,
        }
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn width(&self) -> SlotWidth {
        match self.slots {
            Slots::Byte(_) => SlotWidth::Byte,
            Slots::Short(_) => SlotWidth::Short,
            Slots::Int(_) => SlotWidth::Int,
            Slots::Long(_) => SlotWidth::Long,
        }
    }

    #[inline]
    pub fn state(&self, slot: usize) -> SlotState {
        match self.slots.get(slot) {
            FREE => SlotState::Free,
            DELETED => SlotState::Deleted,
            raw => SlotState::Valid((raw - VALID_OFFSET) as usize),
        }
    }

    #[inline]
    pub fn set_valid(&mut self, slot: usize, offset: usize) {
        self.slots.set(slot, offset as u64 + VALID_OFFSET);
    }

    #[inline]
    pub fn set_deleted(&mut self, slot: usize) {
        self.slots.set(slot, DELETED);
    }

    #[inline]
    pub(crate) fn probe(&self, hash: u64) -> Probe {
        Probe {
            i: (hash as usize) & self.mask,
            perturb: hash,
            mask: self.mask,
            started: false,
        }
    }

    /// Probe for a live slot whose offset satisfies `is_match`.
    ///
    /// Tombstones are stepped over; the first free slot ends the search.
    /// Returns `(slot, offset)`.
    pub fn find<F>(&self, hash: u64, mut is_match: F) -> Option<(usize, usize)>
    where
        F: FnMut(usize) -> bool,
    {
        for slot in self.probe(hash) {
            match self.state(slot) {
                SlotState::Free => return None,
                SlotState::Deleted => {}
                SlotState::Valid(offset) => {
                    if is_match(offset) {
                        return Some((slot, offset));
                    }
                }
            }
        }
        None
    }

    /// First free or tombstoned slot on `hash`'s probe sequence.
    pub fn find_insert_slot(&self, hash: u64) -> usize {
        for slot in self.probe(hash) {
            match self.state(slot) {
                SlotState::Free | SlotState::Deleted => return slot,
                SlotState::Valid(_) => {}
            }
        }
        unreachable!("probe sequence is infinite")
    }

    /// Slot currently referencing `offset`, found without calling user code.
    pub fn find_slot_of(&self, hash: u64, offset: usize) -> Option<usize> {
        self.find(hash, |o| o == offset).map(|(slot, _)| slot)
    }

    /// Count of slots in each state: `(free, deleted, valid)`.
    #[cfg_attr(not(any(test, feature = "bench_internal")), allow(dead_code))]
    pub fn census(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for slot in 0..self.num_slots() {
            match self.state(slot) {
                SlotState::Free => counts.0 += 1,
                SlotState::Deleted => counts.1 += 1,
                SlotState::Valid(_) => counts.2 += 1,
            }
        }
        counts
    }
}
