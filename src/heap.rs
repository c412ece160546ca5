//! Array-backed min-heap over a fixed pool of entries.
//!
//! Every entry carries a `priority` plus an `insertion_rank` tie-break; the
//! heap orders entries lexicographically on `(priority, insertion_rank)`,
//! smallest first. Smaller priority means "more important": a typical
//! priority is the negated training loss of an example.
//!
//! The pool size is fixed once built. The only mutation is replacing the
//! priority of the entry at a known index, followed by a sift that restores
//! the invariant. Because a sift relocates entries, callers that hold on to
//! physical indices pass a [`MoveObserver`] into the mutation; the heap
//! reports every swap it performs so the caller's bookkeeping stays exact.
//! [`PositionTracker`] is the observer the sampler uses.
//!
//! ```
//! use stratum::heap::{PositionTracker, PriorityHeap};
//!
//! let mut heap = PriorityHeap::from_items((0..8).map(|i| (i, i as f64)));
//! heap.sort_in_place();
//!
//! // Track two entries while mutating them one after the other.
//! let mut tracker = PositionTracker::new([5, 6]);
//! let at = tracker.position(0);
//! heap.set_priority(at, -1.0, &mut tracker);
//! let at = tracker.position(1);
//! heap.set_priority(at, -2.0, &mut tracker);
//!
//! assert_eq!(tracker.position(1), 0);
//! assert_eq!(*heap.entries()[0].item(), 6);
//! assert!(heap.check_invariants().is_ok());
//! ```

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::error::InvariantError;

/// One heap slot: a priority, its tie-break rank, and the stored item.
#[derive(Debug, Clone)]
pub struct HeapEntry<T> {
    priority: f64,
    insertion_rank: i64,
    item: T,
}

impl<T> HeapEntry<T> {
    /// Current priority (smaller sorts first).
    #[inline]
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Negated insertion counter; later insertions have smaller ranks.
    #[inline]
    pub fn insertion_rank(&self) -> i64 {
        self.insertion_rank
    }

    /// The stored item.
    #[inline]
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Compare by `(priority, insertion_rank)`.
    #[inline]
    pub fn key_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.insertion_rank.cmp(&other.insertion_rank))
    }

    #[inline]
    fn sorts_before(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Less
    }
}

/// Receives every swap a sift performs.
///
/// Implementations translate swaps into whatever index bookkeeping the caller
/// keeps. `()` ignores them.
pub trait MoveObserver {
    /// The entries at physical indices `a` and `b` traded places.
    fn swapped(&mut self, a: usize, b: usize);
}

impl MoveObserver for () {
    #[inline]
    fn swapped(&mut self, _a: usize, _b: usize) {}
}

/// Follows a set of entries ("slots") through heap relocations.
///
/// Slot `s` starts at the `s`-th physical index handed to [`new`](Self::new)
/// and is moved whenever a sift swaps its entry elsewhere.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    positions: Vec<usize>,
    slot_at: FxHashMap<usize, usize>,
}

impl PositionTracker {
    /// Start tracking the entries at `positions`, one slot per position.
    ///
    /// # Panics
    ///
    /// Panics if the same physical index is listed twice.
    pub fn new<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        let positions: Vec<usize> = positions.into_iter().collect();
        let mut slot_at = FxHashMap::default();
        slot_at.reserve(positions.len());
        for (slot, &pos) in positions.iter().enumerate() {
            let prev = slot_at.insert(pos, slot);
            assert!(
                prev.is_none(),
                "PositionTracker: index {pos} tracked by more than one slot"
            );
        }
        Self { positions, slot_at }
    }

    /// Current physical index of `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not tracked.
    #[inline]
    pub fn position(&self, slot: usize) -> usize {
        assert!(
            slot < self.positions.len(),
            "PositionTracker: slot {slot} out of range ({} tracked)",
            self.positions.len()
        );
        self.positions[slot]
    }

    /// Current physical index of every slot, in slot order.
    #[inline]
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Consume the tracker, returning the final positions in slot order.
    pub fn into_positions(self) -> Vec<usize> {
        self.positions
    }

    /// Number of tracked slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no slot is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl MoveObserver for PositionTracker {
    fn swapped(&mut self, a: usize, b: usize) {
        let slot_a = self.slot_at.remove(&a);
        let slot_b = self.slot_at.remove(&b);
        if let Some(s) = slot_a {
            self.positions[s] = b;
            self.slot_at.insert(b, s);
        }
        if let Some(s) = slot_b {
            self.positions[s] = a;
            self.slot_at.insert(a, s);
        }
    }
}

/// Fixed-size binary min-heap with in-place priority replacement.
#[derive(Debug, Clone)]
pub struct PriorityHeap<T> {
    entries: Vec<HeapEntry<T>>,
}

impl<T> PriorityHeap<T> {
    /// Build a heap from `(item, priority)` pairs.
    ///
    /// The k-th item (1-based) gets `insertion_rank = -k`, so at equal
    /// priority later items sort ahead of earlier ones.
    pub fn from_items<I: IntoIterator<Item = (T, f64)>>(items: I) -> Self {
        let entries: Vec<HeapEntry<T>> = items
            .into_iter()
            .zip(1i64..)
            .map(|((item, priority), k)| HeapEntry {
                priority,
                insertion_rank: -k,
                item,
            })
            .collect();

        let mut heap = Self { entries };
        // Floyd's bottom-up heapify.
        for i in (0..heap.entries.len() / 2).rev() {
            heap.sift_down(i, &mut ());
        }
        heap
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at physical index `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&HeapEntry<T>> {
        self.entries.get(index)
    }

    /// All entries in physical order.
    #[inline]
    pub fn entries(&self) -> &[HeapEntry<T>] {
        &self.entries
    }

    /// Replace the priority of the entry at `index` and restore heap order.
    ///
    /// The item and insertion rank are left untouched. Every swap performed
    /// while sifting is reported to `observer`. Returns the entry's final
    /// physical index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set_priority<O: MoveObserver + ?Sized>(
        &mut self,
        index: usize,
        priority: f64,
        observer: &mut O,
    ) -> usize {
        assert!(
            index < self.entries.len(),
            "set_priority: index {index} out of range (len {})",
            self.entries.len()
        );

        self.entries[index].priority = priority;

        if index > 0 {
            let parent = (index - 1) / 2;
            if self.entries[index].sorts_before(&self.entries[parent]) {
                return self.sift_up(index, observer);
            }
        }
        self.sift_down(index, observer)
    }

    /// Sort entries by key in place.
    ///
    /// A sorted array satisfies the heap invariant, and afterwards physical
    /// index equals 0-based rank. Positions held from before the sort are
    /// meaningless afterwards.
    pub fn sort_in_place(&mut self) {
        self.entries.sort_unstable_by(|a, b| a.key_cmp(b));
    }

    /// Verify that no entry sorts before its parent.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for i in 1..self.entries.len() {
            let parent = (i - 1) / 2;
            if self.entries[i].sorts_before(&self.entries[parent]) {
                return Err(InvariantError::new(format!(
                    "heap[{i}] (priority {}, rank {}) sorts before its parent heap[{parent}] (priority {}, rank {})",
                    self.entries[i].priority,
                    self.entries[i].insertion_rank,
                    self.entries[parent].priority,
                    self.entries[parent].insertion_rank,
                )));
            }
        }
        Ok(())
    }

    fn sift_up<O: MoveObserver + ?Sized>(&mut self, mut pos: usize, observer: &mut O) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.entries[pos].sorts_before(&self.entries[parent]) {
                break;
            }
            self.swap(pos, parent, observer);
            pos = parent;
        }
        pos
    }

    fn sift_down<O: MoveObserver + ?Sized>(&mut self, mut pos: usize, observer: &mut O) -> usize {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.entries[right].sorts_before(&self.entries[left]) {
                child = right;
            }
            if !self.entries[child].sorts_before(&self.entries[pos]) {
                break;
            }
            self.swap(pos, child, observer);
            pos = child;
        }
        pos
    }

    #[inline]
    fn swap<O: MoveObserver + ?Sized>(&mut self, a: usize, b: usize, observer: &mut O) {
        self.entries.swap(a, b);
        observer.swapped(a, b);
    }
}
