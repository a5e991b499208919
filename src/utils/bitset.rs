//! Fixed-capacity bit vector used for every set-valued analysis fact.
//!
//! Data-flow domains (variables, definition sites, expressions) and dominance sets
//! are enumerated once up front, so a set over the domain becomes a dense bitmap
//! with 64 members per word. All binary operations report whether the receiver
//! changed, which is what the fixed-point loops key off.
//!
//! # Example
//!
//! ```rust
//! use goscope::utils::BitSet;
//!
//! let mut live = BitSet::new(100);
//! live.insert(3);
//! live.insert(64);
//!
//! let mut other = BitSet::new(100);
//! other.insert(7);
//! assert!(live.union_with(&other));
//! assert_eq!(live.iter().collect::<Vec<_>>(), vec![3, 7, 64]);
//! ```

use std::fmt;

const WORD_BITS: usize = 64;

/// A set of small integers in `0..capacity`, stored as a bitmap.
///
/// Two sets can only be combined when they were created with the same capacity;
/// mixing domains is a programming error and panics.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    /// Creates an empty set able to hold members `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            len: capacity,
        }
    }

    /// Creates a set containing every member of `0..capacity`.
    #[must_use]
    pub fn full(capacity: usize) -> Self {
        let mut set = Self::new(capacity);
        set.fill();
        set
    }

    /// Creates a set of the given capacity from an iterator of members.
    ///
    /// # Panics
    ///
    /// Panics if any member is not below `capacity`.
    #[must_use]
    pub fn from_indices(capacity: usize, members: impl IntoIterator<Item = usize>) -> Self {
        let mut set = Self::new(capacity);
        for member in members {
            set.insert(member);
        }
        set
    }

    /// Returns the capacity (the size of the domain), not the number of members.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no member is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index` to the set. Returns `true` if it was not present before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "bit {index} outside of domain {}", self.len);
        let (word, mask) = Self::locate(index);
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Removes `index` from the set. Returns `true` if it was present.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "bit {index} outside of domain {}", self.len);
        let (word, mask) = Self::locate(index);
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    /// Returns `true` if `index` is a member. Out-of-domain indices are never members.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Returns the number of members.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Adds every member of the domain.
    pub fn fill(&mut self) {
        self.words.fill(u64::MAX);
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }
    }

    /// `self ∪= other`. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the two sets have different capacities.
    pub fn union_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a | b)
    }

    /// `self ∩= other`. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the two sets have different capacities.
    pub fn intersect_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & b)
    }

    /// `self \= other`. Returns `true` if `self` changed.
    ///
    /// # Panics
    ///
    /// Panics if the two sets have different capacities.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        self.combine(other, |a, b| a & !b)
    }

    /// Returns `true` if every member of `self` is also a member of `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len == other.len
            && self
                .words
                .iter()
                .zip(&other.words)
                .all(|(a, b)| a & !b == 0)
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    fn combine(&mut self, other: &Self, op: impl Fn(u64, u64) -> u64) -> bool {
        assert_eq!(
            self.len, other.len,
            "bit sets over different domains cannot be combined"
        );
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let next = op(*a, b);
            changed |= next != *a;
            *a = next;
        }
        changed
    }

    #[inline]
    fn locate(index: usize) -> (usize, u64) {
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a BitSet {
    type Item = usize;
    type IntoIter = BitSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the members of a [`BitSet`], in ascending order.
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * WORD_BITS + bit);
            }
            self.word_idx += 1;
            self.current = *self.set.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = BitSet::new(100);
        assert!(bs.is_empty());
        assert!(bs.insert(0));
        assert!(bs.insert(50));
        assert!(!bs.insert(50));
        assert!(bs.insert(99));

        assert_eq!(bs.count(), 3);
        assert!(bs.contains(50));
        assert!(!bs.contains(1));
        assert!(!bs.contains(1000));
    }

    #[test]
    fn test_bitset_remove() {
        let mut bs = BitSet::new(10);
        bs.insert(4);
        assert!(bs.remove(4));
        assert!(!bs.remove(4));
        assert!(bs.is_empty());
    }

    #[test]
    fn test_bitset_full_clears_tail_bits() {
        let bs = BitSet::full(70);
        assert_eq!(bs.count(), 70);
        assert_eq!(bs.iter().last(), Some(69));

        let exact = BitSet::full(128);
        assert_eq!(exact.count(), 128);
    }

    #[test]
    fn test_bitset_operations_report_change() {
        let mut a = BitSet::from_indices(8, [1, 2]);
        let b = BitSet::from_indices(8, [2, 3]);

        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        assert!(a.intersect_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![2, 3]);

        assert!(a.difference_with(&BitSet::from_indices(8, [3])));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_bitset_subset() {
        let small = BitSet::from_indices(8, [1]);
        let big = BitSet::from_indices(8, [1, 5]);
        assert!(small.is_subset(&big));
        assert!(!big.is_subset(&small));
    }

    #[test]
    fn test_bitset_iter_across_words() {
        let bs = BitSet::from_indices(200, [0, 63, 64, 127, 199]);
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 63, 64, 127, 199]);
    }

    #[test]
    fn test_bitset_zero_capacity() {
        let bs = BitSet::full(0);
        assert!(bs.is_empty());
        assert_eq!(bs.iter().count(), 0);
    }

    #[test]
    fn test_bitset_debug() {
        let bs = BitSet::from_indices(8, [1, 4]);
        assert_eq!(format!("{bs:?}"), "{1, 4}");
    }

    #[test]
    #[should_panic(expected = "different domains")]
    fn test_bitset_domain_mismatch_panics() {
        let mut a = BitSet::new(8);
        a.union_with(&BitSet::new(9));
    }
}
