// SPDX-FileCopyrightText: © 2025 FlowKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Growable module bitset.
//!
//! Every module in a pipeline owns one dense id; a [`ModuleMask`] is a set of those ids.
//! Masks track which modules have passed a frame, which upstream modules a module waits on,
//! and which modules have acknowledged a stream's EOS.
//!
//! Graphs of up to 64 modules stay inline (one word); larger graphs spill to the heap.

use smallvec::SmallVec;
use std::fmt;

/// Dense index of a module inside one pipeline.
pub type ModuleId = usize;

const WORD_BITS: usize = u64::BITS as usize;

/// A set of [`ModuleId`]s.
///
/// Invariant: the word vector never ends with a zero word, so structural equality is set equality.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ModuleMask {
    words: SmallVec<[u64; 1]>,
}

impl ModuleMask {
    /// Creates an empty mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mask containing a single module.
    pub fn single(id: ModuleId) -> Self {
        let mut mask = Self::new();
        mask.insert(id);
        mask
    }

    /// Adds `id`; returns true if it was not present.
    pub fn insert(&mut self, id: ModuleId) -> bool {
        let (word, bit) = (id / WORD_BITS, id % WORD_BITS);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let before = self.words[word];
        self.words[word] |= 1u64 << bit;
        before != self.words[word]
    }

    /// Removes `id`; returns true if it was present.
    pub fn remove(&mut self, id: ModuleId) -> bool {
        let (word, bit) = (id / WORD_BITS, id % WORD_BITS);
        let Some(slot) = self.words.get_mut(word) else {
            return false;
        };
        let present = *slot & (1u64 << bit) != 0;
        *slot &= !(1u64 << bit);
        self.trim();
        present
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.words.get(id / WORD_BITS).is_some_and(|w| w & (1u64 << (id % WORD_BITS)) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of modules in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// In-place union.
    pub fn union_with(&mut self, other: &Self) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (mine, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *mine |= theirs;
        }
    }

    /// In-place difference (`self \ other`).
    pub fn subtract(&mut self, other: &Self) {
        for (mine, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *mine &= !theirs;
        }
        self.trim();
    }

    /// True when every module of `other` is also in `self`.
    pub fn covers(&self, other: &Self) -> bool {
        other.words.iter().enumerate().all(|(i, theirs)| {
            let mine = self.words.get(i).copied().unwrap_or(0);
            mine & theirs == *theirs
        })
    }

    /// Iterates the contained ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| i * WORD_BITS + bit)
        })
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<ModuleId> for ModuleMask {
    fn from_iter<I: IntoIterator<Item = ModuleId>>(iter: I) -> Self {
        let mut mask = Self::new();
        for id in iter {
            mask.insert(id);
        }
        mask
    }
}

impl fmt::Debug for ModuleMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_keep_set_equality() {
        let mut mask = ModuleMask::new();
        assert!(mask.insert(3));
        assert!(!mask.insert(3));
        assert!(mask.insert(130));
        assert_eq!(mask.len(), 2);

        assert!(mask.remove(130));
        assert_eq!(mask, ModuleMask::single(3));
        assert!(!mask.remove(500));
    }

    #[test]
    fn masks_grow_past_one_word() {
        let mask: ModuleMask = (0..200).collect();
        assert_eq!(mask.len(), 200);
        assert!(mask.contains(199));
        assert!(!mask.contains(200));
        assert_eq!(mask.iter().last(), Some(199));
    }

    #[test]
    fn covers_is_subset_check() {
        let passed: ModuleMask = [0, 1, 2, 70].into_iter().collect();
        let parents: ModuleMask = [1, 70].into_iter().collect();
        assert!(passed.covers(&parents));
        assert!(!parents.covers(&passed));
        assert!(passed.covers(&ModuleMask::new()));
    }

    #[test]
    fn union_and_subtract() {
        let mut all: ModuleMask = [0, 1].into_iter().collect();
        all.union_with(&ModuleMask::single(65));
        assert_eq!(all.iter().collect::<Vec<_>>(), vec![0, 1, 65]);

        all.subtract(&ModuleMask::single(65));
        assert_eq!(all, [0, 1].into_iter().collect());
    }
}
