//! Swap-remove indexed container backing every group.
//!
//! Stores unique `Copy` values with O(1) amortized add, O(1) remove-by-value
//! (swap with the last element), O(1) contains/index lookup and cheap
//! unordered iteration. Iteration order is **unstable across removals**:
//! removing any element may move the last element into its slot.

use std::fmt;
use std::hash::Hash;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use thiserror::Error;

/// Container misuse error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashVectorError {
    /// The value is already present.
    #[error("value is already present")]
    Duplicate,
    /// The value is not present.
    #[error("value is not present")]
    Missing,
}

/// Unordered container with O(1) add, remove-by-value and index lookup.
pub struct HashVector<V> {
    values: Vec<V>,
    indices: HashMap<V, usize, FxBuildHasher>,
}

impl<V: Copy + Eq + Hash> HashVector<V> {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            indices: HashMap::default(),
        }
    }

    /// Append a value.
    ///
    /// # Panics
    ///
    /// Panics if the value is already present; adding a member twice means
    /// the caller's bookkeeping is broken.
    pub fn add(&mut self, value: V) {
        if let Err(err) = self.try_add(value) {
            panic!("HashVector::add: {err}");
        }
    }

    /// Append a value, failing on duplicates.
    pub fn try_add(&mut self, value: V) -> Result<(), HashVectorError> {
        if self.indices.contains_key(&value) {
            return Err(HashVectorError::Duplicate);
        }
        self.indices.insert(value, self.values.len());
        self.values.push(value);
        Ok(())
    }

    /// Remove a value by swapping the last element into its slot.
    ///
    /// # Panics
    ///
    /// Panics if the value is not present.
    pub fn remove(&mut self, value: V) {
        if let Err(err) = self.try_remove(value) {
            panic!("HashVector::remove: {err}");
        }
    }

    /// Remove a value, failing when absent.
    pub fn try_remove(&mut self, value: V) -> Result<(), HashVectorError> {
        let Some(slot) = self.indices.remove(&value) else {
            return Err(HashVectorError::Missing);
        };

        let last = self.values.len() - 1;
        if slot != last {
            let moved = self.values[last];
            self.values[slot] = moved;
            self.indices.insert(moved, slot);
        }
        self.values.truncate(last);
        Ok(())
    }

    /// Check whether a value is present.
    #[must_use]
    pub fn contains(&self, value: V) -> bool {
        self.indices.contains_key(&value)
    }

    /// Current index of a value, if present.
    #[must_use]
    pub fn get_index_of(&self, value: V) -> Option<usize> {
        self.indices.get(&value).copied()
    }

    /// Current index of a value.
    ///
    /// # Panics
    ///
    /// Panics if the value is not present.
    #[must_use]
    pub fn index_of(&self, value: V) -> usize {
        match self.get_index_of(value) {
            Some(index) => index,
            None => panic!("HashVector::index_of: {}", HashVectorError::Missing),
        }
    }

    /// Value at an index, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    /// Value at an index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[must_use]
    pub fn at(&self, index: usize) -> V {
        self.values[index]
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.values.clear();
        self.indices.clear();
    }

    /// Move every value out, leaving the container empty.
    pub fn take_all(&mut self) -> Vec<V> {
        self.indices.clear();
        std::mem::take(&mut self.values)
    }

    /// Iterate over current contents in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }

    /// Current contents as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }
}

impl<V: Copy + Eq + Hash> Default for HashVector<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, V: Copy + Eq + Hash> IntoIterator for &'a HashVector<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Copy + Eq + Hash + fmt::Debug> fmt::Debug for HashVector<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_contains_len() {
        let mut v = HashVector::new();
        v.add(10);
        v.add(20);
        v.add(30);

        assert_eq!(v.len(), 3);
        assert!(v.contains(20));
        assert!(!v.contains(40));
    }

    #[test]
    fn test_swap_remove_moves_last() {
        let mut v = HashVector::new();
        v.add(1);
        v.add(2);
        v.add(3);

        v.remove(1);

        // 3 took the freed slot; the index map must agree.
        assert_eq!(v.len(), 2);
        assert_eq!(v.at(0), 3);
        assert_eq!(v.index_of(3), 0);
        assert_eq!(v.index_of(2), 1);
        assert!(!v.contains(1));
    }

    #[test]
    fn test_remove_last_element() {
        let mut v = HashVector::new();
        v.add(1);
        v.add(2);

        v.remove(2);
        assert_eq!(v.len(), 1);
        assert_eq!(v.at(0), 1);
    }

    #[test]
    fn test_index_invariant_under_churn() {
        let mut v = HashVector::new();
        for i in 0..32 {
            v.add(i);
        }
        for i in (0..32).step_by(3) {
            v.remove(i);
        }
        v.add(100);
        v.add(101);

        for i in 0..v.len() {
            assert_eq!(v.index_of(v.at(i)), i);
        }
    }

    #[test]
    fn test_try_variants_report_misuse() {
        let mut v = HashVector::new();
        v.add(7);

        assert_eq!(v.try_add(7), Err(HashVectorError::Duplicate));
        assert_eq!(v.try_remove(8), Err(HashVectorError::Missing));
        assert_eq!(v.try_remove(7), Ok(()));
        assert!(v.is_empty());
    }

    #[test]
    #[should_panic(expected = "already present")]
    fn test_double_add_panics() {
        let mut v = HashVector::new();
        v.add(1);
        v.add(1);
    }

    #[test]
    #[should_panic(expected = "not present")]
    fn test_remove_absent_panics() {
        let mut v: HashVector<i32> = HashVector::new();
        v.remove(1);
    }

    #[test]
    fn test_take_all_and_clear() {
        let mut v = HashVector::new();
        v.add(1);
        v.add(2);

        let taken = v.take_all();
        assert_eq!(taken.len(), 2);
        assert!(v.is_empty());

        v.add(3);
        v.clear();
        assert!(v.is_empty());
        assert!(!v.contains(3));
    }
}
