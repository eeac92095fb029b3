//! A `std::vec::Vec`, but 1-indexed instead of 0-indexed.

/// Like a `std::vec::Vec`, but 1-indexed instead of 0-indexed. Index 0 is never valid, which is
/// exactly the addressing scheme of the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub struct OneIndexedVec<T> {
    vec: Vec<T>,
}

impl<T> OneIndexedVec<T> {
    pub fn new() -> Self {
        OneIndexedVec { vec: Vec::new() }
    }

    /// Returns the element at the given index, or `None` if the index is 0 or out of bounds.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index == 0 {
            None
        } else {
            self.vec.get(index - 1)
        }
    }

    /// Appends an element, which receives the index `self.len()` after the push.
    pub fn push(&mut self, value: T) {
        self.vec.push(value);
    }

    /// Returns the number of elements in the vector.
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    /// Returns an iterator over `(index, element)` pairs, starting at index 1.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &T)> {
        self.vec.iter().enumerate().map(|(i, v)| (i + 1, v))
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> ::std::slice::Iter<T> {
        self.vec.iter()
    }
}

impl<T> Default for OneIndexedVec<T> {
    fn default() -> Self {
        OneIndexedVec::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn index_zero_is_never_valid() {
        let mut v = OneIndexedVec::new();
        v.push('a');
        v.push('b');
        assert_eq!(v.get(0), None);
        assert_eq!(v.get(1), Some(&'a'));
        assert_eq!(v.get(2), Some(&'b'));
        assert_eq!(v.get(3), None);
    }

    #[test]
    fn indexed_starts_at_one() {
        let mut v = OneIndexedVec::new();
        v.push(10);
        v.push(20);
        let pairs: Vec<_> = v.indexed().map(|(i, x)| (i, *x)).collect();
        assert_eq!(pairs, vec![(1, 10), (2, 20)]);
    }
}
