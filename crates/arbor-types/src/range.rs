//! Sized, position-tracking iterator used for every sequence the API returns.

use crate::error::RepositoryError;

/// A forward-only iterator over a finite, ordered sequence that knows its
/// size and the number of elements already consumed.
#[derive(Debug)]
pub struct RangeIter<T> {
    items: std::vec::IntoIter<T>,
    size: usize,
    position: usize,
}

impl<T> RangeIter<T> {
    /// Wraps an ordered sequence.
    pub fn new(items: Vec<T>) -> Self {
        let size = items.len();
        Self {
            items: items.into_iter(),
            size,
            position: 0,
        }
    }

    /// Total number of elements in the sequence, consumed or not.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of elements already returned or skipped.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Skips `n` elements.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NoSuchElement` if fewer than `n` elements
    /// remain; the iterator is then exhausted.
    pub fn advance(&mut self, n: usize) -> Result<(), RepositoryError> {
        let remaining = self.size - self.position;
        if n > remaining {
            self.position = self.size;
            self.items.by_ref().for_each(drop);
            return Err(RepositoryError::NoSuchElement(format!(
                "cannot skip {n} elements, {remaining} remaining"
            )));
        }
        for _ in 0..n {
            self.items.next();
        }
        self.position += n;
        Ok(())
    }

    /// Peeks at the next element without consuming it.
    pub fn peek(&self) -> Option<&T> {
        self.items.as_slice().first()
    }
}

impl<T> Iterator for RangeIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.items.next()?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<T> ExactSizeIterator for RangeIter<T> {}

impl<T> Default for RangeIter<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
