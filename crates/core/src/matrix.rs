// crates/core/src/matrix.rs
use crate::calendar::DateId;
use crate::path_index::PathId;

/// Visit counts over `(PathId, DateId)`, flattened row-major as
/// `path * dates + date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
    dates: usize,
    cells: Vec<u32>,
}

impl CountMatrix {
    pub fn new(paths: usize, dates: usize) -> Self {
        Self {
            dates,
            cells: vec![0; paths * dates],
        }
    }

    #[inline]
    pub fn index(&self, path: PathId, date: DateId) -> usize {
        path as usize * self.dates + date as usize
    }

    #[inline]
    pub fn increment(&mut self, path: PathId, date: DateId) {
        let i = self.index(path, date);
        self.cells[i] += 1;
    }

    /// Add `count` to a flat cell. Callers check `index < len()`.
    #[inline]
    pub fn add_at(&mut self, index: usize, count: u32) {
        self.cells[index] += count;
    }

    pub fn get(&self, path: PathId, date: DateId) -> u32 {
        self.cells.get(self.index(path, date)).copied().unwrap_or(0)
    }

    pub fn row(&self, path: PathId) -> &[u32] {
        let start = path as usize * self.dates;
        &self.cells[start..start + self.dates]
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn dates(&self) -> usize {
        self.dates
    }

    pub fn paths(&self) -> usize {
        if self.dates == 0 {
            0
        } else {
            self.cells.len() / self.dates
        }
    }

    pub fn total(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    /// Cell-wise sum. Both matrices must have the same shape.
    pub fn merge(&mut self, other: &CountMatrix) {
        debug_assert_eq!(self.cells.len(), other.cells.len());
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += *b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_layout() {
        let mut m = CountMatrix::new(3, 5);
        assert_eq!(m.len(), 15);
        assert_eq!(m.index(2, 4), 14);
        m.increment(1, 3);
        m.increment(1, 3);
        assert_eq!(m.get(1, 3), 2);
        assert_eq!(m.row(1), &[0, 0, 0, 2, 0]);
        assert_eq!(m.total(), 2);
        assert_eq!(m.paths(), 3);
    }

    #[test]
    fn test_merge_sums_cells() {
        let mut a = CountMatrix::new(2, 2);
        let mut b = CountMatrix::new(2, 2);
        a.increment(0, 0);
        b.increment(0, 0);
        b.increment(1, 1);
        a.merge(&b);
        assert_eq!(a.cells(), &[2, 0, 0, 1]);
    }

    #[test]
    fn test_empty_matrix() {
        let m = CountMatrix::new(0, 10);
        assert!(m.is_empty());
        assert_eq!(m.paths(), 0);
        assert_eq!(m.total(), 0);
    }
}
