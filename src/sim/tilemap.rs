/// Live tile map: the flat byte buffer the runtime draws from.
///
/// ## Change journal
///
/// Every `set()` records the cell's value from before the current
/// operation (first write wins). `take_changes()` compares that value
/// with the current one, so a cell written back to its original id
/// within one operation is not reported. The redraw set is therefore
/// exactly the set of cells whose tile differs after the operation.
///
/// Reads outside the map return `EMPTY`; writes outside are ignored.

use crate::domain::tile::{classify, Category, TileId, EMPTY};

#[derive(Clone, Debug)]
pub struct TileMap {
    width_bits: u8,
    height: usize,
    cells: Vec<TileId>,
    /// (index, value before the current operation)
    journal: Vec<(usize, TileId)>,
}

impl TileMap {
    pub fn new(width_bits: u8, height: usize) -> Self {
        TileMap {
            width_bits,
            height,
            cells: vec![EMPTY; (1usize << width_bits) * height],
            journal: Vec::new(),
        }
    }

    /// Wrap an existing buffer, e.g. a region read from storage.
    /// Short buffers are padded with `EMPTY`.
    pub fn from_bytes(width_bits: u8, height: usize, bytes: &[u8]) -> Self {
        let mut map = TileMap::new(width_bits, height);
        let n = bytes.len().min(map.cells.len());
        map.cells[..n].copy_from_slice(&bytes[..n]);
        map
    }

    pub fn width(&self) -> usize {
        1usize << self.width_bits
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width() && y < self.height {
            Some((y << self.width_bits) + x)
        } else {
            None
        }
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index & (self.width() - 1), index >> self.width_bits)
    }

    pub fn get(&self, x: usize, y: usize) -> TileId {
        self.index(x, y).map_or(EMPTY, |i| self.cells[i])
    }

    pub fn category(&self, x: usize, y: usize) -> Category {
        classify(self.get(x, y))
    }

    pub fn is_platform(&self, x: usize, y: usize) -> bool {
        self.category(x, y).is_platform()
    }

    pub fn is_empty(&self, x: usize, y: usize) -> bool {
        self.category(x, y).is_empty()
    }

    /// Write a tile. Returns true if the stored id changed.
    pub fn set(&mut self, x: usize, y: usize, id: TileId) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        let old = self.cells[i];
        if old == id {
            return false;
        }
        if !self.journal.iter().any(|&(j, _)| j == i) {
            self.journal.push((i, old));
        }
        self.cells[i] = id;
        true
    }

    /// Cells whose id differs from the start of the operation, in write order.
    /// Clears the journal.
    pub fn take_changes(&mut self) -> Vec<(usize, usize)> {
        let journal = std::mem::take(&mut self.journal);
        journal
            .into_iter()
            .filter(|&(i, old)| self.cells[i] != old)
            .map(|(i, _)| self.position(i))
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{PLATFORM_MIDDLE, PLAYER};

    #[test]
    fn flat_index_uses_width_shift() {
        let m = TileMap::new(5, 20);
        assert_eq!(m.index(3, 2), Some(2 * 32 + 3));
        assert_eq!(m.position(67), (3, 2));
        assert_eq!(m.index(32, 0), None);
        assert_eq!(m.index(0, 20), None);
    }

    #[test]
    fn out_of_range_reads_are_empty() {
        let m = TileMap::new(3, 4);
        assert_eq!(m.get(100, 100), EMPTY);
        assert!(m.category(8, 0).is_empty());
    }

    #[test]
    fn journal_reports_only_net_changes() {
        let mut m = TileMap::new(3, 4);
        assert!(m.set(1, 1, PLATFORM_MIDDLE));
        assert!(m.set(2, 1, PLAYER));
        assert!(m.set(2, 1, EMPTY)); // back to original
        assert!(!m.set(1, 1, PLATFORM_MIDDLE)); // no-op
        assert_eq!(m.take_changes(), vec![(1, 1)]);
        assert!(m.take_changes().is_empty());
    }

    #[test]
    fn writes_outside_are_ignored() {
        let mut m = TileMap::new(3, 4);
        assert!(!m.set(9, 0, PLAYER));
        assert!(m.take_changes().is_empty());
    }

    #[test]
    fn from_bytes_pads_short_buffers() {
        let m = TileMap::from_bytes(2, 2, &[PLAYER, 0, 5]);
        assert_eq!(m.get(0, 0), PLAYER);
        assert_eq!(m.get(2, 0), 5);
        assert_eq!(m.get(3, 1), EMPTY);
        assert_eq!(m.as_bytes().len(), 8);
    }
}
