/// Block extractor: sample the live map into pattern masks.

use crate::domain::geometry::{Layout, SEGMENT_WIDTH};
use crate::domain::pattern::{match_pattern, PatternMatch};
use crate::sim::tilemap::TileMap;

/// Mask of the block whose top-left (enemy row) cell is (x, y).
///
/// Reads five cells of the platform row `y + 1`; bit `4 - i` is set when
/// cell `x + i` is a platform. Cells outside the map read as absent.
pub fn extract_chunk_pattern(map: &TileMap, x: usize, y: usize) -> u8 {
    let row = y.saturating_add(1);
    let mut mask = 0u8;
    for i in 0..SEGMENT_WIDTH {
        let cx = x.saturating_add(i);
        if map.is_platform(cx, row) {
            mask |= 1 << (SEGMENT_WIDTH - 1 - i);
        }
    }
    mask
}

pub fn block_mask(map: &TileMap, layout: &Layout, block: usize) -> u8 {
    let (x, y) = layout.block_origin(block);
    extract_chunk_pattern(map, x, y)
}

pub fn block_pattern(map: &TileMap, layout: &Layout, block: usize) -> PatternMatch {
    match_pattern(block_mask(map, layout, block))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{from_glyph, PLATFORM_MIDDLE};

    /// Build a map from a diagram. Rows shorter than the map are padded.
    fn map_from(width_bits: u8, rows: &[&str]) -> TileMap {
        let mut m = TileMap::new(width_bits, rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                m.set(x, y, from_glyph(ch));
            }
        }
        m.take_changes();
        m
    }

    #[test]
    fn reads_platform_row_below_origin() {
        let m = map_from(3, &[
            "........",
            ".[=].[].",
        ]);
        assert_eq!(extract_chunk_pattern(&m, 1, 0), 0b11101);
        assert_eq!(extract_chunk_pattern(&m, 0, 0), 0b01110);
    }

    #[test]
    fn ignores_non_platform_tiles() {
        let m = map_from(3, &[
            "........",
            "P><#|...",
        ]);
        assert_eq!(extract_chunk_pattern(&m, 0, 0), 0);
    }

    // ── Edge safety ──

    #[test]
    fn origin_corner() {
        let m = map_from(2, &[
            "....",
            "[]..",
        ]);
        assert_eq!(extract_chunk_pattern(&m, 0, 0), 0b11000);
    }

    #[test]
    fn right_edge_reads_absent_past_width() {
        let mut m = TileMap::new(2, 2);
        for x in 0..4 {
            m.set(x, 1, PLATFORM_MIDDLE);
        }
        // Cells 3.. run off a 4-wide map: only the first is present.
        assert_eq!(extract_chunk_pattern(&m, 3, 0), 0b10000);
        assert_eq!(extract_chunk_pattern(&m, usize::MAX, 0), 0);
    }

    #[test]
    fn bottom_edge_reads_absent_past_height() {
        let mut m = TileMap::new(2, 2);
        m.set(0, 1, PLATFORM_MIDDLE);
        assert_eq!(extract_chunk_pattern(&m, 0, 1), 0);
        assert_eq!(extract_chunk_pattern(&m, 3, 1), 0);
        assert_eq!(extract_chunk_pattern(&m, 0, usize::MAX), 0);
    }

    #[test]
    fn block_pattern_uses_layout_origin() {
        let layout = Layout::default();
        let mut m = TileMap::new(layout.width_bits, layout.height);
        // Block 5 = column 1, row 1: x 7..=11, platform row 15.
        m.set(8, 15, PLATFORM_MIDDLE);
        m.set(9, 15, PLATFORM_MIDDLE);
        m.set(10, 15, PLATFORM_MIDDLE);
        let p = block_pattern(&m, &layout, 5);
        assert!(p.found);
        assert_eq!(p.id, 11); // 01110
    }
}
