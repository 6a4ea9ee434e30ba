/// Player and exit placement rules.
///
/// Pure queries over the live map plus small writers. The player lives
/// on the player row above the block grid; the exit is a 2×2 footprint
/// whose bottom row sits on an enemy row, resting on two platform cells.
/// Unless placed explicitly, the exit follows the player: it stands on the
/// first platform below the player's column.
///
/// ```text
///   / \      top row     (y - 1)
///   | !      bottom row  (y, an enemy row)
///   = =      platform    (y + 1)
/// ```

use crate::domain::geometry::Layout;
use crate::domain::tile::{ExitCorner, EMPTY, EXIT_BOTTOM_LEFT, PLATFORM_RIGHT, PLAYER};
use crate::sim::tilemap::TileMap;

// ── Player ──

/// Column (map x) holding the player tile, if any.
pub fn find_player(map: &TileMap, layout: &Layout) -> Option<usize> {
    let y = layout.player_row();
    (layout.x_min()..=layout.x_max()).find(|&x| map.get(x, y) == PLAYER)
}

pub fn column_has_platform(map: &TileMap, layout: &Layout, x: usize) -> bool {
    (layout.y_min()..=layout.y_max())
        .filter(|&y| layout.is_platform_row(y))
        .any(|y| map.is_platform(x, y))
}

pub fn column_has_enemy(map: &TileMap, layout: &Layout, x: usize) -> bool {
    (layout.y_min()..=layout.y_max())
        .filter(|&y| layout.is_enemy_row(y))
        .any(|y| map.category(x, y).is_enemy())
}

/// A column the player may start in: it has a platform somewhere below.
pub fn is_valid_player_column(map: &TileMap, layout: &Layout, x: usize) -> bool {
    layout.in_columns(x) && column_has_platform(map, layout, x)
}

fn player_cell_free(map: &TileMap, layout: &Layout, x: usize) -> bool {
    let t = map.get(x, layout.player_row());
    t == EMPTY || t == PLAYER
}

/// Default spawn: the first valid column whose player cell is free,
/// or the first editable column when no column is valid.
pub fn default_spawn(map: &TileMap, layout: &Layout) -> usize {
    (layout.x_min()..=layout.x_max())
        .find(|&x| is_valid_player_column(map, layout, x) && player_cell_free(map, layout, x))
        .unwrap_or(layout.x_min())
}

/// Paintable player column nearest to `x`, preferring the left on ties.
pub fn nearest_valid_column(map: &TileMap, layout: &Layout, x: usize) -> Option<usize> {
    let candidates = (layout.x_min()..=layout.x_max())
        .filter(|&c| can_paint_player(map, layout, c, layout.player_row()));
    candidates.min_by_key(|&c| (c.abs_diff(x), c))
}

/// Can the player be painted at (x, y)?
pub fn can_paint_player(map: &TileMap, layout: &Layout, x: usize, y: usize) -> bool {
    y == layout.player_row()
        && is_valid_player_column(map, layout, x)
        && !column_has_enemy(map, layout, x)
        && player_cell_free(map, layout, x)
}

// ── Exit ──

/// Bottom-left cell of the exit footprint, if one is on the map.
pub fn find_exit(map: &TileMap, layout: &Layout) -> Option<(usize, usize)> {
    for y in layout.editable_rows() {
        for x in layout.x_min()..=layout.x_max() {
            if map.get(x, y) == EXIT_BOTTOM_LEFT {
                return Some((x, y));
            }
        }
    }
    None
}

fn footprint(x: usize, y: usize) -> impl Iterator<Item = (ExitCorner, usize, usize)> {
    ExitCorner::ALL.into_iter().map(move |c| {
        let (dx, up) = c.offset();
        (c, x + dx, y - up)
    })
}

/// All four exit cells are inside the editable area and empty.
pub fn exit_fits(map: &TileMap, layout: &Layout, x: usize, y: usize) -> bool {
    if !layout.is_enemy_row(y) || !layout.in_columns(x) || x + 1 > layout.x_max() {
        return false;
    }
    footprint(x, y).all(|(_, cx, cy)| map.is_empty(cx, cy))
}

/// Both bottom cells rest on platforms.
pub fn exit_supported(map: &TileMap, x: usize, y: usize) -> bool {
    map.is_platform(x, y + 1) && map.is_platform(x + 1, y + 1)
}

/// Exit spot for the current player: one row above the first platform
/// below the player's column, shifted left when that cell is a right cap.
/// Platforms whose spot is blocked are skipped.
pub fn derive_exit(map: &TileMap, layout: &Layout) -> Option<(usize, usize)> {
    let px = find_player(map, layout).unwrap_or_else(|| default_spawn(map, layout));
    (layout.y_min()..=layout.y_max())
        .filter(|&y| layout.is_platform_row(y) && map.is_platform(px, y))
        .map(|py| {
            let shift = map.get(px, py) == PLATFORM_RIGHT && px > layout.x_min();
            (if shift { px - 1 } else { px }, py - 1)
        })
        .find(|&(x, y)| exit_supported(map, x, y) && exit_fits(map, layout, x, y))
}

pub fn write_exit(map: &mut TileMap, x: usize, y: usize) {
    for (corner, cx, cy) in footprint(x, y) {
        map.set(cx, cy, corner.tile());
    }
}

pub fn clear_exit(map: &mut TileMap, x: usize, y: usize) {
    for (_, cx, cy) in footprint(x, y) {
        if map.category(cx, cy).is_exit() {
            map.set(cx, cy, EMPTY);
        }
    }
}

/// Clear the current exit and put it back at the derived spot.
pub fn relocate_exit(map: &mut TileMap, layout: &Layout) -> Option<(usize, usize)> {
    if let Some((x, y)) = find_exit(map, layout) {
        clear_exit(map, x, y);
    }
    let (x, y) = derive_exit(map, layout)?;
    write_exit(map, x, y);
    Some((x, y))
}
