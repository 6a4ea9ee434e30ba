/// Platform reconstruction: keep runs well-formed after an edit.
///
/// ## Run rules
///
///   - A run is a maximal stretch of platform cells in one platform row.
///   - Runs longer than `max_run` are split into segments of `max_run`.
///   - A segment of length 1 cannot stand alone and is erased.
///   - Each cell is drawn with the variant for its position in its segment.
///
/// Reconstruction is local: `rebuild_run` rescans only the run through
/// the edited column, O(run length).
///
/// ## Placement truth table
///
/// ┌──────────────────────────────────┬──────────────────────────────┐
/// │ Condition                         │ Result                       │
/// ├──────────────────────────────────┼──────────────────────────────┤
/// │ not a platform row / not empty    │ DENY                         │
/// │ platform left or right            │ JOIN if joined run ≤ max_run │
/// │ no neighbor, x+1 free             │ PAIR (x, x+1) if ≤ max_run   │
/// │ otherwise                         │ DENY                         │
/// └──────────────────────────────────┴──────────────────────────────┘

use crate::domain::geometry::Layout;
use crate::domain::pattern::{match_variant, neighborhood};
use crate::domain::tile::{EMPTY, PLATFORM_MIDDLE};
use crate::sim::tilemap::TileMap;

/// How a new platform cell attaches.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Placement {
    /// Extends or bridges existing runs
    Join,
    /// Starts a new two-cell run at (x, x+1)
    Pair,
}

/// Bounds (inclusive) of the run through (x, y), or None if (x, y) is
/// not a platform inside the editable columns.
pub fn run_at(map: &TileMap, layout: &Layout, x: usize, y: usize) -> Option<(usize, usize)> {
    if !layout.in_columns(x) || !map.is_platform(x, y) {
        return None;
    }
    let mut start = x;
    while start > layout.x_min() && map.is_platform(start - 1, y) {
        start -= 1;
    }
    let mut end = x;
    while end < layout.x_max() && map.is_platform(end + 1, y) {
        end += 1;
    }
    Some((start, end))
}

/// Platform cells contiguous to the left of x (exclusive).
fn run_left_of(map: &TileMap, layout: &Layout, x: usize, y: usize) -> usize {
    let mut n = 0;
    let mut cx = x;
    while cx > layout.x_min() && map.is_platform(cx - 1, y) {
        n += 1;
        cx -= 1;
    }
    n
}

/// Platform cells contiguous to the right of x (exclusive).
fn run_right_of(map: &TileMap, layout: &Layout, x: usize, y: usize) -> usize {
    let mut n = 0;
    let mut cx = x;
    while cx < layout.x_max() && map.is_platform(cx + 1, y) {
        n += 1;
        cx += 1;
    }
    n
}

/// Would a platform at (x, y) be accepted, and how would it attach?
pub fn can_place(map: &TileMap, layout: &Layout, x: usize, y: usize) -> Option<Placement> {
    if !layout.in_columns(x) || !layout.is_platform_row(y) || !map.is_empty(x, y) {
        return None;
    }
    let left = run_left_of(map, layout, x, y);
    let right = run_right_of(map, layout, x, y);
    if left > 0 || right > 0 {
        return (left + 1 + right <= layout.max_run).then_some(Placement::Join);
    }
    if x >= layout.x_max() || !map.is_empty(x + 1, y) {
        return None;
    }
    let merged = 2 + run_right_of(map, layout, x + 1, y);
    (merged <= layout.max_run).then_some(Placement::Pair)
}

/// Place a platform at (x, y) and rebuild its run.
/// Returns false without touching the map when placement is denied.
pub fn place_platform(map: &mut TileMap, layout: &Layout, x: usize, y: usize) -> bool {
    let Some(kind) = can_place(map, layout, x, y) else {
        return false;
    };
    map.set(x, y, PLATFORM_MIDDLE);
    if kind == Placement::Pair {
        map.set(x + 1, y, PLATFORM_MIDDLE);
    }
    rebuild_run(map, layout, x, y);
    true
}

/// Erase the platform at (x, y) and rebuild the runs on either side.
/// Returns every cell that stopped being a platform (including x).
pub fn remove_platform(map: &mut TileMap, layout: &Layout, x: usize, y: usize) -> Vec<usize> {
    if !layout.in_columns(x) || !map.is_platform(x, y) {
        return Vec::new();
    }
    map.set(x, y, EMPTY);
    let mut removed = vec![x];
    if x > layout.x_min() {
        removed.extend(rebuild_run(map, layout, x - 1, y));
    }
    if x < layout.x_max() {
        removed.extend(rebuild_run(map, layout, x + 1, y));
    }
    removed
}

/// Recompute variants for the run through (x, y).
/// Returns columns erased because they were left as lone cells.
pub fn rebuild_run(map: &mut TileMap, layout: &Layout, x: usize, y: usize) -> Vec<usize> {
    match run_at(map, layout, x, y) {
        Some((start, end)) => write_segments(map, layout, y, start, end),
        None => Vec::new(),
    }
}

/// Recompute every run in a platform row (full decode).
pub fn rebuild_row(map: &mut TileMap, layout: &Layout, y: usize) -> Vec<usize> {
    let mut removed = Vec::new();
    let mut x = layout.x_min();
    while x <= layout.x_max() {
        match run_at(map, layout, x, y) {
            Some((start, end)) => {
                removed.extend(write_segments(map, layout, y, start, end));
                x = end + 1;
            }
            None => x += 1,
        }
    }
    removed
}

fn write_segments(map: &mut TileMap, layout: &Layout, y: usize, start: usize, end: usize) -> Vec<usize> {
    let mut removed = Vec::new();
    let mut seg_start = start;
    while seg_start <= end {
        let seg_end = (seg_start + layout.max_run - 1).min(end);
        if seg_start == seg_end {
            map.set(seg_start, y, EMPTY);
            removed.push(seg_start);
        } else {
            for cx in seg_start..=seg_end {
                let bits = neighborhood(cx > seg_start, true, cx < seg_end);
                let (variant, _) = match_variant(bits);
                map.set(cx, y, variant.tile());
            }
        }
        seg_start = seg_end + 1;
    }
    removed
}
