/// Pattern tables: shape matching and positional legality.
///
/// Two independent tables live here:
///
/// ## Block patterns
///
/// A block's platform row is five cells wide. Its shape is a 5-bit mask,
/// bit `4 - i` set when cell `i` (left to right) holds a platform. Only
/// 21 masks can occur in a legal level: every platform run is at least
/// two cells long, so a lone cell may only appear at a block edge where
/// it continues into the neighbor block. The pattern id is the index in
/// `BLOCK_PATTERNS` and is what the level code stores.
///
/// ```text
///   id  mask    id  mask    id  mask
///    0  00000    7  00111   14  10001  ◄►
///    1  00001 ►  8  11100   15  10011  ◄
///    2  10000 ◄  9  01101 ► 16  11001  ►
///    3  00011   10  10110 ◄ 17  10111  ◄
///    4  11000   11  01110   18  11101  ►
///    5  00110   12  01111   19  11011
///    6  01100   13  11110   20  11111
/// ```
///
/// `◄` continues into the block on the left, `►` into the block on the
/// right. Those patterns are illegal in a block with no such neighbor.
///
/// ## Run variants
///
/// Each platform cell is drawn as a left cap, middle or right cap chosen
/// from its (left, self, right) neighborhood inside its run.
///
/// ┌───────────────┬────────────┐
/// │ left self right│ Variant    │
/// ├───────────────┼────────────┤
/// │  0    1    1   │ LeftCap    │
/// │  1    1    1   │ Middle     │
/// │  1    1    0   │ RightCap   │
/// │  0    1    0   │ Isolated   │
/// │  otherwise     │ Isolated   │
/// └───────────────┴────────────┘

use super::tile::{TileId, PLATFORM_LEFT, PLATFORM_MIDDLE, PLATFORM_RIGHT};

/// Block pattern masks indexed by pattern id.
pub static BLOCK_PATTERNS: [u8; 21] = [
    0b00000, 0b00001, 0b10000, 0b00011, 0b11000, 0b00110, 0b01100,
    0b00111, 0b11100, 0b01101, 0b10110, 0b01110, 0b01111, 0b11110,
    0b10001, 0b10011, 0b11001, 0b10111, 0b11101, 0b11011, 0b11111,
];

pub const PATTERN_COUNT: u8 = 21;

/// Fallback pattern when a mask is not in the table.
pub const DEFAULT_PATTERN: u8 = 0;

const LEFT_EDGE: u8 = 0b10000;
const RIGHT_EDGE: u8 = 0b00001;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PatternMatch {
    pub id: u8,
    pub found: bool,
}

/// Exact-equality lookup of a block mask. Unknown masks yield
/// `DEFAULT_PATTERN` with `found = false`.
pub fn match_pattern(mask: u8) -> PatternMatch {
    match BLOCK_PATTERNS.iter().position(|&m| m == mask) {
        Some(i) => PatternMatch { id: i as u8, found: true },
        None => PatternMatch { id: DEFAULT_PATTERN, found: false },
    }
}

/// Mask for a pattern id. Out-of-range ids read as empty.
pub fn pattern_mask(id: u8) -> u8 {
    BLOCK_PATTERNS.get(id as usize).copied().unwrap_or(0)
}

/// Is cell `i` (0 = leftmost) set in the pattern?
pub fn pattern_cell(id: u8, i: usize) -> bool {
    i < 5 && pattern_mask(id) & (1 << (4 - i)) != 0
}

/// Leftmost cell is a lone platform that continues into the left block.
pub fn needs_left(id: u8) -> bool {
    let m = pattern_mask(id);
    m & 0b11000 == LEFT_EDGE
}

/// Rightmost cell is a lone platform that continues into the right block.
pub fn needs_right(id: u8) -> bool {
    let m = pattern_mask(id);
    m & 0b00011 == RIGHT_EDGE
}

// ── Positional validity ──

/// Which neighbor blocks exist in the same block row.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Neighbors {
    pub left: bool,
    pub right: bool,
}

impl Neighbors {
    pub fn for_column(column: usize, block_columns: usize) -> Self {
        Neighbors {
            left: column > 0,
            right: column + 1 < block_columns,
        }
    }
}

/// Can this pattern legally sit in a block with these neighbors?
pub fn is_valid_at(id: u8, neighbors: Neighbors) -> bool {
    if id >= PATTERN_COUNT {
        return false;
    }
    if needs_left(id) && !neighbors.left {
        return false;
    }
    if needs_right(id) && !neighbors.right {
        return false;
    }
    true
}

/// Next valid pattern after `current`, wrapping past the table end.
pub fn next_valid_pattern(current: u8, neighbors: Neighbors) -> u8 {
    step_valid(current, neighbors, 1)
}

/// Previous valid pattern before `current`, wrapping past zero.
pub fn previous_valid_pattern(current: u8, neighbors: Neighbors) -> u8 {
    step_valid(current, neighbors, PATTERN_COUNT - 1)
}

fn step_valid(current: u8, neighbors: Neighbors, step: u8) -> u8 {
    let mut id = current % PATTERN_COUNT;
    for _ in 0..PATTERN_COUNT {
        id = (id + step) % PATTERN_COUNT;
        if is_valid_at(id, neighbors) {
            return id;
        }
    }
    DEFAULT_PATTERN
}

/// Normalize a stored pattern id for a block: out-of-range ids become
/// empty, illegal ones advance to the next valid pattern.
pub fn normalize_pattern(id: u8, neighbors: Neighbors) -> u8 {
    if id >= PATTERN_COUNT {
        DEFAULT_PATTERN
    } else if is_valid_at(id, neighbors) {
        id
    } else {
        next_valid_pattern(id, neighbors)
    }
}

// ── Run variants ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Variant {
    LeftCap,
    Middle,
    RightCap,
    Isolated,
}

impl Variant {
    pub fn tile(self) -> TileId {
        match self {
            Variant::LeftCap => PLATFORM_LEFT,
            Variant::Middle | Variant::Isolated => PLATFORM_MIDDLE,
            Variant::RightCap => PLATFORM_RIGHT,
        }
    }
}

static VARIANTS: [(u8, Variant); 4] = [
    (0b011, Variant::LeftCap),
    (0b111, Variant::Middle),
    (0b110, Variant::RightCap),
    (0b010, Variant::Isolated),
];

/// Pack a (left, self, right) neighborhood into three bits.
pub fn neighborhood(left: bool, here: bool, right: bool) -> u8 {
    (left as u8) << 2 | (here as u8) << 1 | right as u8
}

/// Variant for a neighborhood; unmatched shapes fall back to `Isolated`.
pub fn match_variant(bits: u8) -> (Variant, bool) {
    VARIANTS
        .iter()
        .find(|(m, _)| *m == bits)
        .map(|&(_, v)| (v, true))
        .unwrap_or((Variant::Isolated, false))
}
