/// Level code codec.
///
/// ## Structure
///
/// A `LevelCode` holds one pattern id per block, the player column, an
/// ordered list of up to five enemies and the exit slot. Platform runs
/// are not stored explicitly: each block's pattern is the run list for
/// that block, and patterns that touch a block edge carry the
/// connectivity to the neighbor block (see `domain::pattern`).
///
/// ## Textual form (`blocks + 8` symbols, 24 for the default layout)
///
/// ```text
///   [0 .. blocks)   pattern id per block, row-major
///   blocks          player column
///   blocks+1 ..+5   enemy slots: 0 = empty, else 1 + row*stride + col/2
///   blocks+6        odd-column mask   (bit i: slot i is on an odd column)
///   blocks+7        facing mask       (bit i: slot i faces left)
/// ```
///
/// Each symbol is a value 0..=40 drawn from `0-9 A-Z ! @ # $ %`.
///
/// ## Byte image
///
/// ```text
///   magic (u16 LE 0xABCD) | symbols... | exit x | exit y | xor checksum
/// ```
///
/// Exit bytes: `0xFF 0xFF` = no exit, `0xFE 0xFE` = derive on load.
///
/// ## Round trip
///
/// `decode(encode(map))` reproduces the category of every cell of any
/// map the editor can reach. Decoding is best-effort: illegal patterns
/// are normalized, enemies that cannot stand are dropped and a missing
/// player lands on the default spawn.

use tracing::{debug, warn};

use crate::domain::entity::Facing;
use crate::domain::geometry::{Layout, SEGMENT_WIDTH};
use crate::domain::pattern::{needs_left, needs_right, normalize_pattern, pattern_cell, Neighbors};
use crate::domain::tile::{enemy_tile, Category, EMPTY, PLATFORM_MIDDLE, PLAYER};
use crate::error::CodeError;
use crate::sim::enemies::{validate_position, EnemyPool};
use crate::sim::extract::block_pattern;
use crate::sim::placement::{
    default_spawn, derive_exit, exit_fits, find_exit, find_player, is_valid_player_column, write_exit,
};
use crate::sim::platform::rebuild_row;
use crate::sim::tilemap::TileMap;

/// Enemy slots carried by the level code.
pub const ENEMY_SLOTS: usize = 5;

pub const ALPHABET: &[u8; 41] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ!@#$%";

pub const IMAGE_MAGIC: u16 = 0xABCD;

const EXIT_ABSENT: u8 = 0xFF;
const EXIT_DERIVED: u8 = 0xFE;

// ══════════════════════════════════════════════════════════════
// Types
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitSlot {
    /// Place the exit at the first supported spot on load
    Derived,
    /// Bottom-left cell of the exit footprint
    At(usize, usize),
    Absent,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CodeEnemy {
    /// Editable column, 0-based
    pub column: usize,
    /// Block row, 0-based
    pub row: usize,
    pub facing: Facing,
}

/// A stretch of platform cells inside one block, with its continuation
/// into the neighbor blocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PlatformRun {
    pub row: usize,
    /// Editable column of the first cell
    pub start: usize,
    pub len: usize,
    pub connected_left: bool,
    pub connected_right: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelCode {
    pub patterns: Vec<u8>,
    /// Editable column, 0-based
    pub player_column: usize,
    pub enemies: Vec<CodeEnemy>,
    pub exit: ExitSlot,
}

// ══════════════════════════════════════════════════════════════
// Symbols
// ══════════════════════════════════════════════════════════════

pub fn symbol_char(value: u8) -> char {
    ALPHABET.get(value as usize).map_or('?', |&b| b as char)
}

/// Case-insensitive symbol lookup.
pub fn symbol_value(ch: char) -> Option<u8> {
    let up = ch.to_ascii_uppercase();
    ALPHABET.iter().position(|&b| b as char == up).map(|i| i as u8)
}

impl LevelCode {
    /// Empty level: no platforms, player at column 0, exit derived.
    pub fn empty(layout: &Layout) -> Self {
        LevelCode {
            patterns: vec![0; layout.block_count()],
            player_column: 0,
            enemies: Vec::new(),
            exit: ExitSlot::Derived,
        }
    }

    pub fn symbols(&self, layout: &Layout) -> Vec<u8> {
        let blocks = layout.block_count();
        let mut out = Vec::with_capacity(layout.code_len());
        out.extend((0..blocks).map(|b| self.patterns.get(b).copied().unwrap_or(0).min(40)));
        out.push(self.player_column.min(40) as u8);

        let stride = layout.enemy_stride();
        let mut odd = 0u8;
        let mut left = 0u8;
        for i in 0..ENEMY_SLOTS {
            match self.enemies.get(i) {
                Some(e) => {
                    let value = 1 + e.row * stride + e.column / 2;
                    out.push(value.min(40) as u8);
                    if e.column % 2 == 1 {
                        odd |= 1 << i;
                    }
                    if e.facing.is_left() {
                        left |= 1 << i;
                    }
                }
                None => out.push(0),
            }
        }
        out.push(odd);
        out.push(left);
        out
    }

    /// Lenient: missing symbols read as 0, enemy slots that point
    /// outside the grid are skipped.
    pub fn from_symbols(values: &[u8], layout: &Layout) -> Self {
        let blocks = layout.block_count();
        let at = |i: usize| values.get(i).copied().unwrap_or(0);
        let patterns = (0..blocks).map(at).collect();
        let player_column = at(blocks) as usize;
        let odd = at(blocks + 6);
        let left = at(blocks + 7);

        let stride = layout.enemy_stride();
        let mut enemies = Vec::new();
        for i in 0..ENEMY_SLOTS {
            let value = at(blocks + 1 + i) as usize;
            if value == 0 {
                continue;
            }
            let p = value - 1;
            let row = p / stride;
            let column = (p % stride) * 2 + ((odd >> i) & 1) as usize;
            if row >= layout.block_rows || column >= layout.columns() {
                debug!(slot = i, value, "enemy symbol outside grid, skipped");
                continue;
            }
            let facing = if (left >> i) & 1 == 1 { Facing::Left } else { Facing::Right };
            enemies.push(CodeEnemy { column, row, facing });
        }

        LevelCode { patterns, player_column, enemies, exit: ExitSlot::Derived }
    }

    pub fn to_text(&self, layout: &Layout) -> String {
        self.symbols(layout).into_iter().map(symbol_char).collect()
    }

    /// Strict parse: exact length, alphabet symbols only.
    pub fn parse(text: &str, layout: &Layout) -> Result<Self, CodeError> {
        let text = text.trim();
        let expected = layout.code_len();
        let found = text.chars().count();
        if found != expected {
            return Err(CodeError::Length { expected, found });
        }
        let values = text
            .chars()
            .enumerate()
            .map(|(index, ch)| symbol_value(ch).ok_or(CodeError::Symbol { index, ch }))
            .collect::<Result<Vec<u8>, CodeError>>()?;
        Ok(LevelCode::from_symbols(&values, layout))
    }

    /// Best-effort parse: unknown symbols read as 0, short codes are padded.
    pub fn parse_lenient(text: &str, layout: &Layout) -> Self {
        let values: Vec<u8> = text.trim().chars().map(|c| symbol_value(c).unwrap_or(0)).collect();
        LevelCode::from_symbols(&values, layout)
    }

    // ── Byte image ──

    pub fn image_len(layout: &Layout) -> usize {
        2 + layout.code_len() + 2 + 1
    }

    pub fn to_image(&self, layout: &Layout) -> Vec<u8> {
        let mut out = Vec::with_capacity(LevelCode::image_len(layout));
        out.extend_from_slice(&IMAGE_MAGIC.to_le_bytes());
        out.extend(self.symbols(layout));
        let (ex, ey) = match self.exit {
            ExitSlot::At(x, y) => (x.min(0xFD) as u8, y.min(0xFD) as u8),
            ExitSlot::Derived => (EXIT_DERIVED, EXIT_DERIVED),
            ExitSlot::Absent => (EXIT_ABSENT, EXIT_ABSENT),
        };
        out.push(ex);
        out.push(ey);
        out.push(checksum(&out));
        out
    }

    pub fn from_image(bytes: &[u8], layout: &Layout) -> Result<Self, CodeError> {
        let expected = LevelCode::image_len(layout);
        if bytes.len() < expected {
            return Err(CodeError::Truncated { expected, found: bytes.len() });
        }
        let bytes = &bytes[..expected];
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        if magic != IMAGE_MAGIC {
            return Err(CodeError::BadMagic(magic));
        }
        let (body, stored) = bytes.split_at(expected - 1);
        let computed = checksum(body);
        if stored[0] != computed {
            return Err(CodeError::BadChecksum { stored: stored[0], computed });
        }
        let len = layout.code_len();
        let mut code = LevelCode::from_symbols(&body[2..2 + len], layout);
        code.exit = match (body[2 + len], body[3 + len]) {
            (EXIT_ABSENT, EXIT_ABSENT) => ExitSlot::Absent,
            (EXIT_DERIVED, EXIT_DERIVED) => ExitSlot::Derived,
            (x, y) => ExitSlot::At(x as usize, y as usize),
        };
        Ok(code)
    }

    // ── Platform runs ──

    /// Platform membership of one platform row after normalizing every
    /// block pattern and applying edge continuations.
    pub fn row_bits(&self, layout: &Layout, row: usize) -> Vec<bool> {
        let cols = layout.block_columns;
        let mut bits = vec![false; layout.columns()];
        for bx in 0..cols {
            let raw = self.patterns.get(row * cols + bx).copied().unwrap_or(0);
            let id = normalize_pattern(raw, Neighbors::for_column(bx, cols));
            if id != raw {
                debug!(block = row * cols + bx, raw, id, "pattern normalized");
            }
            let base = bx * SEGMENT_WIDTH;
            for i in 0..SEGMENT_WIDTH {
                if pattern_cell(id, i) {
                    bits[base + i] = true;
                }
            }
            if needs_right(id) {
                bits[base + SEGMENT_WIDTH] = true;
            }
            if needs_left(id) {
                bits[base - 1] = true;
            }
        }
        bits
    }

    /// Per-block run pieces, row-major.
    pub fn platform_runs(&self, layout: &Layout) -> Vec<PlatformRun> {
        let mut runs = Vec::new();
        for row in 0..layout.block_rows {
            let bits = self.row_bits(layout, row);
            for bx in 0..layout.block_columns {
                let base = bx * SEGMENT_WIDTH;
                let end = base + SEGMENT_WIDTH;
                let mut c = base;
                while c < end {
                    if !bits[c] {
                        c += 1;
                        continue;
                    }
                    let start = c;
                    while c < end && bits[c] {
                        c += 1;
                    }
                    runs.push(PlatformRun {
                        row,
                        start,
                        len: c - start,
                        connected_left: start == base && start > 0 && bits[start - 1],
                        connected_right: c == end && bits.get(c).copied().unwrap_or(false),
                    });
                }
            }
        }
        runs
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

// ══════════════════════════════════════════════════════════════
// Encode / decode
// ══════════════════════════════════════════════════════════════

/// Scan the live map into a level code. At most `capacity` enemies
/// (and never more than the code's slots) are recorded, row-major.
pub fn encode(map: &TileMap, layout: &Layout, capacity: usize) -> LevelCode {
    let patterns = (0..layout.block_count())
        .map(|b| block_pattern(map, layout, b).id)
        .collect();
    let player_x = find_player(map, layout).unwrap_or_else(|| default_spawn(map, layout));

    let limit = capacity.min(ENEMY_SLOTS);
    let mut enemies = Vec::new();
    'rows: for row in 0..layout.block_rows {
        let y = layout.enemy_row_y(row);
        for x in layout.x_min()..=layout.x_max() {
            if let Category::Enemy(facing) = map.category(x, y) {
                if enemies.len() == limit {
                    warn!(limit, "more enemies than code slots, truncating");
                    break 'rows;
                }
                enemies.push(CodeEnemy { column: x - layout.x_min(), row, facing });
            }
        }
    }

    let exit = match find_exit(map, layout) {
        Some((x, y)) => ExitSlot::At(x, y),
        None => ExitSlot::Absent,
    };

    LevelCode {
        patterns,
        player_column: player_x - layout.x_min(),
        enemies,
        exit,
    }
}

/// Rebuild the editable area of the map from a level code.
/// Cells outside the editable area are left untouched.
pub fn decode(map: &mut TileMap, layout: &Layout, code: &LevelCode, pool: &mut EnemyPool) {
    for y in layout.editable_rows() {
        for x in layout.x_min()..=layout.x_max() {
            map.set(x, y, EMPTY);
        }
    }
    pool.clear();

    // Platforms
    for row in 0..layout.block_rows {
        let y = layout.platform_row_y(row);
        for (c, &on) in code.row_bits(layout, row).iter().enumerate() {
            if on {
                map.set(layout.x_min() + c, y, PLATFORM_MIDDLE);
            }
        }
        let dropped = rebuild_row(map, layout, y);
        if !dropped.is_empty() {
            debug!(y, ?dropped, "lone platform cells dropped");
        }
    }

    // Player
    let wanted = layout.x_min() + code.player_column;
    let player_x = if code.player_column < layout.columns() && is_valid_player_column(map, layout, wanted) {
        wanted
    } else {
        let x = default_spawn(map, layout);
        debug!(wanted = code.player_column, spawn = x - layout.x_min(), "player moved to default spawn");
        x
    };
    map.set(player_x, layout.player_row(), PLAYER);

    // Enemies
    for e in &code.enemies {
        if pool.len() == pool.capacity() {
            warn!(capacity = pool.capacity(), "enemy pool full, remaining enemies dropped");
            break;
        }
        let x = layout.x_min() + e.column;
        let y = layout.enemy_row_y(e.row);
        if e.row < layout.block_rows && validate_position(map, layout, x, y) && pool.add(x, y, e.facing).is_some() {
            map.set(x, y, enemy_tile(e.facing));
        } else {
            debug!(x, y, "enemy cannot stand here, dropped");
        }
    }

    // Exit
    let spot = match code.exit {
        ExitSlot::At(x, y) if exit_fits(map, layout, x, y) => Some((x, y)),
        ExitSlot::At(x, y) => {
            debug!(x, y, "recorded exit blocked, deriving");
            derive_exit(map, layout)
        }
        ExitSlot::Derived => derive_exit(map, layout),
        ExitSlot::Absent => None,
    };
    if let Some((x, y)) = spot {
        write_exit(map, x, y);
    }
}
