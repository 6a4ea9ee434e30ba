/// Level geometry: where the editable area sits in the tile map.
///
/// ## Block grid
///
/// The editable area is a grid of blocks, each `SEGMENT_WIDTH` columns by
/// `SEGMENT_HEIGHT` rows. The top row of a block is its enemy row; the
/// bottom row is its platform row. The player row sits directly above the
/// first block row.
///
/// ```text
///   y = origin_y - 1   P . . . . . . . . .   player row
///   y = origin_y       . . > . . . . . . .   enemy row     ┐ block row 0
///   y = origin_y + 1   . [ = ] . . . [ ] .   platform row  ┘
///   y = origin_y + 2   . . . . . . . . . .   enemy row     ┐ block row 1
///   ...
/// ```
///
/// Map storage is flat: cell (x, y) lives at `(y << width_bits) + x`.

/// Columns per block. Fixed by the 5-bit pattern table.
pub const SEGMENT_WIDTH: usize = 5;
/// Rows per block: one enemy row above one platform row.
pub const SEGMENT_HEIGHT: usize = 2;

/// Largest enemy position value the 41-symbol alphabet can carry.
const MAX_ENEMY_POSITION: usize = 40;
/// Player column must fit in one symbol of the alphabet.
const MAX_COLUMNS: usize = 36;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub width_bits: u8,
    pub height: usize,
    /// First editable column
    pub origin_x: usize,
    /// First enemy row; the player row is `origin_y - 1`
    pub origin_y: usize,
    pub block_columns: usize,
    pub block_rows: usize,
    /// Longest platform run before it is split
    pub max_run: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            width_bits: 5,
            height: 20,
            origin_x: 2,
            origin_y: 12,
            block_columns: 4,
            block_rows: 4,
            max_run: 8,
        }
    }
}

impl Layout {
    pub fn width(&self) -> usize {
        1usize << self.width_bits
    }

    /// Editable columns.
    pub fn columns(&self) -> usize {
        self.block_columns * SEGMENT_WIDTH
    }

    pub fn x_min(&self) -> usize {
        self.origin_x
    }

    pub fn x_max(&self) -> usize {
        self.origin_x + self.columns() - 1
    }

    pub fn y_min(&self) -> usize {
        self.origin_y
    }

    pub fn y_max(&self) -> usize {
        self.origin_y + self.block_rows * SEGMENT_HEIGHT - 1
    }

    pub fn player_row(&self) -> usize {
        self.origin_y - 1
    }

    pub fn block_count(&self) -> usize {
        self.block_columns * self.block_rows
    }

    /// Half-width used by the enemy position encoding.
    pub fn enemy_stride(&self) -> usize {
        (self.columns() + 1) / 2
    }

    pub fn in_columns(&self, x: usize) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }

    /// Inside the block grid (enemy and platform rows).
    pub fn in_area(&self, x: usize, y: usize) -> bool {
        self.in_columns(x) && y >= self.y_min() && y <= self.y_max()
    }

    pub fn is_platform_row(&self, y: usize) -> bool {
        y >= self.y_min() && y <= self.y_max() && (y - self.origin_y) % SEGMENT_HEIGHT == 1
    }

    pub fn is_enemy_row(&self, y: usize) -> bool {
        y >= self.y_min() && y <= self.y_max() && (y - self.origin_y) % SEGMENT_HEIGHT == 0
    }

    /// Enemy row index (0-based block row) for a map row.
    pub fn enemy_row_index(&self, y: usize) -> Option<usize> {
        if self.is_enemy_row(y) {
            Some((y - self.origin_y) / SEGMENT_HEIGHT)
        } else {
            None
        }
    }

    pub fn enemy_row_y(&self, row: usize) -> usize {
        self.origin_y + row * SEGMENT_HEIGHT
    }

    pub fn platform_row_y(&self, row: usize) -> usize {
        self.enemy_row_y(row) + 1
    }

    /// Top-left cell (on the enemy row) of a block.
    pub fn block_origin(&self, block: usize) -> (usize, usize) {
        let bx = block % self.block_columns;
        let by = block / self.block_columns;
        (self.origin_x + bx * SEGMENT_WIDTH, self.origin_y + by * SEGMENT_HEIGHT)
    }

    /// Block containing a cell, if the cell is inside the block grid.
    pub fn block_of(&self, x: usize, y: usize) -> Option<usize> {
        if !self.in_area(x, y) {
            return None;
        }
        let bx = (x - self.origin_x) / SEGMENT_WIDTH;
        let by = (y - self.origin_y) / SEGMENT_HEIGHT;
        Some(by * self.block_columns + bx)
    }

    pub fn block_column(&self, block: usize) -> usize {
        block % self.block_columns
    }

    /// Rows touched by editing: player row through the last platform row.
    pub fn editable_rows(&self) -> std::ops::RangeInclusive<usize> {
        self.player_row()..=self.y_max()
    }

    /// Textual level code length: one symbol per block plus player,
    /// five enemy slots and two masks.
    pub fn code_len(&self) -> usize {
        self.block_count() + 8
    }

    /// Check that the editable area fits the map and the code alphabet.
    pub fn validate(&self) -> Result<(), String> {
        if self.width_bits == 0 || self.width_bits > 8 {
            return Err(format!("width_bits {} out of range 1..=8", self.width_bits));
        }
        if self.origin_y == 0 {
            return Err("origin_y must leave room for the player row".into());
        }
        if self.block_columns == 0 || self.block_rows == 0 {
            return Err("block grid must not be empty".into());
        }
        if self.x_max() >= self.width() {
            return Err(format!(
                "editable columns end at {} but the map is {} wide",
                self.x_max(),
                self.width()
            ));
        }
        if self.y_max() >= self.height {
            return Err(format!(
                "editable rows end at {} but the map is {} tall",
                self.y_max(),
                self.height
            ));
        }
        if self.columns() > MAX_COLUMNS {
            return Err(format!("{} columns exceed the player symbol range", self.columns()));
        }
        if self.block_rows * self.enemy_stride() > MAX_ENEMY_POSITION {
            return Err("enemy positions exceed the code alphabet".into());
        }
        if self.max_run < 2 {
            return Err("max_run must be at least 2".into());
        }
        Ok(())
    }
}
