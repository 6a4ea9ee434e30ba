/// Metatile ids and their semantic categories.
/// Category queries are methods, not stored flags,
/// so tile semantics are centralized here.

use super::entity::Facing;

pub type TileId = u8;

// ── Metatile ids ──

pub const EMPTY: TileId = 0;
pub const PLATFORM_LEFT: TileId = 4;
pub const PLATFORM_MIDDLE: TileId = 5;
pub const PLATFORM_RIGHT: TileId = 6;
pub const EXIT_TOP_LEFT: TileId = 16;
pub const EXIT_TOP_RIGHT: TileId = 17;
pub const PLAYER: TileId = 20;
pub const ENEMY_RIGHT: TileId = 21;
pub const ENEMY_LEFT: TileId = 22;
pub const EXIT_BOTTOM_LEFT: TileId = 32;
pub const EXIT_BOTTOM_RIGHT: TileId = 33;

/// Generic solid used for map decoration outside the editable area.
pub const WALL: TileId = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ExitCorner {
    pub fn tile(self) -> TileId {
        match self {
            ExitCorner::TopLeft => EXIT_TOP_LEFT,
            ExitCorner::TopRight => EXIT_TOP_RIGHT,
            ExitCorner::BottomLeft => EXIT_BOTTOM_LEFT,
            ExitCorner::BottomRight => EXIT_BOTTOM_RIGHT,
        }
    }

    /// Offset of this corner from the exit's bottom-left cell.
    pub fn offset(self) -> (usize, usize) {
        match self {
            ExitCorner::TopLeft => (0, 1),
            ExitCorner::TopRight => (1, 1),
            ExitCorner::BottomLeft => (0, 0),
            ExitCorner::BottomRight => (1, 0),
        }
    }

    pub const ALL: [ExitCorner; 4] = [
        ExitCorner::TopLeft,
        ExitCorner::TopRight,
        ExitCorner::BottomLeft,
        ExitCorner::BottomRight,
    ];
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Category {
    Empty,
    Platform,
    Enemy(Facing),
    Exit(ExitCorner),
    Player,
    Other,
}

impl Category {
    pub fn is_empty(self) -> bool {
        matches!(self, Category::Empty)
    }

    pub fn is_platform(self) -> bool {
        matches!(self, Category::Platform)
    }

    pub fn is_enemy(self) -> bool {
        matches!(self, Category::Enemy(_))
    }

    pub fn is_exit(self) -> bool {
        matches!(self, Category::Exit(_))
    }

    pub fn is_player(self) -> bool {
        matches!(self, Category::Player)
    }

    /// Numeric code handed to script hosts (brush tile query).
    pub fn code(self) -> u8 {
        match self {
            Category::Empty => 0,
            Category::Platform => 1,
            Category::Enemy(Facing::Right) => 2,
            Category::Enemy(Facing::Left) => 3,
            Category::Exit(_) => 4,
            Category::Player => 5,
            Category::Other => 6,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Empty
    }
}

/// Classify a raw metatile id. Total: unknown ids are `Other`.
pub fn classify(id: TileId) -> Category {
    match id {
        EMPTY => Category::Empty,
        PLATFORM_LEFT | PLATFORM_MIDDLE | PLATFORM_RIGHT => Category::Platform,
        ENEMY_RIGHT => Category::Enemy(Facing::Right),
        ENEMY_LEFT => Category::Enemy(Facing::Left),
        EXIT_TOP_LEFT => Category::Exit(ExitCorner::TopLeft),
        EXIT_TOP_RIGHT => Category::Exit(ExitCorner::TopRight),
        EXIT_BOTTOM_LEFT => Category::Exit(ExitCorner::BottomLeft),
        EXIT_BOTTOM_RIGHT => Category::Exit(ExitCorner::BottomRight),
        PLAYER => Category::Player,
        _ => Category::Other,
    }
}

pub fn enemy_tile(facing: Facing) -> TileId {
    match facing {
        Facing::Left => ENEMY_LEFT,
        Facing::Right => ENEMY_RIGHT,
    }
}

// ── ASCII glyphs (CLI output and test diagrams) ──

pub fn glyph(id: TileId) -> char {
    match id {
        EMPTY => '.',
        PLATFORM_LEFT => '[',
        PLATFORM_MIDDLE => '=',
        PLATFORM_RIGHT => ']',
        PLAYER => 'P',
        ENEMY_RIGHT => '>',
        ENEMY_LEFT => '<',
        EXIT_TOP_LEFT => '/',
        EXIT_TOP_RIGHT => '\\',
        EXIT_BOTTOM_LEFT => '|',
        EXIT_BOTTOM_RIGHT => '!',
        _ => '#',
    }
}

pub fn from_glyph(c: char) -> TileId {
    match c {
        '[' => PLATFORM_LEFT,
        '=' => PLATFORM_MIDDLE,
        ']' => PLATFORM_RIGHT,
        'P' => PLAYER,
        '>' => ENEMY_RIGHT,
        '<' => ENEMY_LEFT,
        '/' => EXIT_TOP_LEFT,
        '\\' => EXIT_TOP_RIGHT,
        '|' => EXIT_BOTTOM_LEFT,
        '!' => EXIT_BOTTOM_RIGHT,
        '#' => WALL,
        _ => EMPTY,
    }
}
