/// Editor entities: facing, brushes and enemy records.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn is_left(self) -> bool {
        matches!(self, Facing::Left)
    }
}

/// What a paint call intends to place.
///
/// `Auto` reproduces the single-button editor: each click on a cell
/// advances it through player / enemy / platform states. Every other
/// brush is explicit and idempotent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Brush {
    Auto,
    Platform,
    Enemy(Facing),
    Exit,
    Player,
    Erase,
}

impl Brush {
    /// Decode a host brush code. Unknown codes map to `Auto`.
    pub fn from_code(code: i16) -> Brush {
        match code {
            1 => Brush::Platform,
            2 => Brush::Enemy(Facing::Right),
            3 => Brush::Enemy(Facing::Left),
            4 => Brush::Exit,
            5 => Brush::Player,
            6 => Brush::Erase,
            _ => Brush::Auto,
        }
    }
}

/// Preview of what an `Auto` click on a cell would do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BrushAction {
    Player,
    EnemyRight,
    EnemyLeft,
    Delete,
    /// New cell becomes the left end of the run to its right
    PlatformLeft,
    /// New cell becomes the right end of the run to its left
    PlatformRight,
    /// New two-cell platform
    PlatformNew,
    /// Click does nothing
    Default,
}

impl BrushAction {
    pub fn code(self) -> u8 {
        match self {
            BrushAction::Default => 0,
            BrushAction::Player => 1,
            BrushAction::EnemyRight => 2,
            BrushAction::EnemyLeft => 3,
            BrushAction::Delete => 4,
            BrushAction::PlatformLeft => 5,
            BrushAction::PlatformRight => 6,
            BrushAction::PlatformNew => 7,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Enemy {
    pub x: usize,
    pub y: usize,
    pub facing: Facing,
}

impl Enemy {
    pub fn new(x: usize, y: usize, facing: Facing) -> Self {
        Enemy { x, y, facing }
    }

    pub fn at(&self, x: usize, y: usize) -> bool {
        self.x == x && self.y == y
    }
}
