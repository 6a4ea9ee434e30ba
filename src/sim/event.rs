/// Actor events emitted during an edit.
/// The host drains these after each operation to sync its sprites.

use crate::domain::entity::Facing;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorEvent {
    PlayerMoved { x: usize, y: usize },
    PlayerHidden,
    EnemyActivated { slot: usize, x: usize, y: usize, facing: Facing },
    EnemyFacing { slot: usize, facing: Facing },
    EnemyDeactivated { slot: usize },
    ExitMoved { x: usize, y: usize },
    ExitHidden,
}
