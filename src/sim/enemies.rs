/// Enemy position manager: a fixed-capacity FIFO pool.
///
/// ## Storage
///
///   - `slots`: arena of enemy records. A slot index is stable for the
///     life of the enemy and doubles as its actor id.
///   - `order`: ring of slot indices, oldest at `head`.
///
/// Both are allocated once in `new()`. When the pool is full, `add()`
/// either evicts the oldest enemy and reuses its slot (`Evict`) or
/// refuses the new one (`Reject`).

use tracing::debug;

use crate::domain::entity::{Enemy, Facing};
use crate::domain::geometry::Layout;
use crate::sim::placement::find_player;
use crate::sim::tilemap::TileMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OverflowPolicy {
    Evict,
    Reject,
}

impl OverflowPolicy {
    pub fn parse(s: &str) -> Option<OverflowPolicy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evict" | "fifo" => Some(OverflowPolicy::Evict),
            "reject" => Some(OverflowPolicy::Reject),
            _ => None,
        }
    }
}

/// Result of a successful `add()`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Placed {
    pub slot: usize,
    /// Enemy removed to make room, if the pool was full
    pub evicted: Option<Enemy>,
}

#[derive(Clone, Debug)]
pub struct EnemyPool {
    slots: Vec<Option<Enemy>>,
    order: Vec<usize>,
    head: usize,
    len: usize,
    policy: OverflowPolicy,
}

impl EnemyPool {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        EnemyPool {
            slots: vec![None; capacity],
            order: vec![0; capacity],
            head: 0,
            len: 0,
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Would `add()` succeed right now?
    pub fn accepts(&self) -> bool {
        self.capacity() > 0 && (!self.is_full() || self.policy == OverflowPolicy::Evict)
    }

    fn ring(&self, i: usize) -> usize {
        (self.head + i) % self.capacity()
    }

    pub fn add(&mut self, x: usize, y: usize, facing: Facing) -> Option<Placed> {
        if !self.accepts() {
            debug!(x, y, "enemy pool full, placement rejected");
            return None;
        }
        let mut evicted = None;
        if self.is_full() {
            let oldest = self.order[self.head];
            evicted = self.slots[oldest].take();
            self.head = (self.head + 1) % self.capacity();
            self.len -= 1;
            debug!(slot = oldest, "enemy pool full, evicting oldest");
        }
        let slot = self.slots.iter().position(|s| s.is_none())?;
        self.slots[slot] = Some(Enemy::new(x, y, facing));
        let tail = self.ring(self.len);
        self.order[tail] = slot;
        self.len += 1;
        Some(Placed { slot, evicted })
    }

    pub fn find_at(&self, x: usize, y: usize) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.map_or(false, |e| e.at(x, y)))
    }

    pub fn get(&self, slot: usize) -> Option<Enemy> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn set_facing(&mut self, slot: usize, facing: Facing) -> bool {
        match self.slots.get_mut(slot) {
            Some(Some(e)) => {
                e.facing = facing;
                true
            }
            _ => false,
        }
    }

    /// Remove the enemy at a cell. Later enemies keep their FIFO order.
    pub fn remove_at(&mut self, x: usize, y: usize) -> Option<(usize, Enemy)> {
        let slot = self.find_at(x, y)?;
        let enemy = self.slots[slot].take()?;
        let pos = (0..self.len).find(|&i| self.order[self.ring(i)] == slot)?;
        for i in pos..self.len - 1 {
            let (dst, src) = (self.ring(i), self.ring(i + 1));
            self.order[dst] = self.order[src];
        }
        self.len -= 1;
        Some((slot, enemy))
    }

    /// Fresh oldest-first scan of (slot, enemy).
    pub fn iter(&self) -> impl Iterator<Item = (usize, Enemy)> + '_ {
        (0..self.len).filter_map(move |i| {
            let slot = self.order[self.ring(i)];
            self.slots[slot].map(|e| (slot, e))
        })
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.head = 0;
        self.len = 0;
    }
}

/// Can an enemy stand at (x, y)?
///
/// The cell must be an empty enemy-row cell with a platform directly
/// below and no enemy beside it. An occupied cell covers collisions with
/// the player and the exit footprint.
pub fn validate_position(map: &TileMap, layout: &Layout, x: usize, y: usize) -> bool {
    if !layout.in_columns(x) || !layout.is_enemy_row(y) {
        return false;
    }
    if !map.is_empty(x, y) || !map.is_platform(x, y + 1) {
        return false;
    }
    let left = x > layout.x_min() && map.category(x - 1, y).is_enemy();
    let right = x < layout.x_max() && map.category(x + 1, y).is_enemy();
    !left && !right
}

/// Painting adds one rule on top of `validate_position`: the player's
/// column stays free of enemies.
pub fn can_paint_enemy(map: &TileMap, layout: &Layout, x: usize, y: usize) -> bool {
    validate_position(map, layout, x, y) && find_player(map, layout) != Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{ENEMY_RIGHT, EXIT_BOTTOM_LEFT, PLATFORM_MIDDLE, PLAYER};

    fn pool(cap: usize) -> EnemyPool {
        EnemyPool::new(cap, OverflowPolicy::Evict)
    }

    fn xs(p: &EnemyPool) -> Vec<usize> {
        p.iter().map(|(_, e)| e.x).collect()
    }

    // ── FIFO pool ──

    #[test]
    fn capacity_plus_one_evicts_first() {
        let mut p = pool(5);
        for x in 0..5 {
            assert_eq!(p.add(x, 12, Facing::Right).unwrap().evicted, None);
        }
        let placed = p.add(9, 12, Facing::Left).unwrap();
        assert_eq!(placed.evicted, Some(Enemy::new(0, 12, Facing::Right)));
        assert_eq!(placed.slot, 0);
        assert_eq!(p.len(), 5);
        assert_eq!(xs(&p), vec![1, 2, 3, 4, 9]);
    }

    #[test]
    fn reject_policy_refuses_when_full() {
        let mut p = EnemyPool::new(2, OverflowPolicy::Reject);
        assert!(p.add(0, 12, Facing::Right).is_some());
        assert!(p.add(2, 12, Facing::Right).is_some());
        assert!(!p.accepts());
        assert!(p.add(4, 12, Facing::Right).is_none());
        assert_eq!(xs(&p), vec![0, 2]);
    }

    #[test]
    fn zero_capacity_never_accepts() {
        let mut p = pool(0);
        assert!(p.add(0, 0, Facing::Left).is_none());
        assert!(p.is_empty());
    }

    #[test]
    fn remove_keeps_order_and_frees_slot() {
        let mut p = pool(4);
        for x in [10, 20, 30, 40] {
            p.add(x, 12, Facing::Right);
        }
        let (slot, e) = p.remove_at(20, 12).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(e.x, 20);
        assert_eq!(xs(&p), vec![10, 30, 40]);

        // Freed slot is reused; new enemy is youngest.
        let placed = p.add(50, 12, Facing::Right).unwrap();
        assert_eq!(placed.slot, 1);
        assert_eq!(xs(&p), vec![10, 30, 40, 50]);

        // Next overflow evicts the oldest, not the reused slot.
        let placed = p.add(60, 12, Facing::Right).unwrap();
        assert_eq!(placed.evicted.map(|e| e.x), Some(10));
        assert_eq!(xs(&p), vec![30, 40, 50, 60]);
    }

    #[test]
    fn order_survives_wraparound() {
        let mut p = pool(3);
        for x in 0..7 {
            p.add(x, 12, Facing::Right);
        }
        assert_eq!(xs(&p), vec![4, 5, 6]);
        p.remove_at(5, 12);
        p.add(7, 12, Facing::Right);
        assert_eq!(xs(&p), vec![4, 6, 7]);
    }

    #[test]
    fn remove_missing_is_none() {
        let mut p = pool(2);
        p.add(1, 12, Facing::Right);
        assert!(p.remove_at(2, 12).is_none());
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn iter_is_restartable() {
        let mut p = pool(3);
        p.add(1, 12, Facing::Right);
        p.add(3, 12, Facing::Left);
        assert_eq!(p.iter().count(), 2);
        assert_eq!(p.iter().count(), 2);
    }

    #[test]
    fn set_facing_updates_record() {
        let mut p = pool(2);
        let slot = p.add(1, 12, Facing::Right).unwrap().slot;
        assert!(p.set_facing(slot, Facing::Left));
        assert_eq!(p.get(slot).unwrap().facing, Facing::Left);
        assert!(!p.set_facing(1, Facing::Left));
    }

    #[test]
    fn policy_parse() {
        assert_eq!(OverflowPolicy::parse("Evict"), Some(OverflowPolicy::Evict));
        assert_eq!(OverflowPolicy::parse(" reject "), Some(OverflowPolicy::Reject));
        assert_eq!(OverflowPolicy::parse("drop"), None);
    }

    // ── Placement validation ──

    fn floor() -> (TileMap, Layout) {
        let layout = Layout::default();
        let mut m = TileMap::new(layout.width_bits, layout.height);
        for x in 4..=9 {
            m.set(x, 13, PLATFORM_MIDDLE);
        }
        (m, layout)
    }

    #[test]
    fn valid_on_platform() {
        let (m, l) = floor();
        assert!(validate_position(&m, &l, 5, 12));
    }

    #[test]
    fn rejects_off_platform_and_wrong_rows() {
        let (m, l) = floor();
        assert!(!validate_position(&m, &l, 12, 12)); // nothing below
        assert!(!validate_position(&m, &l, 5, 13)); // platform row
        assert!(!validate_position(&m, &l, 5, 11)); // player row
    }

    #[test]
    fn rejects_occupied_and_adjacent() {
        let (mut m, l) = floor();
        m.set(6, 12, ENEMY_RIGHT);
        m.set(9, 12, EXIT_BOTTOM_LEFT);
        assert!(!validate_position(&m, &l, 6, 12));
        assert!(!validate_position(&m, &l, 5, 12));
        assert!(!validate_position(&m, &l, 7, 12));
        assert!(validate_position(&m, &l, 4, 12));
        assert!(!validate_position(&m, &l, 9, 12));
    }

    #[test]
    fn painting_keeps_player_column_clear() {
        let (mut m, l) = floor();
        m.set(5, 11, PLAYER);
        assert!(validate_position(&m, &l, 5, 12));
        assert!(!can_paint_enemy(&m, &l, 5, 12));
        assert!(can_paint_enemy(&m, &l, 6, 12));
    }
}
