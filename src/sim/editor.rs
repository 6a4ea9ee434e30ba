/// EditorState: the complete editing context for one level.
///
/// ## Operation shape
///
/// Every mutating entry point runs the same sequence:
///   1. mutate the tile map (and the enemy pool)
///   2. `commit()`: turn the map's change journal into dirty cells, bring
///      the level code up to date, mark the code symbols that changed
///   3. queue actor events for whatever moved
///
/// The map and the level code are complete before any event is queued or
/// any redraw is issued. Redraw is not part of the state: `Editor` pairs
/// the state with a `TileDisplay` and flushes pending chunks after each
/// operation unless display suppression is on.
///
/// ## Auto click cycle
///
/// ┌──────────────────────────────┬───────────────────────────────┐
/// │ Cell                          │ Click                         │
/// ├──────────────────────────────┼───────────────────────────────┤
/// │ player row, paintable         │ move player here              │
/// │ enemy facing right            │ turn left                     │
/// │ enemy facing left             │ remove                        │
/// │ empty, enemy can stand        │ enemy facing right            │
/// │ platform                      │ remove (and cascade)          │
/// │ empty platform-row cell       │ join run / new two-cell run   │
/// │ anything else                 │ nothing                       │
/// └──────────────────────────────┴───────────────────────────────┘

use std::io;

use tracing::{debug, info, warn};

use crate::domain::entity::{Brush, BrushAction, Facing};
use crate::domain::geometry::{Layout, SEGMENT_WIDTH};
use crate::domain::pattern::{
    needs_left, needs_right, next_valid_pattern, normalize_pattern, pattern_cell,
    previous_valid_pattern, Neighbors, DEFAULT_PATTERN,
};
use crate::domain::tile::{enemy_tile, Category, EMPTY, PLATFORM_MIDDLE, PLAYER};
use crate::sim::code::{decode, encode, CodeEnemy, ExitSlot, LevelCode, ENEMY_SLOTS};
use crate::sim::dirty::DirtyTracker;
use crate::sim::display::TileDisplay;
use crate::sim::enemies::{can_paint_enemy, EnemyPool, OverflowPolicy};
use crate::sim::event::ActorEvent;
use crate::sim::extract::block_pattern;
use crate::sim::placement::{
    can_paint_player, clear_exit, default_spawn, exit_fits, exit_supported, find_exit, find_player,
    is_valid_player_column, nearest_valid_column, relocate_exit, write_exit,
};
use crate::sim::platform::{can_place, place_platform, rebuild_row, remove_platform, Placement};
use crate::sim::tilemap::TileMap;

const SYMBOL_RANGE: i32 = 41;

#[derive(Clone, Debug)]
pub struct EditorState {
    layout: Layout,
    map: TileMap,
    code: LevelCode,
    enemies: EnemyPool,
    /// Dirty map cells, by map index
    cells: DirtyTracker,
    /// Dirty code symbols; symbol `b < blocks` is block `b`
    symbols: DirtyTracker,
    suppress_display: bool,
    full_redraw: bool,
    /// Code symbols as of the last commit
    shown: Vec<u8>,
    events: Vec<ActorEvent>,
    player_at: Option<(usize, usize)>,
    exit_at: Option<(usize, usize)>,
}

impl EditorState {
    /// Fresh editor over an empty map, loaded with the empty level.
    pub fn new(layout: Layout, capacity: usize, policy: OverflowPolicy) -> Self {
        let map = TileMap::new(layout.width_bits, layout.height);
        let mut state = EditorState::with_map(layout, map, capacity, policy);
        state.load_code(&LevelCode::empty(&layout));
        state
    }

    /// Adopt an existing map buffer. Cells outside the editable area are
    /// kept; the editable area is normalized by re-decoding what it holds.
    pub fn from_map(layout: Layout, map: TileMap, capacity: usize, policy: OverflowPolicy) -> Self {
        let code = encode(&map, &layout, capacity.min(ENEMY_SLOTS));
        let mut state = EditorState::with_map(layout, map, capacity, policy);
        state.load_code(&code);
        state
    }

    fn with_map(layout: Layout, map: TileMap, capacity: usize, policy: OverflowPolicy) -> Self {
        if capacity > ENEMY_SLOTS {
            warn!(capacity, slots = ENEMY_SLOTS, "enemy capacity exceeds level code slots, clamping");
        }
        let capacity = capacity.min(ENEMY_SLOTS);
        let code_len = layout.code_len();
        let cell_count = map.as_bytes().len();
        EditorState {
            layout,
            map,
            code: LevelCode::empty(&layout),
            enemies: EnemyPool::new(capacity, policy),
            cells: DirtyTracker::new(cell_count),
            symbols: DirtyTracker::new(code_len),
            suppress_display: false,
            full_redraw: false,
            shown: vec![0; code_len],
            events: Vec::new(),
            player_at: None,
            exit_at: None,
        }
    }

    // ── Accessors ──

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn code(&self) -> &LevelCode {
        &self.code
    }

    pub fn code_text(&self) -> String {
        self.code.to_text(&self.layout)
    }

    pub fn enemies(&self) -> &EnemyPool {
        &self.enemies
    }

    /// Pure query: category of the cell under the brush.
    pub fn brush_tile(&self, x: usize, y: usize) -> Category {
        self.map.category(x, y)
    }

    // ── Load / reset ──

    /// Replace the editable area with a level code.
    pub fn load_code(&mut self, code: &LevelCode) {
        let old_slots: Vec<usize> = self.enemies.iter().map(|(slot, _)| slot).collect();
        decode(&mut self.map, &self.layout, code, &mut self.enemies);
        self.code = code.clone();
        self.code.patterns.resize(self.layout.block_count(), DEFAULT_PATTERN);

        for slot in old_slots {
            self.events.push(ActorEvent::EnemyDeactivated { slot });
        }
        let placed: Vec<ActorEvent> = self
            .enemies
            .iter()
            .map(|(slot, e)| ActorEvent::EnemyActivated { slot, x: e.x, y: e.y, facing: e.facing })
            .collect();
        self.events.extend(placed);

        self.full_redraw = true;
        self.commit();
        info!(code = %self.code_text(), enemies = self.enemies.len(), "level loaded");
    }

    pub fn load_text(&mut self, text: &str) {
        let code = LevelCode::parse_lenient(text, &self.layout);
        self.load_code(&code);
    }

    pub fn reset(&mut self) {
        self.symbols.clear_all_suppression();
        self.cells.clear_all_suppression();
        self.load_code(&LevelCode::empty(&self.layout));
    }

    /// Snapshot the live map as a level code.
    pub fn encode(&self) -> LevelCode {
        encode(&self.map, &self.layout, self.enemies.capacity())
    }

    // ── Painting ──

    /// Apply a brush at (x, y). Returns true if any cell changed.
    pub fn paint(&mut self, x: usize, y: usize, brush: Brush) -> bool {
        match brush {
            Brush::Auto => self.auto_click(x, y),
            Brush::Platform => self.paint_platform(x, y),
            Brush::Enemy(facing) => self.paint_enemy(x, y, facing),
            Brush::Exit => self.paint_exit(x, y),
            Brush::Player => self.paint_player(x, y),
            Brush::Erase => self.erase_cell(x, y),
        };
        self.commit()
    }

    pub fn erase(&mut self, x: usize, y: usize) -> bool {
        self.paint(x, y, Brush::Erase)
    }

    /// What an `Auto` click on (x, y) would do.
    pub fn brush_preview(&self, x: usize, y: usize) -> BrushAction {
        let layout = &self.layout;
        if y == layout.player_row() {
            let paintable = self.map.is_empty(x, y) && can_paint_player(&self.map, layout, x, y);
            return if paintable { BrushAction::Player } else { BrushAction::Default };
        }
        match self.map.category(x, y) {
            Category::Enemy(Facing::Right) => BrushAction::EnemyLeft,
            Category::Enemy(Facing::Left) | Category::Platform => BrushAction::Delete,
            Category::Empty if can_paint_enemy(&self.map, layout, x, y) => BrushAction::EnemyRight,
            Category::Empty => match can_place(&self.map, layout, x, y) {
                Some(Placement::Pair) => BrushAction::PlatformNew,
                Some(Placement::Join) if x > layout.x_min() && self.map.is_platform(x - 1, y) => {
                    BrushAction::PlatformRight
                }
                Some(Placement::Join) => BrushAction::PlatformLeft,
                None => BrushAction::Default,
            },
            _ => BrushAction::Default,
        }
    }

    fn auto_click(&mut self, x: usize, y: usize) -> bool {
        match self.brush_preview(x, y) {
            BrushAction::Player => self.paint_player(x, y),
            BrushAction::EnemyRight => self.paint_enemy(x, y, Facing::Right),
            BrushAction::EnemyLeft => self.paint_enemy(x, y, Facing::Left),
            BrushAction::Delete => self.erase_cell(x, y),
            BrushAction::PlatformLeft | BrushAction::PlatformRight | BrushAction::PlatformNew => {
                self.paint_platform(x, y)
            }
            BrushAction::Default => false,
        }
    }

    fn paint_platform(&mut self, x: usize, y: usize) -> bool {
        if self.map.is_platform(x, y) {
            return false;
        }
        let placed = place_platform(&mut self.map, &self.layout, x, y);
        if placed {
            self.after_platform_change(y, &[]);
        } else {
            debug!(x, y, "platform placement denied");
        }
        placed
    }

    fn paint_enemy(&mut self, x: usize, y: usize, facing: Facing) -> bool {
        if let Some(slot) = self.enemies.find_at(x, y) {
            if self.map.category(x, y) == Category::Enemy(facing) {
                return false;
            }
            self.enemies.set_facing(slot, facing);
            self.map.set(x, y, enemy_tile(facing));
            self.events.push(ActorEvent::EnemyFacing { slot, facing });
            return true;
        }
        if !can_paint_enemy(&self.map, &self.layout, x, y) {
            debug!(x, y, "enemy placement denied");
            return false;
        }
        let Some(placed) = self.enemies.add(x, y, facing) else {
            return false;
        };
        if let Some(old) = placed.evicted {
            self.map.set(old.x, old.y, EMPTY);
            self.events.push(ActorEvent::EnemyDeactivated { slot: placed.slot });
        }
        self.map.set(x, y, enemy_tile(facing));
        self.events.push(ActorEvent::EnemyActivated { slot: placed.slot, x, y, facing });
        true
    }

    fn paint_player(&mut self, x: usize, y: usize) -> bool {
        if find_player(&self.map, &self.layout) == Some(x) || !can_paint_player(&self.map, &self.layout, x, y) {
            return false;
        }
        self.move_player(x);
        true
    }

    fn move_player(&mut self, x: usize) {
        let y = self.layout.player_row();
        if let Some(px) = find_player(&self.map, &self.layout) {
            self.map.set(px, y, EMPTY);
        }
        self.map.set(x, y, PLAYER);
        relocate_exit(&mut self.map, &self.layout);
    }

    fn paint_exit(&mut self, x: usize, y: usize) -> bool {
        let current = find_exit(&self.map, &self.layout);
        if current == Some((x, y)) {
            return false;
        }
        if !self.layout.is_enemy_row(y) || !exit_supported(&self.map, x, y) {
            return false;
        }
        if let Some((cx, cy)) = current {
            clear_exit(&mut self.map, cx, cy);
        }
        if exit_fits(&self.map, &self.layout, x, y) {
            write_exit(&mut self.map, x, y);
            return true;
        }
        if let Some((cx, cy)) = current {
            write_exit(&mut self.map, cx, cy);
        }
        debug!(x, y, "exit does not fit");
        false
    }

    fn erase_cell(&mut self, x: usize, y: usize) -> bool {
        match self.map.category(x, y) {
            Category::Platform => self.remove_platform_at(x, y),
            Category::Enemy(_) => self.remove_enemy_at(x, y),
            Category::Player if self.layout.in_columns(x) => self.map.set(x, y, EMPTY),
            Category::Exit(_) => match find_exit(&self.map, &self.layout) {
                Some((ex, ey)) => {
                    clear_exit(&mut self.map, ex, ey);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn remove_enemy_at(&mut self, x: usize, y: usize) -> bool {
        match self.enemies.remove_at(x, y) {
            Some((slot, _)) => {
                self.map.set(x, y, EMPTY);
                self.events.push(ActorEvent::EnemyDeactivated { slot });
                true
            }
            None => false,
        }
    }

    fn remove_platform_at(&mut self, x: usize, y: usize) -> bool {
        let removed = remove_platform(&mut self.map, &self.layout, x, y);
        if removed.is_empty() {
            return false;
        }
        self.after_platform_change(y, &removed);
        true
    }

    /// Cascade after platform cells in row `y` appeared or disappeared
    /// (`removed` lists the latter). A player standing over no platform
    /// goes to the default spawn and the exit follows.
    fn after_platform_change(&mut self, y: usize, removed: &[usize]) {
        let above = y - 1;
        for &x in removed {
            if self.remove_enemy_at(x, above) {
                debug!(x, y = above, "enemy lost its platform");
            }
        }

        let mut player_moved = false;
        if let Some(px) = find_player(&self.map, &self.layout) {
            let spawn = default_spawn(&self.map, &self.layout);
            if !is_valid_player_column(&self.map, &self.layout, px) && spawn != px {
                self.map.set(px, self.layout.player_row(), EMPTY);
                self.map.set(spawn, self.layout.player_row(), PLAYER);
                debug!(from = px, to = spawn, "player moved to the default spawn");
                player_moved = true;
            }
        }

        let footing_lost = find_exit(&self.map, &self.layout)
            .map_or(false, |(ex, ey)| !exit_supported(&self.map, ex, ey));
        if player_moved || footing_lost {
            relocate_exit(&mut self.map, &self.layout);
        }
    }

    // ── Code editing ──

    /// Edit one symbol of the level code and apply it to the map.
    /// Returns true if any cell changed.
    pub fn set_code_symbol(&mut self, index: usize, value: u8) -> bool {
        let blocks = self.layout.block_count();
        if index < blocks {
            self.apply_pattern(index, value);
        } else if index == blocks {
            self.apply_player_column(value as usize);
        } else if index < self.layout.code_len() {
            let mut symbols = self.shown.clone();
            symbols[index] = value;
            self.apply_enemy_symbols(&symbols);
        } else {
            return false;
        }
        self.commit()
    }

    /// Step a symbol. Pattern symbols skip patterns that are illegal for
    /// the block; the player symbol skips columns the player cannot use.
    pub fn cycle_code_symbol(&mut self, index: usize, step: i32) -> bool {
        let blocks = self.layout.block_count();
        if index < blocks {
            let neighbors = self.block_neighbors(index);
            let current = self.code.patterns[index];
            let next = if step >= 0 {
                next_valid_pattern(current, neighbors)
            } else {
                previous_valid_pattern(current, neighbors)
            };
            return self.set_code_symbol(index, next);
        }
        if index == blocks {
            return match self.step_player_column(step) {
                Some(column) => self.set_code_symbol(index, column as u8),
                None => false,
            };
        }
        match self.shown.get(index) {
            Some(&v) => {
                let next = (v as i32 + step).rem_euclid(SYMBOL_RANGE) as u8;
                self.set_code_symbol(index, next)
            }
            None => false,
        }
    }

    pub fn debug_next_pattern(&mut self, block: usize) -> bool {
        block < self.layout.block_count() && self.cycle_code_symbol(block, 1)
    }

    pub fn debug_previous_pattern(&mut self, block: usize) -> bool {
        block < self.layout.block_count() && self.cycle_code_symbol(block, -1)
    }

    pub fn debug_reset_pattern(&mut self, block: usize) -> bool {
        block < self.layout.block_count() && self.set_code_symbol(block, DEFAULT_PATTERN)
    }

    fn block_neighbors(&self, block: usize) -> Neighbors {
        Neighbors::for_column(self.layout.block_column(block), self.layout.block_columns)
    }

    /// Rewrite one block's platform row from a pattern, forcing the cells
    /// its edge continuations need in the neighbor blocks.
    fn apply_pattern(&mut self, block: usize, raw: u8) {
        let layout = self.layout;
        let id = normalize_pattern(raw, self.block_neighbors(block));
        if id != raw {
            debug!(block, raw, id, "pattern corrected for block position");
        }
        self.code.patterns[block] = id;

        let (x0, ey) = layout.block_origin(block);
        let y = ey + 1;
        let before: Vec<bool> = (layout.x_min()..=layout.x_max())
            .map(|x| self.map.is_platform(x, y))
            .collect();

        for i in 0..SEGMENT_WIDTH {
            self.set_platform_cell(x0 + i, y, pattern_cell(id, i));
        }
        if needs_left(id) {
            self.set_platform_cell(x0 - 1, y, true);
        }
        if needs_right(id) {
            self.set_platform_cell(x0 + SEGMENT_WIDTH, y, true);
        }
        rebuild_row(&mut self.map, &layout, y);

        let removed: Vec<usize> = (layout.x_min()..=layout.x_max())
            .filter(|&x| before[x - layout.x_min()] && !self.map.is_platform(x, y))
            .collect();
        self.after_platform_change(y, &removed);
    }

    /// Only empty and platform cells are rewritten; the exit footprint stays.
    fn set_platform_cell(&mut self, x: usize, y: usize, on: bool) {
        match self.map.category(x, y) {
            Category::Empty if on => {
                self.map.set(x, y, PLATFORM_MIDDLE);
            }
            Category::Platform if !on => {
                self.map.set(x, y, EMPTY);
            }
            _ => {}
        }
    }

    fn apply_player_column(&mut self, column: usize) {
        let wanted = self.layout.x_min() + column.min(self.layout.columns() - 1);
        match nearest_valid_column(&self.map, &self.layout, wanted) {
            Some(x) if find_player(&self.map, &self.layout) != Some(x) => self.move_player(x),
            Some(_) => {}
            None => debug!(column, "no column can take the player"),
        }
    }

    /// Next paintable player column in the direction of `step`, wrapping.
    fn step_player_column(&self, step: i32) -> Option<usize> {
        let columns = self.layout.columns() as i32;
        let current = self.code.player_column as i32;
        let dir = if step >= 0 { 1 } else { -1 };
        (1..columns)
            .map(|k| (current + dir * k).rem_euclid(columns) as usize)
            .find(|&c| {
                can_paint_player(&self.map, &self.layout, self.layout.x_min() + c, self.layout.player_row())
            })
    }

    /// Replace the enemy list with the one the symbols describe.
    fn apply_enemy_symbols(&mut self, symbols: &[u8]) {
        let wanted = LevelCode::from_symbols(symbols, &self.layout).enemies;
        let current: Vec<(usize, usize)> = self.enemies.iter().map(|(_, e)| (e.x, e.y)).collect();
        for (x, y) in current {
            self.remove_enemy_at(x, y);
        }
        for e in wanted {
            let x = self.layout.x_min() + e.column;
            let y = self.layout.enemy_row_y(e.row);
            if !self.paint_enemy(x, y, e.facing) {
                debug!(x, y, "enemy from code cannot stand, skipped");
            }
        }
    }

    // ── Suppression ──

    pub fn set_suppress_display(&mut self, on: bool) {
        self.suppress_display = on;
    }

    pub fn suppress_display(&self) -> bool {
        self.suppress_display
    }

    /// Freeze one code symbol: it is neither redrawn nor, for block
    /// symbols, re-extracted from the map.
    pub fn suppress_symbol(&mut self, index: usize) {
        self.symbols.suppress(index);
    }

    pub fn enable_symbol(&mut self, index: usize) {
        self.symbols.enable(index);
        self.sync_code();
    }

    pub fn is_symbol_suppressed(&self, index: usize) -> bool {
        self.symbols.is_suppressed(index)
    }

    pub fn suppress_cell(&mut self, x: usize, y: usize) {
        if let Some(i) = self.map.index(x, y) {
            self.cells.suppress(i);
        }
    }

    pub fn enable_cell(&mut self, x: usize, y: usize) {
        if let Some(i) = self.map.index(x, y) {
            self.cells.enable(i);
        }
    }

    pub fn clear_all_suppression(&mut self) {
        self.cells.clear_all_suppression();
        self.symbols.clear_all_suppression();
        self.sync_code();
    }

    /// Mark every code symbol for redraw.
    pub fn mark_code(&mut self) {
        for i in 0..self.symbols.len() {
            self.symbols.mark(i);
        }
    }

    // ── Commit ──

    /// Fold the map journal into dirty cells, sync the code, queue
    /// player and exit events. Returns true if any cell changed.
    fn commit(&mut self) -> bool {
        let changes = self.map.take_changes();
        for &(x, y) in &changes {
            if let Some(i) = self.map.index(x, y) {
                self.cells.mark(i);
            }
        }
        self.sync_code();
        self.sync_actors();
        !changes.is_empty()
    }

    fn sync_code(&mut self) {
        let layout = self.layout;
        for block in 0..layout.block_count() {
            if !self.symbols.is_suppressed(block) {
                self.code.patterns[block] = block_pattern(&self.map, &layout, block).id;
            }
        }
        let px = find_player(&self.map, &layout).unwrap_or_else(|| default_spawn(&self.map, &layout));
        self.code.player_column = px - layout.x_min();
        self.code.enemies = self
            .enemies
            .iter()
            .map(|(_, e)| CodeEnemy {
                column: e.x - layout.x_min(),
                row: layout.enemy_row_index(e.y).unwrap_or(0),
                facing: e.facing,
            })
            .collect();
        self.code.exit = match find_exit(&self.map, &layout) {
            Some((x, y)) => ExitSlot::At(x, y),
            None => ExitSlot::Absent,
        };

        let symbols = self.code.symbols(&layout);
        for (i, (&new, old)) in symbols.iter().zip(self.shown.iter_mut()).enumerate() {
            if new != *old {
                *old = new;
                self.symbols.mark(i);
            }
        }
    }

    fn sync_actors(&mut self) {
        let player = find_player(&self.map, &self.layout).map(|x| (x, self.layout.player_row()));
        if player != self.player_at {
            self.events.push(match player {
                Some((x, y)) => ActorEvent::PlayerMoved { x, y },
                None => ActorEvent::PlayerHidden,
            });
            self.player_at = player;
        }
        let exit = find_exit(&self.map, &self.layout);
        if exit != self.exit_at {
            self.events.push(match exit {
                Some((x, y)) => ActorEvent::ExitMoved { x, y },
                None => ActorEvent::ExitHidden,
            });
            self.exit_at = exit;
        }
    }

    // ── Redraw bookkeeping ──

    pub fn drain_events(&mut self) -> Vec<ActorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Marked, non-suppressed cells; their marks are cleared.
    pub fn take_pending_cells(&mut self) -> Vec<(usize, usize)> {
        self.cells
            .take_pending()
            .into_iter()
            .map(|i| self.map.position(i))
            .collect()
    }

    pub fn take_pending_symbols(&mut self) -> Vec<usize> {
        self.symbols.take_pending()
    }

    pub fn pending_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .marked()
            .into_iter()
            .filter(|&i| !self.cells.is_suppressed(i))
            .map(|i| self.map.position(i))
            .collect()
    }

    fn take_full_redraw(&mut self) -> bool {
        std::mem::take(&mut self.full_redraw)
    }
}

// ══════════════════════════════════════════════════════════════
// Editor: state + display
// ══════════════════════════════════════════════════════════════

pub struct Editor<D: TileDisplay> {
    state: EditorState,
    display: D,
}

impl<D: TileDisplay> Editor<D> {
    pub fn new(state: EditorState, display: D) -> Self {
        Editor { state, display }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn paint(&mut self, x: usize, y: usize, brush: Brush) -> io::Result<bool> {
        let changed = self.state.paint(x, y, brush);
        self.refresh()?;
        Ok(changed)
    }

    pub fn erase(&mut self, x: usize, y: usize) -> io::Result<bool> {
        self.paint(x, y, Brush::Erase)
    }

    pub fn load_code(&mut self, code: &LevelCode) -> io::Result<()> {
        self.state.load_code(code);
        self.refresh()
    }

    pub fn reset(&mut self) -> io::Result<()> {
        self.state.reset();
        self.refresh()
    }

    pub fn set_code_symbol(&mut self, index: usize, value: u8) -> io::Result<bool> {
        let changed = self.state.set_code_symbol(index, value);
        self.refresh()?;
        Ok(changed)
    }

    pub fn cycle_code_symbol(&mut self, index: usize, step: i32) -> io::Result<bool> {
        let changed = self.state.cycle_code_symbol(index, step);
        self.refresh()?;
        Ok(changed)
    }

    /// Redraw the whole code line.
    pub fn display_code(&mut self) -> io::Result<()> {
        self.state.mark_code();
        self.refresh()
    }

    /// Run several edits with display suppressed, then redraw once.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut EditorState) -> R) -> io::Result<R> {
        let was = self.state.suppress_display();
        self.state.set_suppress_display(true);
        let out = f(&mut self.state);
        self.state.set_suppress_display(was);
        self.refresh()?;
        Ok(out)
    }

    /// Draw pending chunks unless display suppression is on.
    pub fn refresh(&mut self) -> io::Result<()> {
        if self.state.suppress_display() {
            return Ok(());
        }
        if self.state.take_full_redraw() {
            self.state.cells.clear_marks();
            self.state.symbols.clear_marks();
            return self.display.redraw_all(&self.state.map, &self.state.shown);
        }
        let cells = self.state.take_pending_cells();
        if !cells.is_empty() {
            self.display.redraw_cells(&self.state.map, &cells)?;
        }
        let symbols = self.state.take_pending_symbols();
        if !symbols.is_empty() {
            self.display.redraw_code(&self.state.shown, &symbols)?;
        }
        Ok(())
    }

    pub fn redraw_all(&mut self) -> io::Result<()> {
        self.state.cells.clear_marks();
        self.state.symbols.clear_marks();
        self.state.full_redraw = false;
        self.display.redraw_all(&self.state.map, &self.state.shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{classify, from_glyph, glyph, ENEMY_LEFT, ENEMY_RIGHT, PLATFORM_RIGHT};

    #[derive(Default)]
    struct RecordingDisplay {
        full: usize,
        cells: Vec<Vec<(usize, usize)>>,
        code: Vec<Vec<usize>>,
    }

    impl TileDisplay for RecordingDisplay {
        fn redraw_all(&mut self, _map: &TileMap, _code: &[u8]) -> io::Result<()> {
            self.full += 1;
            Ok(())
        }

        fn redraw_cells(&mut self, _map: &TileMap, cells: &[(usize, usize)]) -> io::Result<()> {
            self.cells.push(cells.to_vec());
            Ok(())
        }

        fn redraw_code(&mut self, _code: &[u8], changed: &[usize]) -> io::Result<()> {
            self.code.push(changed.to_vec());
            Ok(())
        }
    }

    /// One block row, platform row 2, columns 0..=9, player row 0.
    fn narrow() -> Layout {
        Layout {
            width_bits: 4,
            height: 4,
            origin_x: 0,
            origin_y: 1,
            block_columns: 2,
            block_rows: 1,
            max_run: 8,
        }
    }

    fn state() -> EditorState {
        EditorState::new(Layout::default(), ENEMY_SLOTS, OverflowPolicy::Evict)
    }

    fn editor(layout: Layout) -> Editor<RecordingDisplay> {
        let mut ed = Editor::new(
            EditorState::new(layout, ENEMY_SLOTS, OverflowPolicy::Evict),
            RecordingDisplay::default(),
        );
        ed.refresh().unwrap();
        ed
    }

    /// Editable rows 11..=19 as glyph strings.
    fn picture(s: &EditorState) -> Vec<String> {
        let l = s.layout();
        l.editable_rows()
            .map(|y| (l.x_min()..=l.x_max()).map(|x| glyph(s.map().get(x, y))).collect())
            .collect()
    }

    fn row(s: &EditorState, y: usize) -> String {
        picture(s)[y - s.layout().player_row()].clone()
    }

    /// Load a level drawn over editable rows 11..=19.
    fn state_from(rows: &[&str]) -> EditorState {
        let l = Layout::default();
        let mut m = TileMap::new(l.width_bits, l.height);
        for (i, r) in rows.iter().enumerate() {
            for (c, ch) in r.chars().enumerate() {
                m.set(l.x_min() + c, l.player_row() + i, from_glyph(ch));
            }
        }
        let mut s = EditorState::from_map(l, m, ENEMY_SLOTS, OverflowPolicy::Evict);
        s.drain_events();
        s.take_pending_cells();
        s.take_pending_symbols();
        s
    }

    // ── Scenario ──

    #[test]
    fn extending_run_redraws_exactly_two_cells() {
        let mut ed = editor(narrow());
        assert_eq!(ed.display().full, 1);
        ed.paint(4, 2, Brush::Platform).unwrap();
        ed.paint(6, 2, Brush::Platform).unwrap();
        assert_eq!(ed.state().map().get(6, 2), PLATFORM_RIGHT);
        ed.display_mut().cells.clear();

        assert!(ed.paint(7, 2, Brush::Platform).unwrap());
        assert_eq!(ed.display().cells, vec![vec![(6, 2), (7, 2)]]);
        assert_eq!(ed.state().map().get(6, 2), PLATFORM_MIDDLE);
        assert_eq!(ed.state().map().get(7, 2), PLATFORM_RIGHT);
    }

    #[test]
    fn code_line_redraws_changed_symbols_only() {
        let mut ed = editor(narrow());
        ed.paint(6, 2, Brush::Platform).unwrap();
        // Block 1 (columns 5..=9), and the player symbol since the player
        // leaves the empty spawn for the new platform.
        assert_eq!(ed.display().code, vec![vec![1, 2]]);
    }

    // ── Idempotence ──

    #[test]
    fn explicit_brushes_are_idempotent() {
        let mut s = state_from(&[
            "P...................",
            "....................",
            "[]..................",
        ]);
        let brushes = [
            (6, 13, Brush::Platform),
            (6, 12, Brush::Enemy(Facing::Right)),
            (6, 12, Brush::Enemy(Facing::Left)),
            (7, 11, Brush::Player),
            (6, 12, Brush::Erase),
        ];
        for (x, y, brush) in brushes {
            assert!(s.paint(x, y, brush), "{brush:?} first");
            let snapshot = s.map().as_bytes().to_vec();
            s.take_pending_cells();
            assert!(!s.paint(x, y, brush), "{brush:?} second");
            assert_eq!(s.map().as_bytes(), &snapshot[..]);
            assert!(s.take_pending_cells().is_empty());
        }
    }

    #[test]
    fn exit_brush_is_idempotent() {
        let mut s = state_from(&[
            ".P..................",
            "....................",
            "[==]................",
            "....................",
            "....................",
            "....................",
            "....................",
            "....................",
            "........[===].......",
        ]);
        assert!(s.paint(10, 18, Brush::Exit));
        assert_eq!(find_exit(s.map(), s.layout()), Some((10, 18)));
        assert!(!s.paint(10, 18, Brush::Exit));
        assert_eq!(s.take_pending_cells().len(), 4);
    }

    // ── Locality ──

    #[test]
    fn editing_inside_run_stays_local() {
        let mut s = state_from(&[
            "...P................",
            "....................",
            "..[===].............",
        ]);
        assert!(s.paint(6, 13, Brush::Auto));
        assert_eq!(row(&s, 13), "..[].[].............");
        // The cleared cell and the two new caps.
        assert_eq!(s.take_pending_cells(), vec![(5, 13), (6, 13), (7, 13)]);
    }

    // ── Auto click ──

    #[test]
    fn auto_click_cycles_enemy() {
        let mut s = state_from(&[
            "P...................",
            "....................",
            "[======]............",
        ]);
        assert_eq!(s.brush_preview(5, 12), BrushAction::EnemyRight);
        s.paint(5, 12, Brush::Auto);
        assert_eq!(s.map().get(5, 12), ENEMY_RIGHT);
        assert_eq!(s.brush_preview(5, 12), BrushAction::EnemyLeft);
        s.paint(5, 12, Brush::Auto);
        assert_eq!(s.map().get(5, 12), ENEMY_LEFT);
        assert_eq!(s.brush_preview(5, 12), BrushAction::Delete);
        s.paint(5, 12, Brush::Auto);
        assert!(s.map().is_empty(5, 12));
        assert!(s.enemies().is_empty());
    }

    #[test]
    fn auto_click_previews_platform_kinds() {
        let s = state_from(&[
            "P...................",
            "....................",
            "[==]................",
        ]);
        assert_eq!(s.brush_preview(6, 13), BrushAction::PlatformRight);
        assert_eq!(s.brush_preview(8, 13), BrushAction::PlatformNew);
        assert_eq!(s.brush_preview(2, 13), BrushAction::Delete);
        assert_eq!(s.brush_preview(21, 13), BrushAction::Default);
        assert_eq!(s.brush_preview(3, 11), BrushAction::Player);
        assert_eq!(s.brush_preview(2, 11), BrushAction::Default);
        assert_eq!(s.brush_preview(9, 11), BrushAction::Default);
    }

    #[test]
    fn player_column_refuses_enemies() {
        let mut s = state_from(&[
            "..P.................",
            "....................",
            "[======]............",
        ]);
        assert_eq!(s.brush_preview(4, 12), BrushAction::Default);
        assert!(!s.paint(4, 12, Brush::Enemy(Facing::Right)));
        assert!(s.paint(5, 12, Brush::Enemy(Facing::Right)));
    }

    // ── Enemy pool ──

    #[test]
    fn pool_overflow_evicts_oldest() {
        let mut s = EditorState::new(Layout::default(), 2, OverflowPolicy::Evict);
        for x in 4..=11 {
            s.paint(x, 19, Brush::Platform);
        }
        // The player took column 4 and the exit stands on 4..=5.
        assert_eq!(find_exit(s.map(), s.layout()), Some((4, 18)));
        s.drain_events();
        assert!(s.paint(7, 18, Brush::Enemy(Facing::Right)));
        assert!(s.paint(9, 18, Brush::Enemy(Facing::Right)));
        assert!(s.paint(11, 18, Brush::Enemy(Facing::Left)));
        assert_eq!(s.enemies().len(), 2);
        assert!(s.map().is_empty(7, 18));
        let events = s.drain_events();
        assert!(events.ends_with(&[
            ActorEvent::EnemyDeactivated { slot: 0 },
            ActorEvent::EnemyActivated { slot: 0, x: 11, y: 18, facing: Facing::Left },
        ]));
        assert_eq!(s.code().enemies.len(), 2);
        assert_eq!(s.code().enemies[0].column, 7);
    }

    #[test]
    fn reject_policy_keeps_existing_enemies() {
        let mut s = EditorState::new(Layout::default(), 1, OverflowPolicy::Reject);
        for x in 4..=9 {
            s.paint(x, 19, Brush::Platform);
        }
        assert!(s.paint(7, 18, Brush::Enemy(Facing::Right)));
        assert!(!s.paint(9, 18, Brush::Enemy(Facing::Right)));
        assert_eq!(s.map().get(7, 18), ENEMY_RIGHT);
        assert!(s.map().is_empty(9, 18));
    }

    // ── Removal cascade ──

    #[test]
    fn removing_platform_drops_enemy_and_moves_player() {
        let mut s = state_from(&[
            "....P...............",
            "....................",
            "..[==]..............",
            "....................",
            "....................",
            "....................",
            "....................",
            "....................",
            "..........[===].....",
        ]);
        assert!(s.paint(5, 12, Brush::Enemy(Facing::Left)));
        s.drain_events();

        // Column 4 is left alone and goes with column 5.
        assert!(s.erase(5, 13));
        assert_eq!(row(&s, 13), "....[]..............");
        assert!(s.map().is_empty(5, 12));
        assert!(s.enemies().is_empty());
        assert!(s.drain_events().contains(&ActorEvent::EnemyDeactivated { slot: 0 }));
        assert_eq!(find_player(s.map(), s.layout()), Some(6));

        // Now the player's column has nothing below it.
        assert!(s.erase(6, 13));
        assert_eq!(find_player(s.map(), s.layout()), Some(12));
        let events = s.drain_events();
        assert!(events.contains(&ActorEvent::PlayerMoved { x: 12, y: 11 }));
        assert!(events.contains(&ActorEvent::ExitMoved { x: 12, y: 18 }));
        assert_eq!(find_exit(s.map(), s.layout()), Some((12, 18)));
    }

    // ── Suppression ──

    #[test]
    fn batch_redraws_once() {
        let mut ed = editor(Layout::default());
        ed.display_mut().cells.clear();
        ed.display_mut().code.clear();
        ed.batch(|s| {
            s.paint(4, 13, Brush::Platform);
            s.paint(6, 13, Brush::Platform);
            s.paint(8, 13, Brush::Platform);
        })
        .unwrap();
        assert_eq!(ed.display().cells.len(), 1);
        assert_eq!(ed.display().code.len(), 1);
        let cells = &ed.display().cells[0];
        assert!(cells.contains(&(4, 13)) && cells.contains(&(9, 13)));
    }

    #[test]
    fn suppressed_display_holds_marks() {
        let mut ed = editor(Layout::default());
        ed.state_mut().set_suppress_display(true);
        ed.paint(4, 13, Brush::Platform).unwrap();
        ed.paint(8, 13, Brush::Platform).unwrap();
        assert!(ed.display().cells.is_empty());

        ed.state_mut().set_suppress_display(false);
        ed.refresh().unwrap();
        // The player moved from the empty spawn onto the first platform.
        assert_eq!(
            ed.display().cells,
            vec![vec![(2, 11), (4, 11), (4, 13), (5, 13), (8, 13), (9, 13)]]
        );
    }

    #[test]
    fn full_redraw_keeps_suppressed_marks() {
        let mut other = state();
        other.paint(4, 13, Brush::Platform);
        let code = other.encode();

        let mut ed = editor(Layout::default());
        ed.state_mut().suppress_cell(4, 13);
        ed.load_code(&code).unwrap();
        assert_eq!(ed.display().full, 2);
        assert!(ed.display().cells.is_empty());

        ed.state_mut().enable_cell(4, 13);
        ed.refresh().unwrap();
        assert_eq!(ed.display().cells, vec![vec![(4, 13)]]);
    }

    #[test]
    fn suppressed_block_symbol_is_not_resynced() {
        let mut s = state();
        s.suppress_symbol(0);
        s.paint(3, 13, Brush::Platform);
        assert_eq!(s.code().patterns[0], 0);
        assert!(!s.take_pending_symbols().contains(&0));
        s.enable_symbol(0);
        assert_eq!(s.code().patterns[0], 6); // 01100
        assert!(s.take_pending_symbols().contains(&0));
    }

    #[test]
    fn suppressed_cell_keeps_its_mark() {
        let mut s = state();
        s.take_pending_cells();
        s.suppress_cell(5, 13);
        s.suppress_symbol(17);
        assert!(s.is_symbol_suppressed(17));
        s.paint(4, 13, Brush::Platform);
        // Old and new player cells, and the platform cell left visible.
        assert_eq!(s.take_pending_cells(), vec![(2, 11), (4, 11), (4, 13)]);
        s.enable_cell(5, 13);
        assert_eq!(s.take_pending_cells(), vec![(5, 13)]);
        s.clear_all_suppression();
        assert!(!s.is_symbol_suppressed(17));
    }

    #[test]
    fn pending_cells_match_net_changes() {
        let mut s = state();
        s.paint(4, 13, Brush::Platform);
        let pending = s.pending_cells();
        assert!(pending.contains(&(4, 13)) && pending.contains(&(5, 13)));
        assert_eq!(s.take_pending_cells(), pending);
        assert!(s.pending_cells().is_empty());
    }

    // ── Player and code ──

    fn categories(s: &EditorState) -> Vec<Category> {
        s.map().as_bytes().iter().map(|&t| classify(t)).collect()
    }

    #[test]
    fn first_platform_pulls_player_off_empty_spawn() {
        let mut s = state();
        assert_eq!(find_player(s.map(), s.layout()), Some(2));
        assert!(s.paint(10, 13, Brush::Platform));
        assert_eq!(find_player(s.map(), s.layout()), Some(10));
        assert_eq!(s.code().player_column, 8);

        let before = categories(&s);
        let code = s.encode();
        s.load_code(&code);
        assert_eq!(categories(&s), before);
    }

    #[test]
    fn pattern_symbol_pulls_player_onto_new_platform() {
        let mut s = state();
        assert!(s.set_code_symbol(2, 6)); // 01100 in block 2: columns 13..=14
        assert_eq!(find_player(s.map(), s.layout()), Some(13));
        let before = categories(&s);
        let code = s.encode();
        s.load_code(&code);
        assert_eq!(categories(&s), before);
    }

    #[test]
    fn erased_player_decodes_at_default_spawn() {
        let mut s = state_from(&[
            "..........P.........",
            "....................",
            "......[]..[===].....",
        ]);
        assert!(s.erase(12, 11));
        assert_eq!(find_player(s.map(), s.layout()), None);
        assert!(s.drain_events().contains(&ActorEvent::PlayerHidden));
        let code = s.encode();
        assert_eq!(code.player_column, 6);
        assert_eq!(s.code().player_column, 6);
        s.load_code(&code);
        assert_eq!(find_player(s.map(), s.layout()), Some(8));
    }

    #[test]
    fn round_trip_after_edits() {
        let mut s = state();
        for (x, y, b) in [
            (2, 13, Brush::Platform),
            (4, 13, Brush::Platform),
            (10, 17, Brush::Platform),
            (12, 17, Brush::Platform),
            (14, 19, Brush::Platform),
            (11, 16, Brush::Enemy(Facing::Left)),
            (4, 11, Brush::Player),
            (14, 18, Brush::Exit),
        ] {
            s.paint(x, y, b);
        }
        let before = categories(&s);
        let code = s.encode();
        s.load_code(&code);
        assert_eq!(categories(&s), before);
    }

    #[test]
    fn pattern_symbol_is_corrected_for_edge_block() {
        let mut s = state();
        assert!(s.set_code_symbol(0, 2)); // 10000 needs a left block
        assert_eq!(s.code().patterns[0], 3);
        assert_eq!(row(&s, 13), "...[]...............");
    }

    #[test]
    fn pattern_symbol_forces_neighbor_cell() {
        let mut s = state();
        assert!(s.set_code_symbol(1, 9)); // 01101 continues right
        assert_eq!(row(&s, 13), "......[].[].........");
        assert_eq!(s.code().patterns[1], 9);
        assert_eq!(s.code().patterns[2], 2);
    }

    #[test]
    fn debug_cycling_walks_valid_patterns() {
        let mut s = state();
        // 00001 borrows the first cell of block 1.
        assert!(s.debug_next_pattern(0));
        assert_eq!(s.code().patterns[0], 1);
        assert_eq!(row(&s, 13), "....[]..............");
        assert!(s.debug_previous_pattern(0));
        assert_eq!(s.code().patterns[0], 0);
        s.debug_previous_pattern(0);
        assert_eq!(s.code().patterns[0], 20);
        assert!(s.debug_reset_pattern(0));
        assert_eq!(row(&s, 13), "....................");
        assert!(!s.debug_next_pattern(99));
    }

    #[test]
    fn player_symbol_snaps_to_nearest_column() {
        let mut s = state_from(&[
            "P...................",
            "....................",
            "[]......[==]........",
        ]);
        s.set_code_symbol(16, 6);
        assert_eq!(s.code().player_column, 8);
        s.cycle_code_symbol(16, 1);
        assert_eq!(s.code().player_column, 9);
        s.cycle_code_symbol(16, -1);
        assert_eq!(s.code().player_column, 8);
    }

    #[test]
    fn enemy_symbol_rebuilds_enemy_list() {
        let mut s = state_from(&[
            "P...................",
            "....................",
            "[======]............",
        ]);
        // Slot 0 at row 0, column 4: 1 + 0 + 2.
        assert!(s.set_code_symbol(17, 3));
        assert_eq!(s.map().get(6, 12), ENEMY_RIGHT);
        // Facing mask bit 0.
        assert!(s.set_code_symbol(23, 1));
        assert_eq!(s.map().get(6, 12), ENEMY_LEFT);
        assert!(s.set_code_symbol(17, 0));
        assert!(s.enemies().is_empty());
    }

    #[test]
    fn load_emits_actor_events() {
        let mut s = state();
        s.drain_events();
        s.load_text("3400007060058B0C7M$00022");
        let events = s.drain_events();
        assert!(events.contains(&ActorEvent::PlayerMoved { x: 9, y: 11 }));
        assert!(events.contains(&ActorEvent::ExitMoved { x: 9, y: 18 }));
        assert_eq!(
            events.iter().filter(|e| matches!(e, ActorEvent::EnemyActivated { .. })).count(),
            2
        );
        assert_eq!(s.code_text(), "3400007060058B0C7M$00022");
    }
}
