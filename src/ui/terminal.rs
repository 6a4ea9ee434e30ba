/// Terminal display adapter: draws the editable area and the code line.
///
/// Layout on screen:
///   - map cell (x, y) → terminal column `left + (x - x_min) * CELL_W`,
///     row `top + (y - player_row)`
///   - code line two rows under the map, one column per symbol
///
/// All commands are batched with `queue!` and flushed once per redraw.
/// Cells outside the editable area are never drawn. Positions go into
/// locals before `queue!`, which holds the writer mutably.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::domain::geometry::Layout;
use crate::domain::tile::{classify, glyph, Category, TileId};
use crate::sim::code::symbol_char;
use crate::sim::display::TileDisplay;
use crate::sim::tilemap::TileMap;

/// Terminal columns per map cell.
pub const CELL_W: u16 = 2;

const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
const CODE_LABEL: &str = "CODE ";

pub struct TerminalDisplay<W: Write> {
    writer: W,
    layout: Layout,
    left: u16,
    top: u16,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(writer: W, layout: Layout) -> Self {
        TerminalDisplay { writer, layout, left: 2, top: 1 }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Reset colors and park the cursor under the code line, so plain
    /// output continues below the drawing.
    pub fn finish(&mut self) -> io::Result<()> {
        let row = self.code_row() + 2;
        execute!(self.writer, ResetColor, MoveTo(0, row))
    }

    fn cell_pos(&self, x: usize, y: usize) -> Option<(u16, u16)> {
        let l = &self.layout;
        if !l.in_columns(x) || y < l.player_row() || y > l.y_max() {
            return None;
        }
        let col = self.left + (x - l.x_min()) as u16 * CELL_W;
        let row = self.top + (y - l.player_row()) as u16;
        Some((col, row))
    }

    fn code_row(&self) -> u16 {
        self.top + (self.layout.y_max() - self.layout.player_row()) as u16 + 2
    }

    fn code_col(&self, index: usize) -> u16 {
        self.left + CODE_LABEL.len() as u16 + index as u16
    }

    fn queue_cell(&mut self, x: usize, y: usize, id: TileId) -> io::Result<()> {
        let Some((col, row)) = self.cell_pos(x, y) else {
            return Ok(());
        };
        let (fg, bg) = tile_colors(classify(id));
        let text: String = [glyph(id), ' '].iter().collect();
        let text = if classify(id) == Category::Empty { "· ".to_string() } else { text };
        queue!(
            self.writer,
            MoveTo(col, row),
            SetForegroundColor(fg),
            SetBackgroundColor(bg),
            Print(text)
        )
    }

    fn queue_symbol(&mut self, code: &[u8], index: usize) -> io::Result<()> {
        let Some(&value) = code.get(index) else {
            return Ok(());
        };
        let blocks = self.layout.block_count();
        // Block symbols and the rest of the code in different colors.
        let fg = if index < blocks { Color::Rgb { r: 120, g: 200, b: 255 } } else { Color::Rgb { r: 255, g: 200, b: 90 } };
        let (col, row) = (self.code_col(index), self.code_row());
        queue!(
            self.writer,
            MoveTo(col, row),
            SetForegroundColor(fg),
            SetBackgroundColor(BASE_BG),
            Print(symbol_char(value))
        )
    }
}

impl<W: Write> TileDisplay for TerminalDisplay<W> {
    fn redraw_all(&mut self, map: &TileMap, code: &[u8]) -> io::Result<()> {
        queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        for y in self.layout.player_row()..=self.layout.y_max() {
            for x in self.layout.x_min()..=self.layout.x_max() {
                self.queue_cell(x, y, map.get(x, y))?;
            }
        }
        let (left, row) = (self.left, self.code_row());
        queue!(
            self.writer,
            MoveTo(left, row),
            SetAttribute(Attribute::Bold),
            SetForegroundColor(Color::White),
            Print(CODE_LABEL),
            SetAttribute(Attribute::Reset)
        )?;
        for index in 0..code.len() {
            self.queue_symbol(code, index)?;
        }
        self.writer.flush()
    }

    fn redraw_cells(&mut self, map: &TileMap, cells: &[(usize, usize)]) -> io::Result<()> {
        for &(x, y) in cells {
            self.queue_cell(x, y, map.get(x, y))?;
        }
        self.writer.flush()
    }

    fn redraw_code(&mut self, code: &[u8], changed: &[usize]) -> io::Result<()> {
        for &index in changed {
            self.queue_symbol(code, index)?;
        }
        self.writer.flush()
    }
}

fn tile_colors(category: Category) -> (Color, Color) {
    match category {
        Category::Empty => (Color::Rgb { r: 60, g: 60, b: 80 }, BASE_BG),
        Category::Platform => (Color::Rgb { r: 200, g: 200, b: 200 }, Color::Rgb { r: 70, g: 70, b: 70 }),
        Category::Enemy(_) => (Color::Rgb { r: 255, g: 90, b: 90 }, BASE_BG),
        Category::Exit(_) => (Color::Rgb { r: 90, g: 230, b: 120 }, Color::Rgb { r: 20, g: 60, b: 30 }),
        Category::Player => (Color::Rgb { r: 255, g: 230, b: 80 }, BASE_BG),
        Category::Other => (Color::Magenta, BASE_BG),
    }
}

// ── Plain text ──

/// The editable area as glyph rows, player row first.
pub fn render_ascii(map: &TileMap, layout: &Layout) -> String {
    let mut out = String::new();
    for y in layout.player_row()..=layout.y_max() {
        let row: String = (layout.x_min()..=layout.x_max()).map(|x| glyph(map.get(x, y))).collect();
        out.push_str(&row);
        out.push('\n');
    }
    out
}
