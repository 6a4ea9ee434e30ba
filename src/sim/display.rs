/// Redraw seam between the editor and whatever shows the map.
///
/// The editor only ever asks for the cells and code symbols that changed;
/// `redraw_all` is reserved for load and reset.

use std::io;

use crate::sim::tilemap::TileMap;

pub trait TileDisplay {
    /// Full repaint: every map cell plus the whole code line.
    fn redraw_all(&mut self, map: &TileMap, code: &[u8]) -> io::Result<()>;

    /// Repaint the listed map cells.
    fn redraw_cells(&mut self, map: &TileMap, cells: &[(usize, usize)]) -> io::Result<()>;

    /// Repaint the listed symbols of the code line.
    fn redraw_code(&mut self, code: &[u8], changed: &[usize]) -> io::Result<()>;
}

/// Display that draws nothing (headless hosts, batch tools).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDisplay;

impl TileDisplay for NullDisplay {
    fn redraw_all(&mut self, _map: &TileMap, _code: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn redraw_cells(&mut self, _map: &TileMap, _cells: &[(usize, usize)]) -> io::Result<()> {
        Ok(())
    }

    fn redraw_code(&mut self, _code: &[u8], _changed: &[usize]) -> io::Result<()> {
        Ok(())
    }
}
