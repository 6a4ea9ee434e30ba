/// Predefined levels and level files.
///
/// ## Sources (priority order):
///   1. Built-in levels (indexed from 0; 0 is the tutorial)
///   2. `levels/` directory (`.txt` files, sorted by file name)
///
/// ## Level file format (`.txt`):
///   ```text
///   # Tutorial
///   00000600000B80087W000000
///
///   # Second level
///   C0000C0000C0000C20000000
///   ```
///
/// A `#` line names the code that follows it. Blank lines are ignored.
/// Codes without a name line are numbered. Codes that fail strict parsing
/// are skipped with a warning.

use std::path::Path;

use tracing::{debug, warn};

use crate::domain::geometry::Layout;
use crate::error::CodeError;
use crate::sim::code::LevelCode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDef {
    pub name: String,
    pub code: String,
}

impl LevelDef {
    pub fn parse(&self, layout: &Layout) -> Result<LevelCode, CodeError> {
        LevelCode::parse(&self.code, layout)
    }
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

const BUILTIN: &[(&str, &str)] = &[
    ("Tutorial", "00000600000B80087W000000"),
    ("Challenge", "3400007060058B0C7M$00022"),
    ("Stairs", "C0000C0000C0000C20000000"),
    ("Blank", "000000000000000000000000"),
];

pub fn builtin_levels() -> Vec<LevelDef> {
    BUILTIN
        .iter()
        .map(|&(name, code)| LevelDef { name: name.to_string(), code: code.to_string() })
        .collect()
}

pub fn builtin_count() -> usize {
    BUILTIN.len()
}

/// Built-in level by index, `None` past the end.
pub fn predefined(index: usize, layout: &Layout) -> Option<LevelCode> {
    let (name, text) = BUILTIN.get(index)?;
    match LevelCode::parse(text, layout) {
        Ok(code) => Some(code),
        Err(e) => {
            warn!(level = name, error = %e, "built-in level does not fit this layout");
            None
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Level files
// ══════════════════════════════════════════════════════════════

/// Parse every level in a level file. Invalid codes are dropped.
pub fn parse_level_file(content: &str, layout: &Layout) -> Vec<LevelDef> {
    let mut levels = vec![];
    let mut name: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            name = Some(rest.trim().to_string());
            continue;
        }
        let label = name
            .take()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Level {}", levels.len() + 1));
        match LevelCode::parse(trimmed, layout) {
            Ok(_) => levels.push(LevelDef { name: label, code: trimmed.to_ascii_uppercase() }),
            Err(e) => warn!(level = %label, error = %e, "skipping invalid level code"),
        }
    }

    levels
}

/// Levels from every `.txt` file in `dir`, ordered by file name.
pub fn load_from_directory(dir: &Path, layout: &Layout) -> Vec<LevelDef> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "no level directory");
            return vec![];
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |e| e == "txt"))
        .collect();
    files.sort();

    let mut levels = vec![];
    for path in files {
        match std::fs::read_to_string(&path) {
            Ok(content) => levels.extend(parse_level_file(&content, layout)),
            Err(e) => warn!(file = %path.display(), error = %e, "unreadable level file"),
        }
    }
    levels
}

/// Built-in levels followed by any found in `dir`.
pub fn all_levels(dir: Option<&Path>, layout: &Layout) -> Vec<LevelDef> {
    let mut levels = builtin_levels();
    if let Some(dir) = dir {
        levels.extend(load_from_directory(dir, layout));
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::classify;
    use crate::sim::code::{decode, encode, ENEMY_SLOTS};
    use crate::sim::enemies::{EnemyPool, OverflowPolicy};
    use crate::sim::placement::{find_exit, find_player};
    use crate::sim::tilemap::TileMap;

    fn load(code: &LevelCode, layout: &Layout) -> TileMap {
        let mut map = TileMap::new(layout.width_bits, layout.height);
        let mut pool = EnemyPool::new(ENEMY_SLOTS, OverflowPolicy::Evict);
        decode(&mut map, layout, code, &mut pool);
        map
    }

    #[test]
    fn builtin_levels_parse_strictly() {
        let l = Layout::default();
        assert_eq!(builtin_levels().len(), builtin_count());
        for def in builtin_levels() {
            assert!(def.parse(&l).is_ok(), "{}", def.name);
        }
        assert!(predefined(builtin_count(), &l).is_none());
    }

    #[test]
    fn builtin_levels_are_stable_under_reencode() {
        let l = Layout::default();
        for index in 0..builtin_count() {
            let code = predefined(index, &l).unwrap();
            let first = load(&code, &l);
            let again = load(&encode(&first, &l, ENEMY_SLOTS), &l);
            assert_eq!(first.as_bytes(), again.as_bytes(), "level {index}");
        }
    }

    #[test]
    fn tutorial_has_player_enemy_and_exit() {
        let l = Layout::default();
        let map = load(&predefined(0, &l).unwrap(), &l);
        assert_eq!(find_player(&map, &l), Some(9));
        assert!(map.category(4, 18).is_enemy());
        assert_eq!(find_exit(&map, &l), Some((8, 14)));
        let enemies = map.as_bytes().iter().filter(|&&t| classify(t).is_enemy()).count();
        assert_eq!(enemies, 1);
    }

    #[test]
    fn level_file_names_and_numbers_codes() {
        let l = Layout::default();
        let text = "# First\n00000600000b80087w000000\n\nC0000C0000C0000C20000000\n# Broken\nXYZ\n";
        let levels = parse_level_file(text, &l);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].name, "First");
        assert_eq!(levels[0].code, "00000600000B80087W000000");
        assert_eq!(levels[1].name, "Level 2");
    }

    #[test]
    fn directory_levels_follow_builtins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "# B\nC0000C0000C0000C20000000\n").unwrap();
        std::fs::write(dir.path().join("a.txt"), "# A\n000000000000000000000000\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# ignored\n").unwrap();

        let l = Layout::default();
        let levels = all_levels(Some(dir.path()), &l);
        let names: Vec<&str> = levels.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(&names[builtin_count()..], &["A", "B"]);
        assert!(load_from_directory(&dir.path().join("missing"), &l).is_empty());
    }
}
