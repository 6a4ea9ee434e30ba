/// Save and load level codes. Numbered slots, two formats per slot.
///
/// ## Text save (`level_<slot>.dat`):
///   Key-value lines:
///   ```text
///   code=3400007060058B0C7M$00022
///   exit=9,18
///   ```
///   `exit` is `x,y`, `auto` (derive on load) or `none`. A missing `exit`
///   line reads as `auto`. Unknown keys are ignored.
///
/// ## Byte image (`level_<slot>.bin`):
///   The `LevelCode` image: magic, symbols, exit, checksum.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::geometry::Layout;
use crate::error::{SaveError, SaveResult};
use crate::sim::code::{ExitSlot, LevelCode};

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Default save directory: exe dir when writable, then
/// `~/.local/share/tilecode`, then the CWD.
pub fn save_dir() -> PathBuf {
    // 1. Exe directory (portable installs)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // System installs like /usr/bin/ won't be writable
            let test_path = parent.join(".write_test_tilecode");
            if std::fs::write(&test_path, "").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return parent.to_path_buf();
            }
        }
    }

    // 2. XDG data home
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilecode");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    // 3. CWD
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// The configured directory if any, else `save_dir()`.
pub fn resolve_dir(configured: Option<&Path>) -> PathBuf {
    configured.map(Path::to_path_buf).unwrap_or_else(save_dir)
}

pub fn slot_path(dir: &Path, slot: u8) -> PathBuf {
    dir.join(format!("level_{}.dat", slot))
}

pub fn image_path(dir: &Path, slot: u8) -> PathBuf {
    dir.join(format!("level_{}.bin", slot))
}

// ══════════════════════════════════════════════════════════════
// Slot operations
// ══════════════════════════════════════════════════════════════

/// Write `code` to a text slot, creating `dir` if needed.
pub fn save_code(dir: &Path, slot: u8, code: &LevelCode, layout: &Layout) -> SaveResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = slot_path(dir, slot);
    std::fs::write(&path, serialize(code, layout))?;
    info!(slot, path = %path.display(), "level code saved");
    Ok(path)
}

pub fn load_code(dir: &Path, slot: u8, layout: &Layout) -> SaveResult<LevelCode> {
    let path = slot_path(dir, slot);
    let content = std::fs::read_to_string(&path)?;
    let code = parse_save(&content, layout)?;
    info!(slot, path = %path.display(), "level code loaded");
    Ok(code)
}

pub fn has_slot(dir: &Path, slot: u8) -> bool {
    slot_path(dir, slot).exists() || image_path(dir, slot).exists()
}

pub fn delete_slot(dir: &Path, slot: u8) {
    for path in [slot_path(dir, slot), image_path(dir, slot)] {
        if std::fs::remove_file(&path).is_ok() {
            debug!(path = %path.display(), "save removed");
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Byte image
// ══════════════════════════════════════════════════════════════

pub fn write_image(path: &Path, code: &LevelCode, layout: &Layout) -> SaveResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, code.to_image(layout))?;
    info!(path = %path.display(), "level image written");
    Ok(())
}

pub fn read_image(path: &Path, layout: &Layout) -> SaveResult<LevelCode> {
    let bytes = std::fs::read(path)?;
    Ok(LevelCode::from_image(&bytes, layout)?)
}

// ══════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════

fn exit_str(exit: ExitSlot) -> String {
    match exit {
        ExitSlot::At(x, y) => format!("{},{}", x, y),
        ExitSlot::Derived => "auto".to_string(),
        ExitSlot::Absent => "none".to_string(),
    }
}

fn parse_exit(val: &str) -> Option<ExitSlot> {
    match val {
        "auto" => Some(ExitSlot::Derived),
        "none" => Some(ExitSlot::Absent),
        _ => {
            let (x, y) = val.split_once(',')?;
            Some(ExitSlot::At(x.trim().parse().ok()?, y.trim().parse().ok()?))
        }
    }
}

fn serialize(code: &LevelCode, layout: &Layout) -> String {
    let mut out = String::with_capacity(64);
    out.push_str(&format!("code={}\n", code.to_text(layout)));
    out.push_str(&format!("exit={}\n", exit_str(code.exit)));
    out
}

fn parse_save(content: &str, layout: &Layout) -> SaveResult<LevelCode> {
    let mut text = None;
    let mut exit = ExitSlot::Derived;

    for line in content.lines() {
        let line = line.trim();
        if let Some(val) = line.strip_prefix("code=") {
            text = Some(val.trim());
        } else if let Some(val) = line.strip_prefix("exit=") {
            let val = val.trim();
            exit = parse_exit(val).ok_or_else(|| SaveError::InvalidValue {
                key: "exit".to_string(),
                value: val.to_string(),
            })?;
        }
    }

    let mut code = LevelCode::parse(text.ok_or(SaveError::MissingKey("code"))?, layout)?;
    code.exit = exit;
    Ok(code)
}
