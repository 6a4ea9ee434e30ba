/// Level-editing core for a tile-based platformer.
///
/// ## Layers
///
///   - `domain`: static tile and pattern knowledge. Pure functions only.
///   - `sim`:    the editor state machine: live map, level code codec,
///                platform reconstruction, dirty tracking, enemy pool.
///   - `ui`:     terminal display adapter and ASCII rendering.
///   - `host`:   native-call dispatch for a script engine.
///
/// Dependencies flow downward: `host`/`ui` → `sim` → `domain`.

pub mod config;
pub mod domain;
pub mod error;
pub mod host;
pub mod sim;
pub mod ui;
