/// Editor settings from `config.toml`.
///
/// Every key is optional. Missing keys take the built-in layout and
/// enemy defaults; values the editor cannot use are replaced, with a
/// warning, instead of failing the load.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::geometry::Layout;
use crate::sim::code::ENEMY_SLOTS;
use crate::sim::enemies::OverflowPolicy;

const CONFIG_FILE: &str = "config.toml";

// ── Resolved settings ──

#[derive(Clone, Debug)]
pub struct EditorConfig {
    pub layout: Layout,
    pub enemies: EnemyConfig,
    /// Save slot directory; `None` uses the platform default
    pub save_dir: Option<PathBuf>,
    pub levels_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

#[derive(Clone, Copy, Debug)]
pub struct EnemyConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

// ── File schema ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    layout: TomlLayout,
    #[serde(default)]
    enemies: TomlEnemies,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlLayout {
    #[serde(default = "default_width_bits")]
    width_bits: u8,
    #[serde(default = "default_height")]
    height: usize,
    #[serde(default = "default_origin_x")]
    origin_x: usize,
    #[serde(default = "default_origin_y")]
    origin_y: usize,
    #[serde(default = "default_block_columns")]
    block_columns: usize,
    #[serde(default = "default_block_rows")]
    block_rows: usize,
    /// Accepted for readability; always one row above the block grid
    #[serde(default)]
    player_row: Option<usize>,
    #[serde(default = "default_max_run")]
    max_run: usize,
}

#[derive(Deserialize, Debug)]
struct TomlEnemies {
    #[serde(default = "default_capacity")]
    capacity: usize,
    #[serde(default = "default_overflow")]
    overflow: String,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    save_dir: Option<String>,
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_width_bits() -> u8 { Layout::default().width_bits }
fn default_height() -> usize { Layout::default().height }
fn default_origin_x() -> usize { Layout::default().origin_x }
fn default_origin_y() -> usize { Layout::default().origin_y }
fn default_block_columns() -> usize { Layout::default().block_columns }
fn default_block_rows() -> usize { Layout::default().block_rows }
fn default_max_run() -> usize { Layout::default().max_run }

fn default_capacity() -> usize { ENEMY_SLOTS }
fn default_overflow() -> String { "evict".into() }

fn default_levels_dir() -> String { "levels".into() }
fn default_log_level() -> String { "warn".into() }

impl Default for TomlLayout {
    fn default() -> Self {
        TomlLayout {
            width_bits: default_width_bits(),
            height: default_height(),
            origin_x: default_origin_x(),
            origin_y: default_origin_y(),
            block_columns: default_block_columns(),
            block_rows: default_block_rows(),
            player_row: None,
            max_run: default_max_run(),
        }
    }
}

impl Default for TomlEnemies {
    fn default() -> Self {
        TomlEnemies {
            capacity: default_capacity(),
            overflow: default_overflow(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            save_dir: None,
            levels_dir: default_levels_dir(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ──

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl EditorConfig {
    /// Search the candidate directories for a config file and resolve it.
    pub fn load() -> Self {
        let dirs = candidate_dirs();
        EditorConfig::from_toml(load_toml(&dirs), &dirs)
    }

    /// Parse config text directly. Errors fall back to defaults.
    pub fn parse(text: &str) -> Self {
        EditorConfig::from_toml(parse_toml(text, "<text>"), &[])
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        EditorConfig {
            layout: resolve_layout(&cfg.layout),
            enemies: resolve_enemies(&cfg.enemies),
            save_dir: cfg.general.save_dir.map(PathBuf::from),
            levels_dir: resolve_levels_dir(&cfg.general.levels_dir, search_dirs),
            log_level: cfg.general.log_level,
        }
    }
}

fn resolve_layout(t: &TomlLayout) -> Layout {
    let layout = Layout {
        width_bits: t.width_bits,
        height: t.height,
        origin_x: t.origin_x,
        origin_y: t.origin_y,
        block_columns: t.block_columns,
        block_rows: t.block_rows,
        max_run: t.max_run,
    };
    if let Err(reason) = layout.validate() {
        warn!(%reason, "invalid [layout], using the default layout");
        return Layout::default();
    }
    if let Some(row) = t.player_row {
        if row != layout.player_row() {
            warn!(row, expected = layout.player_row(), "player_row must sit above origin_y, ignoring");
        }
    }
    layout
}

fn resolve_enemies(t: &TomlEnemies) -> EnemyConfig {
    let overflow = OverflowPolicy::parse(&t.overflow).unwrap_or_else(|| {
        warn!(value = %t.overflow, "unknown enemies.overflow, using evict");
        OverflowPolicy::Evict
    });
    let mut capacity = t.capacity;
    if capacity == 0 || capacity > ENEMY_SLOTS {
        warn!(capacity, max = ENEMY_SLOTS, "enemies.capacity out of range, clamping");
        capacity = capacity.clamp(1, ENEMY_SLOTS);
    }
    EnemyConfig { capacity, overflow }
}

fn resolve_levels_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    if PathBuf::from(dir).is_absolute() {
        return PathBuf::from(dir);
    }
    search_dirs
        .iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or_else(|| PathBuf::from(dir))
}

/// Where `config.toml` and a relative levels directory are looked up, in
/// order: executable directory, CWD, XDG data home, system data directory.
fn candidate_dirs() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .map(|exe| exe.canonicalize().unwrap_or(exe))
        .and_then(|exe| exe.parent().map(PathBuf::from));
    let data_home = std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/tilecode"));
    let system = Some(PathBuf::from("/usr/share/tilecode"));

    let always = [exe_dir, std::env::current_dir().ok()].into_iter().flatten();
    let if_present = [data_home, system].into_iter().flatten().filter(|d| d.is_dir());

    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in always.chain(if_present) {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// First readable `config.toml` wins; a broken one means defaults.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    let Some(path) = search_dirs.iter().map(|d| d.join(CONFIG_FILE)).find(|p| p.is_file()) else {
        debug!("no {} found, using defaults", CONFIG_FILE);
        return TomlConfig::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => parse_toml(&text, &path.display().to_string()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read config file");
            TomlConfig::default()
        }
    }
}

fn parse_toml(text: &str, origin: &str) -> TomlConfig {
    toml::from_str(text).unwrap_or_else(|e| {
        warn!(origin, error = %e, "config parse error, using defaults");
        TomlConfig::default()
    })
}
