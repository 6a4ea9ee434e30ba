/// Command-line front end: inspect, edit and store level codes.

use std::io::{self, Stdout};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tilecode::config::EditorConfig;
use tilecode::domain::entity::{Brush, Facing};
use tilecode::sim::code::{ExitSlot, LevelCode};
use tilecode::sim::display::{NullDisplay, TileDisplay};
use tilecode::sim::editor::{Editor, EditorState};
use tilecode::sim::levels;
use tilecode::sim::placement::find_player;
use tilecode::sim::save;
use tilecode::ui::terminal::{render_ascii, TerminalDisplay};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a level code and print the map.
    Show {
        /// Level code or built-in level number; the empty level when omitted
        code: Option<String>,
        /// Draw on the terminal screen instead of printing glyph rows
        #[arg(long)]
        screen: bool,
    },
    /// List built-in levels and those in the levels directory.
    Levels,
    /// Apply paint operations to a level code, print the result.
    Paint {
        code: String,
        /// `x,y` or `x,y:brush` (auto, platform, right, left, exit, player, erase)
        #[arg(required = true)]
        ops: Vec<String>,
        /// Draw on the terminal screen, redrawing only what each op changes
        #[arg(long)]
        screen: bool,
    },
    /// Store a level code in a save slot.
    Save {
        slot: u8,
        code: String,
        /// Also write the byte image
        #[arg(long)]
        image: bool,
    },
    /// Load a level code from a save slot.
    Load {
        slot: u8,
        /// Read the byte image instead of the text save
        #[arg(long)]
        image: bool,
    },
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = EditorConfig::load();
    init_logging(&config.log_level);
    debug!(?config, "configuration loaded");

    match args.command {
        Command::Show { code, screen } => show(&config, code.as_deref(), screen),
        Command::Levels => list_levels(&config),
        Command::Paint { code, ops, screen } => paint(&config, &code, &ops, screen),
        Command::Save { slot, code, image } => save_slot(&config, slot, &code, image),
        Command::Load { slot, image } => load_slot(&config, slot, image),
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// ── Helpers ──

fn new_state(config: &EditorConfig) -> EditorState {
    EditorState::new(config.layout, config.enemies.capacity, config.enemies.overflow)
}

/// A built-in level number or a level code.
fn resolve_code(config: &EditorConfig, text: Option<&str>) -> Result<LevelCode> {
    let layout = &config.layout;
    let Some(text) = text else {
        return Ok(LevelCode::empty(layout));
    };
    if let Ok(index) = text.parse::<usize>() {
        if text.len() < layout.code_len() {
            return levels::predefined(index, layout)
                .ok_or_else(|| anyhow!("no built-in level {}", index));
        }
    }
    LevelCode::parse(text, layout).with_context(|| format!("invalid level code {:?}", text))
}

fn parse_brush(name: &str) -> Option<Brush> {
    let brush = match name {
        "auto" => Brush::Auto,
        "platform" => Brush::Platform,
        "right" | "enemy" => Brush::Enemy(Facing::Right),
        "left" => Brush::Enemy(Facing::Left),
        "exit" => Brush::Exit,
        "player" => Brush::Player,
        "erase" => Brush::Erase,
        _ => return None,
    };
    Some(brush)
}

fn parse_op(op: &str) -> Result<(usize, usize, Brush)> {
    let (pos, brush) = match op.split_once(':') {
        Some((pos, name)) => {
            (pos, parse_brush(name).ok_or_else(|| anyhow!("unknown brush {:?}", name))?)
        }
        None => (op, Brush::Auto),
    };
    let (x, y) = pos.split_once(',').ok_or_else(|| anyhow!("expected x,y in {:?}", op))?;
    let x = x.trim().parse().with_context(|| format!("bad x in {:?}", op))?;
    let y = y.trim().parse().with_context(|| format!("bad y in {:?}", op))?;
    Ok((x, y, brush))
}

fn print_state(state: &EditorState) {
    print!("{}", render_ascii(state.map(), state.layout()));
    print_summary(state);
}

fn print_summary(state: &EditorState) {
    let layout = state.layout();
    println!("code:    {}", state.code_text());
    let player = find_player(state.map(), layout)
        .map_or("none".to_string(), |x| format!("column {}", x - layout.x_min()));
    let exit = match state.code().exit {
        ExitSlot::At(x, y) => format!("({}, {})", x, y),
        ExitSlot::Derived => "auto".to_string(),
        ExitSlot::Absent => "none".to_string(),
    };
    println!("player:  {}", player);
    println!("enemies: {}/{}", state.enemies().len(), state.enemies().capacity());
    println!("exit:    {}", exit);
}

// ── Commands ──

fn show(config: &EditorConfig, text: Option<&str>, screen: bool) -> Result<()> {
    let code = resolve_code(config, text)?;
    if screen {
        return paint_on_screen(config, &code, &[]);
    }
    let mut state = new_state(config);
    state.load_code(&code);
    print_state(&state);
    Ok(())
}

fn list_levels(config: &EditorConfig) -> Result<()> {
    let all = levels::all_levels(Some(&config.levels_dir), &config.layout);
    for (i, def) in all.iter().enumerate() {
        println!("{:>3}  {}  {}", i, def.code, def.name);
    }
    Ok(())
}

fn paint(config: &EditorConfig, text: &str, ops: &[String], screen: bool) -> Result<()> {
    let code = resolve_code(config, Some(text))?;
    if screen {
        return paint_on_screen(config, &code, ops);
    }
    let mut editor = Editor::new(new_state(config), NullDisplay);
    editor.load_code(&code)?;
    apply_ops(&mut editor, ops)?;
    print_state(editor.state());
    Ok(())
}

fn apply_ops<D: TileDisplay>(editor: &mut Editor<D>, ops: &[String]) -> Result<()> {
    for op in ops {
        let (x, y, brush) = parse_op(op)?;
        let changed = editor.paint(x, y, brush)?;
        info!(x, y, ?brush, changed, "paint");
        if !changed {
            eprintln!("{}: no change", op);
        }
    }
    Ok(())
}

/// Full draw on load, then one selective redraw per op.
fn paint_on_screen(config: &EditorConfig, code: &LevelCode, ops: &[String]) -> Result<()> {
    let display: TerminalDisplay<Stdout> = TerminalDisplay::new(io::stdout(), config.layout);
    let mut editor = Editor::new(new_state(config), display);
    editor.load_code(code).context("drawing the level")?;
    let applied = apply_ops(&mut editor, ops);
    editor.display_mut().finish().context("restoring the terminal")?;
    applied?;
    print_summary(editor.state());
    Ok(())
}

fn save_dir(config: &EditorConfig) -> PathBuf {
    save::resolve_dir(config.save_dir.as_deref())
}

fn save_slot(config: &EditorConfig, slot: u8, text: &str, image: bool) -> Result<()> {
    let code = resolve_code(config, Some(text))?;
    let dir = save_dir(config);
    let path = save::save_code(&dir, slot, &code, &config.layout)
        .with_context(|| format!("saving slot {}", slot))?;
    println!("saved {}", path.display());
    if image {
        let path = save::image_path(&dir, slot);
        save::write_image(&path, &code, &config.layout)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("saved {}", path.display());
    }
    Ok(())
}

fn load_slot(config: &EditorConfig, slot: u8, image: bool) -> Result<()> {
    let dir = save_dir(config);
    let loaded = if image {
        save::read_image(&save::image_path(&dir, slot), &config.layout)
    } else {
        save::load_code(&dir, slot, &config.layout)
    };
    let code = loaded.with_context(|| format!("loading slot {} from {}", slot, dir.display()))?;
    let mut state = new_state(config);
    state.load_code(&code);
    print_state(&state);
    Ok(())
}
