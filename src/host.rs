/// Native-call dispatch for a script engine host.
///
/// Scripts call into the editor by name with a slice of `i16` arguments
/// and get at most one `i16` back.
///
/// ┌──────────────────────┬──────────────────────┬──────────────────────┐
/// │ Call                  │ Arguments            │ Returns              │
/// ├──────────────────────┼──────────────────────┼──────────────────────┤
/// │ paint                 │ x, y [, brush]       │ 1 if changed, else 0 │
/// │ get_brush_tile        │ x, y                 │ category code        │
/// │ brush_preview         │ x, y                 │ brush action code    │
/// │ debug_next_pattern    │ block                │ 1 if changed, else 0 │
/// │ debug_prev_pattern    │ block                │ 1 if changed, else 0 │
/// │ debug_reset_pattern   │ block                │ 1 if changed, else 0 │
/// │ display_code          │                      │ nothing              │
/// │ set_code_symbol       │ index, value         │ 1 if changed, else 0 │
/// └──────────────────────┴──────────────────────┴──────────────────────┘
///
/// Negative or missing arguments make the call a no-op returning 0
/// (nothing for `display_code`). Only display I/O can fail.

use std::io;

use tracing::{debug, trace};

use crate::domain::entity::Brush;
use crate::sim::display::TileDisplay;
use crate::sim::editor::Editor;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NativeCall {
    Paint,
    GetBrushTile,
    BrushPreview,
    DebugNextPattern,
    DebugPreviousPattern,
    DebugResetPattern,
    DisplayCode,
    SetCodeSymbol,
}

impl NativeCall {
    pub const ALL: [NativeCall; 8] = [
        NativeCall::Paint,
        NativeCall::GetBrushTile,
        NativeCall::BrushPreview,
        NativeCall::DebugNextPattern,
        NativeCall::DebugPreviousPattern,
        NativeCall::DebugResetPattern,
        NativeCall::DisplayCode,
        NativeCall::SetCodeSymbol,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NativeCall::Paint => "paint",
            NativeCall::GetBrushTile => "get_brush_tile",
            NativeCall::BrushPreview => "brush_preview",
            NativeCall::DebugNextPattern => "debug_next_pattern",
            NativeCall::DebugPreviousPattern => "debug_prev_pattern",
            NativeCall::DebugResetPattern => "debug_reset_pattern",
            NativeCall::DisplayCode => "display_code",
            NativeCall::SetCodeSymbol => "set_code_symbol",
        }
    }

    pub fn from_name(name: &str) -> Option<NativeCall> {
        NativeCall::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Required argument count.
    pub fn arity(self) -> usize {
        match self {
            NativeCall::Paint | NativeCall::GetBrushTile | NativeCall::BrushPreview => 2,
            NativeCall::SetCodeSymbol => 2,
            NativeCall::DebugNextPattern
            | NativeCall::DebugPreviousPattern
            | NativeCall::DebugResetPattern => 1,
            NativeCall::DisplayCode => 0,
        }
    }
}

fn flag(b: bool) -> Option<i16> {
    Some(b as i16)
}

/// Run one native call against the editor.
pub fn dispatch<D: TileDisplay>(
    editor: &mut Editor<D>,
    call: NativeCall,
    args: &[i16],
) -> io::Result<Option<i16>> {
    trace!(call = call.name(), ?args, "native call");

    if call == NativeCall::DisplayCode {
        editor.display_code()?;
        return Ok(None);
    }

    let parsed: Option<Vec<usize>> = args
        .iter()
        .take(call.arity())
        .map(|&a| usize::try_from(a).ok())
        .collect();
    let args_ok = parsed.as_ref().map_or(false, |p| p.len() == call.arity());
    let Some(a) = parsed.filter(|_| args_ok) else {
        debug!(call = call.name(), ?args, "bad native call arguments");
        return Ok(Some(0));
    };

    let result = match call {
        NativeCall::Paint => {
            let brush = args.get(2).copied().map_or(Brush::Auto, Brush::from_code);
            flag(editor.paint(a[0], a[1], brush)?)
        }
        NativeCall::GetBrushTile => Some(editor.state().brush_tile(a[0], a[1]).code() as i16),
        NativeCall::BrushPreview => Some(editor.state().brush_preview(a[0], a[1]).code() as i16),
        NativeCall::DebugNextPattern => {
            let changed = editor.state_mut().debug_next_pattern(a[0]);
            editor.refresh()?;
            flag(changed)
        }
        NativeCall::DebugPreviousPattern => {
            let changed = editor.state_mut().debug_previous_pattern(a[0]);
            editor.refresh()?;
            flag(changed)
        }
        NativeCall::DebugResetPattern => {
            let changed = editor.state_mut().debug_reset_pattern(a[0]);
            editor.refresh()?;
            flag(changed)
        }
        NativeCall::SetCodeSymbol => match u8::try_from(a[1]) {
            Ok(value) => flag(editor.set_code_symbol(a[0], value)?),
            Err(_) => Some(0),
        },
        NativeCall::DisplayCode => None,
    };
    Ok(result)
}

/// Dispatch by call name. Unknown names return `None`.
pub fn dispatch_named<D: TileDisplay>(
    editor: &mut Editor<D>,
    name: &str,
    args: &[i16],
) -> io::Result<Option<i16>> {
    match NativeCall::from_name(name) {
        Some(call) => dispatch(editor, call, args),
        None => {
            debug!(name, "unknown native call");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::BrushAction;
    use crate::domain::geometry::Layout;
    use crate::domain::tile::Category;
    use crate::sim::code::ENEMY_SLOTS;
    use crate::sim::display::NullDisplay;
    use crate::sim::editor::EditorState;
    use crate::sim::enemies::OverflowPolicy;

    fn editor() -> Editor<NullDisplay> {
        let state = EditorState::new(Layout::default(), ENEMY_SLOTS, OverflowPolicy::Evict);
        Editor::new(state, NullDisplay)
    }

    #[test]
    fn names_round_trip() {
        for call in NativeCall::ALL {
            assert_eq!(NativeCall::from_name(call.name()), Some(call));
        }
        assert_eq!(NativeCall::from_name("paint_all"), None);
    }

    #[test]
    fn paint_then_query() {
        let mut ed = editor();
        assert_eq!(dispatch(&mut ed, NativeCall::Paint, &[4, 13, 1]).unwrap(), Some(1));
        assert_eq!(dispatch(&mut ed, NativeCall::Paint, &[4, 13, 1]).unwrap(), Some(0));
        assert_eq!(
            dispatch(&mut ed, NativeCall::GetBrushTile, &[5, 13]).unwrap(),
            Some(Category::Platform.code() as i16)
        );
        assert_eq!(
            dispatch(&mut ed, NativeCall::BrushPreview, &[4, 13]).unwrap(),
            Some(BrushAction::Delete.code() as i16)
        );
    }

    #[test]
    fn bad_arguments_are_no_ops() {
        let mut ed = editor();
        assert_eq!(dispatch(&mut ed, NativeCall::Paint, &[-1, 13]).unwrap(), Some(0));
        assert_eq!(dispatch(&mut ed, NativeCall::Paint, &[4]).unwrap(), Some(0));
        assert_eq!(dispatch(&mut ed, NativeCall::SetCodeSymbol, &[0, 300]).unwrap(), Some(0));
        assert!(ed.state().map().is_empty(4, 13));
    }

    #[test]
    fn debug_pattern_calls() {
        let mut ed = editor();
        assert_eq!(dispatch(&mut ed, NativeCall::DebugNextPattern, &[0]).unwrap(), Some(1));
        assert_eq!(ed.state().code().patterns[0], 1);
        assert_eq!(dispatch(&mut ed, NativeCall::DebugPreviousPattern, &[0]).unwrap(), Some(1));
        assert_eq!(dispatch(&mut ed, NativeCall::DebugResetPattern, &[0]).unwrap(), Some(0));
        assert_eq!(ed.state().code().patterns[0], 0);
    }

    #[test]
    fn named_dispatch() {
        let mut ed = editor();
        assert_eq!(dispatch_named(&mut ed, "set_code_symbol", &[0, 6]).unwrap(), Some(1));
        assert_eq!(ed.state().code().patterns[0], 6);
        assert_eq!(dispatch_named(&mut ed, "display_code", &[]).unwrap(), None);
        assert_eq!(dispatch_named(&mut ed, "nope", &[1]).unwrap(), None);
    }
}
