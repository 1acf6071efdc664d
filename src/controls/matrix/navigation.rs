//! Keyboard navigation between cells.
//!
//! Home and End count consecutive presses: the first press goes to the first
//! or last column of the line, a second one to the first or last cell of the
//! matrix. Any other key resets both counts.
//!
//! Moving the focus asks the cell being left through `LEAVEITEM_CB`; an
//! `IGNORE` answer keeps the focus where it is. The new cell then gets
//! `ENTERITEM_CB`.

use tracing::trace;

use super::data_mut;
use crate::controls::base::push_native;
use crate::engine::{CallbackArgs, Handle, Toolkit};
use crate::types::{CallbackResult, keys};

pub(super) fn on_key(tk: &mut Toolkit, h: Handle, code: i32) -> Option<CallbackResult> {
    let page = tk.get_int(h, "NUMLIN_VISIBLE").max(1) as usize;
    let data = data_mut(tk, h)?;
    let key = keys::base(code);

    match key {
        keys::K_HOME => {
            data.home_count += 1;
            data.end_count = 0;
        }
        keys::K_END => {
            data.end_count += 1;
            data.home_count = 0;
        }
        _ => {
            data.home_count = 0;
            data.end_count = 0;
        }
    }

    let (lines, cols) = (data.num_lines(), data.num_cols());
    let (lin, col) = data.focus;
    let target = match key {
        keys::K_LEFT => (lin, col.saturating_sub(1).max(1)),
        keys::K_RIGHT => (lin, (col + 1).min(cols)),
        keys::K_UP => (lin.saturating_sub(1).max(1), col),
        keys::K_DOWN => ((lin + 1).min(lines), col),
        keys::K_PGUP => (lin.saturating_sub(page).max(1), col),
        keys::K_PGDN => ((lin + page).min(lines), col),
        keys::K_HOME if data.home_count == 1 => (lin, 1),
        keys::K_HOME => (1, 1),
        keys::K_END if data.end_count == 1 => (lin, cols),
        keys::K_END => (lines, cols),
        _ => return None,
    };

    if lines == 0 || cols == 0 {
        return Some(CallbackResult::Default);
    }
    Some(move_focus(tk, h, target))
}

/// Move the focus cell, letting the application refuse leaving the old one.
fn move_focus(tk: &mut Toolkit, h: Handle, target: (usize, usize)) -> CallbackResult {
    let Some(current) = data_mut(tk, h).map(|d| d.focus) else {
        return CallbackResult::Default;
    };
    if current == target {
        return CallbackResult::Default;
    }

    let leave = CallbackArgs::Cell {
        lin: current.0 as i32,
        col: current.1 as i32,
    };
    if tk.call_callback(h, "LEAVEITEM_CB", &leave) == CallbackResult::Ignore {
        return CallbackResult::Ignore;
    }
    let Some(data) = data_mut(tk, h) else {
        return CallbackResult::Default;
    };
    data.focus = target;
    trace!(handle = %h, lin = target.0, col = target.1, "matrix focus");

    push_native(tk, h, "FOCUS_CELL", Some(&format!("{}:{}", target.0, target.1)));
    let enter = CallbackArgs::Cell {
        lin: target.0 as i32,
        col: target.1 as i32,
    };
    tk.call_callback(h, "ENTERITEM_CB", &enter)
}
