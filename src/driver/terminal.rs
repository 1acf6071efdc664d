//! Terminal driver - Screen and cursor queries from the controlling terminal.
//!
//! Natives live in the same in-memory pool as the headless driver; sizes are
//! measured in character cells.

use std::collections::BTreeSet;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::headless::NativePool;
use super::{Driver, DriverError, MapRequest};
use crate::types::{NativeHandle, keys};

/// Fallback when the terminal cannot be queried (not a tty).
const FALLBACK_SIZE: (i32, i32) = (80, 24);

#[derive(Debug, Default)]
pub struct TerminalDriver {
    pool: NativePool,
    timers: BTreeSet<i32>,
    next_timer: i32,
    focus: Option<NativeHandle>,
    exit_requested: bool,
}

impl TerminalDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `exit_loop` was called since the last check.
    pub fn take_exit_request(&mut self) -> bool {
        std::mem::take(&mut self.exit_requested)
    }

    pub fn focus(&self) -> Option<NativeHandle> {
        self.focus
    }

    pub fn running_timers(&self) -> Vec<i32> {
        self.timers.iter().copied().collect()
    }
}

impl Driver for TerminalDriver {
    fn name(&self) -> &str {
        "TERMINAL"
    }

    fn map(&mut self, request: &MapRequest) -> Result<NativeHandle, DriverError> {
        let native = self.pool.create(request)?;
        if let Some(title) = &request.title {
            self.pool.set_attribute(native, "TITLE", Some(title));
        }
        Ok(native)
    }

    fn unmap(&mut self, native: NativeHandle) {
        self.pool.remove(native);
        if self.focus == Some(native) {
            self.focus = None;
        }
    }

    fn set_native_attribute(&mut self, native: NativeHandle, name: &str, value: Option<&str>) -> bool {
        self.pool.set_attribute(native, name, value)
    }

    fn get_native_attribute(&self, native: NativeHandle, name: &str) -> Option<String> {
        self.pool.get_attribute(native, name)
    }

    fn natural_size(&self, _class: &str, title: Option<&str>) -> (i32, i32) {
        match title {
            Some(title) if !title.is_empty() => (title.chars().count() as i32, 1),
            _ => (0, 0),
        }
    }

    fn screen_size(&self) -> (i32, i32) {
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => (cols as i32, rows as i32),
            Ok(_) => FALLBACK_SIZE,
            Err(err) => {
                tracing::debug!(%err, "terminal size unavailable");
                FALLBACK_SIZE
            }
        }
    }

    fn cursor_pos(&self) -> (i32, i32) {
        match crossterm::cursor::position() {
            Ok((col, row)) => (col as i32, row as i32),
            Err(err) => {
                tracing::debug!(%err, "cursor position unavailable");
                (0, 0)
            }
        }
    }

    fn reparent(&mut self, native: NativeHandle, new_parent: Option<NativeHandle>) -> Result<(), DriverError> {
        self.pool.reparent(native, new_parent)
    }

    fn set_focus(&mut self, native: NativeHandle) {
        self.focus = Some(native);
    }

    fn timer_start(&mut self, _interval_ms: u32) -> Option<i32> {
        self.next_timer += 1;
        self.timers.insert(self.next_timer);
        Some(self.next_timer)
    }

    fn timer_stop(&mut self, timer_id: i32) {
        self.timers.remove(&timer_id);
    }

    fn menu_popup(&mut self, native: NativeHandle, x: i32, y: i32) -> Result<(), DriverError> {
        if self.pool.get(native).is_none() {
            return Err(DriverError::UnknownNative(native));
        }
        self.pool.set_attribute(native, "POPUPPOS", Some(&format!("{x},{y}")));
        Ok(())
    }

    fn exit_loop(&mut self) {
        self.exit_requested = true;
    }
}

// =============================================================================
// KEY EVENT CONVERSION
// =============================================================================

/// Convert a crossterm key event to a toolkit key code.
pub fn translate_key(event: &KeyEvent) -> Option<i32> {
    let code = match event.code {
        KeyCode::Char(c) => c as i32,
        KeyCode::Enter => keys::K_CR,
        KeyCode::Tab => keys::K_TAB,
        KeyCode::BackTab => keys::K_TAB | keys::SHIFT_MASK,
        KeyCode::Backspace => keys::K_BS,
        KeyCode::Delete => keys::K_DEL,
        KeyCode::Insert => keys::K_INS,
        KeyCode::Esc => keys::K_ESC,
        KeyCode::Up => keys::K_UP,
        KeyCode::Down => keys::K_DOWN,
        KeyCode::Left => keys::K_LEFT,
        KeyCode::Right => keys::K_RIGHT,
        KeyCode::Home => keys::K_HOME,
        KeyCode::End => keys::K_END,
        KeyCode::PageUp => keys::K_PGUP,
        KeyCode::PageDown => keys::K_PGDN,
        KeyCode::F(n) if (1..=12).contains(&n) => keys::K_F1 + n as i32 - 1,
        _ => return None,
    };

    let mut code = code;
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        code |= keys::CTRL_MASK;
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        code |= keys::ALT_MASK;
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) && !matches!(event.code, KeyCode::Char(_)) {
        code |= keys::SHIFT_MASK;
    }
    Some(code)
}
