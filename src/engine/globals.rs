//! Names, functions, global attributes and language strings.
//!
//! - Named handles: `set_handle_name` / `get_handle` / `get_name`
//! - Function table: callbacks registered by name, looked up when a control
//!   attribute names a function
//! - Globals: toolkit-wide attributes; DRIVER, SCREENSIZE and CURSORPOS are
//!   computed and read-only
//! - Language strings: `_@KEY` values are substituted on Set

use std::rc::Rc;

use tracing::{debug, trace};

use super::events::{Callback, CallbackArgs};
use super::registry::Handle;
use super::toolkit::Toolkit;
use crate::types::{CallbackResult, NativeType};

const DEFAULT_LANGUAGE: &str = "ENGLISH";

impl Toolkit {
    // =========================================================================
    // Named Handles
    // =========================================================================

    /// Bind (or unbind with `None`) a name. Returns the previous holder.
    pub fn set_handle_name(&mut self, name: &str, h: Option<Handle>) -> Option<Handle> {
        if name.is_empty() {
            return None;
        }
        let previous = match h {
            Some(h) if self.controls.is_alive(h) => self.names.insert(name.to_string(), h),
            Some(_) => return None,
            None => self.names.remove(name),
        };
        trace!(name, ?h, "handle name");
        previous.filter(|&p| self.controls.is_alive(p))
    }

    pub fn get_handle(&self, name: &str) -> Option<Handle> {
        self.names
            .get(name)
            .copied()
            .filter(|&h| self.controls.is_alive(h))
    }

    /// A name bound to the control, preferring user names over generated ones.
    pub fn get_name(&self, h: Handle) -> Option<String> {
        let mut names: Vec<&String> = self
            .names
            .iter()
            .filter(|&(_, &holder)| holder == h)
            .map(|(name, _)| name)
            .collect();
        names.sort_by(|a, b| (a.starts_with('_'), a.as_str()).cmp(&(b.starts_with('_'), b.as_str())));
        names.first().map(|name| name.to_string())
    }

    /// All bound names, sorted.
    pub fn get_all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .names
            .iter()
            .filter(|&(_, &h)| self.controls.is_alive(h))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Names bound to dialogs, sorted.
    pub fn get_all_dialogs(&self) -> Vec<String> {
        self.get_all_names()
            .into_iter()
            .filter(|name| {
                self.get_handle(name)
                    .is_some_and(|h| self.class_type(h) == Some(NativeType::Dialog))
            })
            .collect()
    }

    /// Drop every name bound to `h`. Returns how many were removed.
    pub(crate) fn remove_names_of(&mut self, h: Handle) -> usize {
        let before = self.names.len();
        self.names.retain(|_, holder| *holder != h);
        before - self.names.len()
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Register a callback under a global name.
    pub fn set_function<F>(&mut self, name: &str, f: F) -> Option<Callback>
    where
        F: Fn(&mut Toolkit, Handle, &CallbackArgs) -> CallbackResult + 'static,
    {
        self.functions.insert(name.to_string(), Rc::new(f))
    }

    pub fn unset_function(&mut self, name: &str) -> Option<Callback> {
        self.functions.remove(name)
    }

    pub fn get_function(&self, name: &str) -> Option<Callback> {
        self.functions.get(name).cloned()
    }

    // =========================================================================
    // Globals
    // =========================================================================

    /// Set a global attribute. Computed globals ignore Set.
    pub fn set_global(&mut self, name: &str, value: Option<&str>) {
        if matches!(name, "DRIVER" | "SCREENSIZE" | "CURSORPOS") {
            trace!(name, "read-only global ignored");
            return;
        }
        match value {
            Some(value) => {
                self.globals.set(name, value);
            }
            None => {
                self.globals.remove(name);
            }
        }
        debug!(name, ?value, "global set");
    }

    pub fn get_global(&self, name: &str) -> Option<String> {
        match name {
            "DRIVER" => Some(self.driver.name().to_string()),
            "SCREENSIZE" => {
                let (w, h) = self.driver.screen_size();
                Some(format!("{w}x{h}"))
            }
            "CURSORPOS" => {
                let (x, y) = self.driver.cursor_pos();
                Some(format!("{x}x{y}"))
            }
            "LANGUAGE" => Some(
                self.globals
                    .get("LANGUAGE")
                    .unwrap_or(DEFAULT_LANGUAGE)
                    .to_string(),
            ),
            _ => self.globals.get(name).map(str::to_string),
        }
    }

    pub fn get_global_int(&self, name: &str) -> i32 {
        self.get_global(name)
            .and_then(|v| super::attrib::parse_int(&v))
            .unwrap_or(0)
    }

    // =========================================================================
    // Language Strings
    // =========================================================================

    pub fn set_language_string(&mut self, key: &str, value: &str) {
        self.language_strings
            .insert(key.to_string(), value.to_string());
    }

    pub fn get_language_string(&self, key: &str) -> Option<&str> {
        self.language_strings.get(key).map(String::as_str)
    }

    /// `_@KEY` → table value; anything else is returned unchanged.
    pub(crate) fn substitute_language(&self, value: &str) -> String {
        value
            .strip_prefix("_@")
            .and_then(|key| self.language_strings.get(key))
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }
}
