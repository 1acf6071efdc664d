//! Events - Callbacks, native event dispatch, timers and focus.
//!
//! Callbacks are `Rc` closures. They are cloned out of the control before the
//! call, so a callback may freely mutate the toolkit, including destroying the
//! control it was called for.
//!
//! Native events reach the engine as a native handle plus a [`NativeEvent`].
//! The handle is resolved through the live lookup table on every delivery;
//! an event for a native that no longer exists is dropped.
//!
//! # Example
//!
//! ```ignore
//! tk.set_callback(button, "ACTION", |tk, _h, _args| {
//!     tk.set_global("LAST", Some("clicked"));
//!     CallbackResult::Default
//! });
//! tk.dispatch_native_event(native, NativeEvent::Action);
//! ```

use std::rc::Rc;

use tracing::{debug, trace};

use super::attrib::parse_boolean;
use super::registry::Handle;
use super::toolkit::Toolkit;
use crate::types::{CallbackResult, NativeHandle};

/// Application callback.
pub type Callback = Rc<dyn Fn(&mut Toolkit, Handle, &CallbackArgs) -> CallbackResult>;

// =============================================================================
// Callback Arguments
// =============================================================================

/// Arguments passed along with a callback.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallbackArgs {
    #[default]
    None,
    /// A tree node id.
    Node(i32),
    Selection {
        node: i32,
        selected: bool,
    },
    Nodes(Vec<i32>),
    Rename {
        node: i32,
        title: String,
    },
    DragDrop {
        drag: i32,
        drop: i32,
        shift: bool,
        control: bool,
    },
    /// Key code with modifier bits.
    Key(i32),
    Cell {
        lin: i32,
        col: i32,
    },
}

// =============================================================================
// Native Events
// =============================================================================

/// Something the native side reports about one of its elements.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    Action,
    Selection { node: i32, selected: bool },
    MultiSelection(Vec<i32>),
    BranchOpen(i32),
    BranchClose(i32),
    ExecuteLeaf(i32),
    RightClick(i32),
    Rename { node: i32, title: String },
    DragDrop { drag: i32, drop: i32, shift: bool, control: bool },
    Key(i32),
    FocusIn,
    FocusOut,
}

impl NativeEvent {
    /// Callback invoked for the event.
    pub const fn callback_name(&self) -> &'static str {
        match self {
            Self::Action => "ACTION",
            Self::Selection { .. } => "SELECTION_CB",
            Self::MultiSelection(_) => "MULTISELECTION_CB",
            Self::BranchOpen(_) => "BRANCHOPEN_CB",
            Self::BranchClose(_) => "BRANCHCLOSE_CB",
            Self::ExecuteLeaf(_) => "EXECUTELEAF_CB",
            Self::RightClick(_) => "RIGHTCLICK_CB",
            Self::Rename { .. } => "RENAME_CB",
            Self::DragDrop { .. } => "DRAGDROP_CB",
            Self::Key(_) => "K_ANY",
            Self::FocusIn => "GETFOCUS_CB",
            Self::FocusOut => "KILLFOCUS_CB",
        }
    }

    /// Arguments the callback receives.
    pub fn args(&self) -> CallbackArgs {
        match self {
            Self::Action | Self::FocusIn | Self::FocusOut => CallbackArgs::None,
            Self::Selection { node, selected } => CallbackArgs::Selection {
                node: *node,
                selected: *selected,
            },
            Self::MultiSelection(nodes) => CallbackArgs::Nodes(nodes.clone()),
            Self::BranchOpen(node)
            | Self::BranchClose(node)
            | Self::ExecuteLeaf(node)
            | Self::RightClick(node) => CallbackArgs::Node(*node),
            Self::Rename { node, title } => CallbackArgs::Rename {
                node: *node,
                title: title.clone(),
            },
            Self::DragDrop { drag, drop, shift, control } => CallbackArgs::DragDrop {
                drag: *drag,
                drop: *drop,
                shift: *shift,
                control: *control,
            },
            Self::Key(code) => CallbackArgs::Key(*code),
        }
    }
}

impl Toolkit {
    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Register a callback on a control. Returns the one it replaces.
    pub fn set_callback<F>(&mut self, h: Handle, name: &str, f: F) -> Option<Callback>
    where
        F: Fn(&mut Toolkit, Handle, &CallbackArgs) -> CallbackResult + 'static,
    {
        let control = self.controls.get_mut(h)?;
        control.callbacks.insert(name.to_string(), Rc::new(f))
    }

    pub fn unset_callback(&mut self, h: Handle, name: &str) -> Option<Callback> {
        self.controls.get_mut(h)?.callbacks.remove(name)
    }

    /// Callback registered on the control, or the global function named by
    /// the control's attribute of the same name.
    pub fn get_callback(&self, h: Handle, name: &str) -> Option<Callback> {
        let control = self.controls.get(h)?;
        if let Some(callback) = control.callbacks.get(name) {
            return Some(Rc::clone(callback));
        }
        let function = control.attributes.get(name)?;
        self.functions.get(function).cloned()
    }

    /// Invoke a callback. A missing callback answers `Default`.
    pub fn call_callback(&mut self, h: Handle, name: &str, args: &CallbackArgs) -> CallbackResult {
        let Some(callback) = self.get_callback(h, name) else {
            return CallbackResult::Default;
        };
        trace!(handle = %h, name, ?args, "callback");
        callback(self, h, args)
    }

    // =========================================================================
    // Native Events
    // =========================================================================

    /// Deliver an event reported for a native element.
    ///
    /// Natives without a live control are ignored.
    pub fn dispatch_native_event(&mut self, native: NativeHandle, event: NativeEvent) -> CallbackResult {
        match self.from_native(native) {
            Some(h) => self.dispatch_event(h, &event),
            None => {
                trace!(%native, ?event, "event for unknown native dropped");
                CallbackResult::Default
            }
        }
    }

    /// Deliver an event to a control. The class may take over the event;
    /// otherwise the standard callback runs. `Close` asks the loop to exit.
    pub fn dispatch_event(&mut self, h: Handle, event: &NativeEvent) -> CallbackResult {
        let Some(class) = self.controls.get(h).map(|c| c.class) else {
            return CallbackResult::Default;
        };

        match event {
            NativeEvent::FocusIn => {
                self.focus.set(Some(h));
            }
            NativeEvent::FocusOut if self.focus.get() == Some(h) => {
                self.focus.set(None);
            }
            _ => {}
        }

        let handled = match self.classes.find_method(class, |m| m.handle_event) {
            Some(handle) => handle(self, h, event),
            None => None,
        };
        let result = match handled {
            Some(result) => result,
            None => self.call_callback(h, event.callback_name(), &event.args()),
        };

        if result == CallbackResult::Close {
            self.request_exit();
        }
        result
    }

    /// A driver timer elapsed. Stale timer ids are ignored.
    pub fn fire_timer(&mut self, timer_id: i32) -> CallbackResult {
        let Some(h) = self
            .timer_table
            .get(&timer_id)
            .copied()
            .filter(|&h| self.controls.is_alive(h))
        else {
            trace!(timer_id, "tick for unknown timer dropped");
            return CallbackResult::Default;
        };

        let result = self.call_callback(h, "ACTION_CB", &CallbackArgs::None);
        if result == CallbackResult::Close {
            self.request_exit();
        }
        result
    }

    /// Ask the event loop to return.
    pub fn request_exit(&mut self) {
        debug!("exit requested");
        self.exit_requested.set(true);
        self.driver.exit_loop();
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.get()
    }

    /// Clear a pending exit request, returning whether there was one.
    pub fn take_exit_request(&mut self) -> bool {
        let requested = self.exit_requested.get();
        self.exit_requested.set(false);
        requested
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Give keyboard focus to a mapped control. Returns the previous holder.
    pub fn set_focus(&mut self, h: Handle) -> Option<Handle> {
        let previous = self.get_focus();
        if !self.is_mapped(h) || previous == Some(h) {
            return previous;
        }

        if let Some(old) = previous {
            self.call_callback(old, "KILLFOCUS_CB", &CallbackArgs::None);
        }
        if !self.is_alive(h) {
            return previous;
        }

        self.focus.set(Some(h));
        if let Some(native) = self.native(h) {
            self.driver.set_focus(native);
        }
        self.call_callback(h, "GETFOCUS_CB", &CallbackArgs::None);
        previous
    }

    pub fn get_focus(&self) -> Option<Handle> {
        self.focus.get().filter(|&h| self.controls.is_alive(h))
    }

    /// Move focus to the next focusable control of the dialog, wrapping.
    pub fn next_field(&mut self, h: Handle) -> Option<Handle> {
        let target = self.neighbor_field(h, 1)?;
        self.set_focus(target);
        Some(target)
    }

    /// Move focus to the previous focusable control of the dialog, wrapping.
    pub fn previous_field(&mut self, h: Handle) -> Option<Handle> {
        let target = self.neighbor_field(h, -1)?;
        self.set_focus(target);
        Some(target)
    }

    fn neighbor_field(&self, h: Handle, step: isize) -> Option<Handle> {
        let root = self.get_dialog(h).or_else(|| self.root_of(h))?;
        let fields: Vec<Handle> = self
            .descendants(root)
            .into_iter()
            .filter(|&c| self.can_focus(c))
            .collect();
        if fields.is_empty() {
            return None;
        }

        let len = fields.len() as isize;
        let index = match fields.iter().position(|&c| c == h) {
            Some(pos) => (pos as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        Some(fields[index as usize])
    }

    fn can_focus(&self, h: Handle) -> bool {
        let interactive = self
            .controls
            .get(h)
            .is_some_and(|c| self.classes.get(c.class).interactive);
        let enabled = |name: &str| self.get_attribute(h, name).is_none_or(|v| parse_boolean(&v));
        interactive && self.is_mapped(h) && enabled("ACTIVE") && enabled("VISIBLE")
    }
}
