//! Dialog - Top-level window with one child and an optional menu bar.
//!
//! A dialog owns the child-id counter shared by every control mapped inside
//! it (and inside its menu bar). The menu bar is not a tree child: the MENU
//! attribute names a `menu` control, which is mapped and unmapped together
//! with the dialog.

use tracing::warn;

use crate::engine::{AttrFlags, ClassMethods, ControlClass, ControlData, Handle, Toolkit};
use crate::error::Result;
use crate::types::{ChildType, NativeType, Param};

/// First id handed out by a dialog's child counter.
pub const FIRST_CHILD_ID: i32 = 100;

/// Private data of a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogData {
    /// Next serial for a control mapped inside the dialog.
    pub child_id: i32,
    /// Menu bar shown by the dialog.
    pub menu: Option<Handle>,
}

impl Default for DialogData {
    fn default() -> Self {
        Self {
            child_id: FIRST_CHILD_ID,
            menu: None,
        }
    }
}

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    let mut class = ControlClass::new("dialog")
        .parent("element")
        .native_type(NativeType::Dialog)
        .child_type(ChildType::One)
        .format("H")
        .methods(ClassMethods {
            create: Some(create),
            destroy: Some(destroy),
            set_children_current_size: Some(set_child_size),
            ..Default::default()
        });
    class.register_attribute(
        "MENU",
        None,
        Some(set_menu),
        None,
        AttrFlags::NOT_MAPPED | AttrFlags::NO_INHERIT | AttrFlags::NO_STRING,
    );
    tk.register_class(class)?;
    Ok(())
}

fn create(tk: &mut Toolkit, h: Handle, params: &[Param]) -> Result<()> {
    if let Some(control) = tk.control_mut(h) {
        control.data = ControlData::Dialog(DialogData::default());
    }
    if let Some(child) = params.first().and_then(Param::as_handle) {
        tk.append(h, child)?;
    }
    Ok(())
}

/// The menu bar outlives the dialog as a free-standing menu.
fn destroy(tk: &mut Toolkit, h: Handle) {
    let menu = tk.control(h).and_then(|c| c.dialog_data()).and_then(|d| d.menu);
    if let Some(menu) = menu {
        if let Some(data) = tk.control_mut(menu).and_then(|c| c.menu_data_mut()) {
            if data.bar_of == Some(h) {
                data.bar_of = None;
            }
        }
    }
}

/// The single child fills the dialog.
fn set_child_size(tk: &mut Toolkit, h: Handle) {
    let size = tk.current_size(h);
    for child in tk.children(h) {
        let (nw, nh) = tk.natural_size(child);
        tk.set_current_size(child, (size.0.max(nw), size.1.max(nh)));
    }
}

fn set_menu(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let new_menu = match value {
        Some(name) => match tk.get_handle(name) {
            Some(menu) if tk.class_match(menu, "menu") && tk.get_parent(menu).is_none() => Some(menu),
            _ => {
                warn!(name, "MENU does not name a top-level menu");
                return false;
            }
        },
        None => None,
    };

    let old_menu = tk.control(h).and_then(|c| c.dialog_data()).and_then(|d| d.menu);
    if old_menu == new_menu {
        return true;
    }
    if let Some(old) = old_menu {
        tk.unmap(old);
        if let Some(data) = tk.control_mut(old).and_then(|c| c.menu_data_mut()) {
            data.bar_of = None;
        }
    }

    if let Some(menu) = new_menu {
        // A menu shows in one dialog at a time
        let previous_owner = tk.control(menu).and_then(|c| c.menu_data()).and_then(|d| d.bar_of);
        if let Some(owner) = previous_owner.filter(|&o| o != h) {
            tk.unmap(menu);
            if let Some(data) = tk.control_mut(owner).and_then(|c| c.dialog_data_mut()) {
                data.menu = None;
            }
            tk.store_raw(owner, "MENU", None);
        }
        if let Some(data) = tk.control_mut(menu).and_then(|c| c.menu_data_mut()) {
            data.bar_of = Some(h);
        }
    }
    if let Some(data) = tk.control_mut(h).and_then(|c| c.dialog_data_mut()) {
        data.menu = new_menu;
    }

    if let Some(menu) = new_menu {
        if tk.is_mapped(h) {
            if let Err(err) = tk.map(menu) {
                warn!(%err, "menu bar could not be mapped");
            }
        }
    }
    true
}

impl Toolkit {
    /// Map a dialog (if needed) and make it visible.
    pub fn show(&mut self, h: Handle) -> Result<()> {
        self.map(h)?;
        self.set_attribute(h, "VISIBLE", Some("YES"));
        Ok(())
    }

    pub fn hide(&mut self, h: Handle) {
        self.set_attribute(h, "VISIBLE", Some("NO"));
    }
}
