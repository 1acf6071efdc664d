//! Menu family - `menu`, `item`, `submenu` and `separator`.
//!
//! A top-level menu is either free-standing (shown with [`Toolkit::popup`])
//! or the menu bar of a dialog. Controls inside a free-standing menu take
//! their serials from the menu's own child counter; inside a menu bar they
//! share the dialog's counter.

use tracing::debug;

use crate::driver::DriverError;
use crate::engine::{AttrFlags, ClassMethods, ControlClass, ControlData, Handle, Toolkit};
use crate::error::{Result, ToolkitError};
use crate::types::{
    CENTER, CENTERPARENT, ChildType, LEFT, MOUSEPOS, NativeType, Param, RIGHT,
};

use super::base::push_native;
use super::dialog::FIRST_CHILD_ID;

/// Private data of a top-level menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuData {
    /// Next serial for a control mapped inside a free-standing menu.
    pub child_id: i32,
    /// Dialog showing this menu as its menu bar.
    pub bar_of: Option<Handle>,
}

impl Default for MenuData {
    fn default() -> Self {
        Self {
            child_id: FIRST_CHILD_ID,
            bar_of: None,
        }
    }
}

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    let menu = ControlClass::new("menu")
        .parent("element")
        .native_type(NativeType::Menu)
        .child_type(ChildType::Many)
        .interactive(true)
        .format("G")
        .methods(ClassMethods {
            create: Some(create_menu),
            ..Default::default()
        });
    tk.register_class(menu)?;

    let mut item = ControlClass::new("item")
        .parent("element")
        .native_type(NativeType::Menu)
        .interactive(true)
        .format("SS")
        .methods(ClassMethods {
            create: Some(super::base::create_with_title),
            ..Default::default()
        });
    item.register_attribute("TITLE", None, Some(set_item_title), None, AttrFlags::NO_INHERIT);
    item.register_attribute("KEY", None, Some(set_key), None, AttrFlags::NO_INHERIT | AttrFlags::NOT_MAPPED);
    item.register_attribute("VALUE", None, Some(set_value), Some("OFF"), AttrFlags::NO_INHERIT);
    item.register_attribute("ACTION", None, None, None, AttrFlags::NO_INHERIT | AttrFlags::NOT_MAPPED);
    tk.register_class(item)?;

    let mut submenu = ControlClass::new("submenu")
        .parent("element")
        .native_type(NativeType::Menu)
        .child_type(ChildType::One)
        .interactive(true)
        .format("SH")
        .methods(ClassMethods {
            create: Some(create_submenu),
            ..Default::default()
        });
    submenu.register_attribute("TITLE", None, Some(set_item_title), None, AttrFlags::NO_INHERIT);
    submenu.register_attribute("KEY", None, Some(set_key), None, AttrFlags::NO_INHERIT | AttrFlags::NOT_MAPPED);
    tk.register_class(submenu)?;

    tk.register_class(
        ControlClass::new("separator")
            .parent("element")
            .native_type(NativeType::Menu),
    )?;
    Ok(())
}

fn is_menu_type(tk: &Toolkit, h: Handle) -> bool {
    tk.class_type(h) == Some(NativeType::Menu)
}

/// Menu children given at creation; non-menu controls are skipped.
fn create_menu(tk: &mut Toolkit, h: Handle, params: &[Param]) -> Result<()> {
    if let Some(control) = tk.control_mut(h) {
        control.data = ControlData::Menu(MenuData::default());
    }
    if let Some(Param::Handles(children)) = params.first() {
        for &child in children {
            if is_menu_type(tk, child) {
                tk.append(h, child)?;
            }
        }
    }
    Ok(())
}

fn create_submenu(tk: &mut Toolkit, h: Handle, params: &[Param]) -> Result<()> {
    if let Some(title) = params.first().and_then(Param::as_str) {
        tk.store_raw(h, "TITLE", Some(title));
    }
    if let Some(child) = params.get(1).and_then(Param::as_handle) {
        if is_menu_type(tk, child) {
            tk.append(h, child)?;
        }
    }
    Ok(())
}

/// The native title carries the mnemonic marker when KEY is set.
fn set_item_title(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let key = tk.get_attribute(h, "KEY");
    let shown = value.map(|title| mnemonic_title(title, key.as_deref()));
    push_native(tk, h, "TITLE", shown.as_deref());
    true
}

fn set_key(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    tk.store_raw(h, "KEY", value);
    if tk.is_mapped(h) {
        let title = tk.get_attribute(h, "TITLE");
        let shown = title.map(|title| mnemonic_title(&title, value));
        push_native(tk, h, "TITLE", shown.as_deref());
    }
    true
}

fn set_value(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let normalized = value.map(|v| match v.to_ascii_uppercase().as_str() {
        "ON" | "YES" => "ON",
        _ => "OFF",
    });
    push_native(tk, h, "VALUE", normalized);
    true
}

/// Character named by a KEY value: `K_x` or a single character.
fn key_char(key: &str) -> Option<char> {
    let name = key.strip_prefix("K_").unwrap_or(key);
    let mut chars = name.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// Insert `&` before the first occurrence of the KEY character.
pub fn mnemonic_title(title: &str, key: Option<&str>) -> String {
    let Some(c) = key.and_then(key_char) else {
        return title.to_string();
    };
    match title.find(c) {
        Some(pos) => format!("{}&{}", &title[..pos], &title[pos..]),
        None => title.to_string(),
    }
}

/// Resolve the symbolic popup positions against the screen and cursor.
fn adjust_position(tk: &Toolkit, x: i32, y: i32) -> (i32, i32) {
    let (screen_w, screen_h) = tk.driver.screen_size();
    let (cursor_x, cursor_y) = tk.driver.cursor_pos();
    let resolve = |v: i32, screen: i32, cursor: i32| match v {
        CENTER | CENTERPARENT => screen / 2,
        LEFT => 0,
        RIGHT => screen,
        MOUSEPOS => cursor,
        other => other,
    };
    (resolve(x, screen_w, cursor_x), resolve(y, screen_h, cursor_y))
}

impl Toolkit {
    /// Whether `h` is a menu shown as a dialog's menu bar.
    pub fn is_menu_bar(&self, h: Handle) -> bool {
        self.control(h)
            .and_then(|c| c.menu_data())
            .and_then(|d| d.bar_of)
            .is_some_and(|dialog| self.is_alive(dialog))
    }

    /// `iup-<class>-<serial>` for a mapped menu control.
    pub fn menu_child_id(&self, h: Handle) -> Option<String> {
        let serial = self.serial(h);
        if serial < 0 || self.class_type(h) != Some(NativeType::Menu) {
            return None;
        }
        Some(format!("iup-{}-{}", self.class_name(h)?, serial))
    }

    /// Show a free-standing menu at `(x, y)`, mapping it first.
    ///
    /// Coordinates may be `CENTER`, `LEFT`, `RIGHT`, `MOUSEPOS` or
    /// `CENTERPARENT` (treated as `CENTER`).
    pub fn popup(&mut self, h: Handle, x: i32, y: i32) -> Result<()> {
        if !self.is_alive(h) {
            return Err(ToolkitError::StaleHandle);
        }
        if !self.class_match(h, "menu") || self.is_menu_bar(h) || self.get_parent(h).is_some() {
            return Err(ToolkitError::Driver(DriverError::Unsupported("popup")));
        }

        self.map(h)?;
        let native = self
            .native(h)
            .ok_or_else(|| ToolkitError::NotMapped("menu".to_string()))?;
        let (x, y) = adjust_position(self, x, y);
        debug!(handle = %h, x, y, "menu popup");
        self.driver.menu_popup(native, x, y)?;
        Ok(())
    }
}
