//! Base classes - `element`, `label` and `button`.
//!
//! `element` is the root of every standard class. It carries the attributes
//! all controls share: identity (WID, NAME), the inheritable look (ACTIVE,
//! VISIBLE, FONT, BGCOLOR, FGCOLOR), TITLE and the layout readouts.

use crate::engine::{AttrFlags, ClassMethods, ControlClass, Handle, Toolkit};
use crate::error::Result;
use crate::types::{NativeType, Param, Rgb};

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    tk.register_class(element_class())?;
    tk.register_class(label_class())?;
    tk.register_class(button_class())?;
    Ok(())
}

fn element_class() -> ControlClass {
    let mut class = ControlClass::new("element");
    let inherit = AttrFlags::empty();
    let local = AttrFlags::NO_INHERIT;

    class.register_attribute("WID", Some(get_wid), None, None, local | AttrFlags::MAPPED | AttrFlags::NO_STRING);
    class.register_attribute("NAME", None, Some(set_name), None, local | AttrFlags::NOT_MAPPED);
    class.register_attribute("ACTIVE", None, Some(set_active), Some("YES"), inherit);
    class.register_attribute("VISIBLE", None, Some(set_visible), Some("YES"), inherit);
    class.register_attribute_global("FONT", None, Some(set_font), Some("Sans, 10"), Some("DEFAULTFONT"), inherit);
    class.register_attribute("BGCOLOR", None, Some(set_bgcolor), None, inherit);
    class.register_attribute("FGCOLOR", None, Some(set_fgcolor), None, inherit);
    class.register_attribute("TITLE", Some(get_title), Some(set_title), None, local);
    class.register_attribute("RASTERSIZE", None, None, None, local | AttrFlags::NO_SAVE);
    class.register_attribute("NATURALSIZE", Some(get_natural_size), None, None, local | AttrFlags::NOT_MAPPED);
    class.register_attribute("POSITION", Some(get_position), None, None, local | AttrFlags::NOT_MAPPED);
    class
}

fn label_class() -> ControlClass {
    let mut class = ControlClass::new("label")
        .parent("element")
        .native_type(NativeType::Control)
        .format("S")
        .methods(ClassMethods {
            create: Some(create_with_title),
            ..Default::default()
        });
    class.register_attribute("ALIGNMENT", None, Some(set_alignment), Some("ALEFT"), AttrFlags::NO_INHERIT);
    class
}

fn button_class() -> ControlClass {
    let mut class = ControlClass::new("button")
        .parent("element")
        .native_type(NativeType::Control)
        .interactive(true)
        .format("SS")
        .methods(ClassMethods {
            create: Some(create_with_title),
            ..Default::default()
        });
    class.register_attribute("ACTION", None, None, None, AttrFlags::NO_INHERIT | AttrFlags::NOT_MAPPED);
    class.register_attribute("ALIGNMENT", None, Some(set_alignment), Some("ACENTER"), AttrFlags::NO_INHERIT);
    class
}

/// `title[, action]` creation parameters.
pub(crate) fn create_with_title(tk: &mut Toolkit, h: Handle, params: &[Param]) -> Result<()> {
    if let Some(title) = params.first().and_then(Param::as_str) {
        tk.store_raw(h, "TITLE", Some(title));
    }
    if let Some(action) = params.get(1).and_then(Param::as_str) {
        tk.store_raw(h, "ACTION", Some(action));
    }
    Ok(())
}

/// Forward a value to the native element when there is one.
pub(crate) fn push_native(tk: &mut Toolkit, h: Handle, name: &str, value: Option<&str>) {
    if let Some(native) = tk.native(h) {
        tk.driver.set_native_attribute(native, name, value);
    }
}

fn get_wid(tk: &Toolkit, h: Handle) -> Option<String> {
    tk.native(h).map(|native| native.to_string())
}

fn set_name(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let old = tk
        .control(h)
        .and_then(|c| c.attributes.get("NAME"))
        .map(str::to_string);
    if let Some(old) = old {
        if tk.get_handle(&old) == Some(h) {
            tk.set_handle_name(&old, None);
        }
    }
    if let Some(name) = value {
        tk.set_handle_name(name, Some(h));
    }
    true
}

fn set_active(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    push_native(tk, h, "ACTIVE", value);
    true
}

fn set_visible(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    push_native(tk, h, "VISIBLE", value);
    true
}

fn set_font(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    push_native(tk, h, "FONT", value);
    true
}

fn set_bgcolor(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    set_color(tk, h, "BGCOLOR", value)
}

fn set_fgcolor(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    set_color(tk, h, "FGCOLOR", value)
}

fn set_color(tk: &mut Toolkit, h: Handle, name: &str, value: Option<&str>) -> bool {
    match value {
        Some(text) => match Rgb::parse(text) {
            Some(color) => {
                push_native(tk, h, name, Some(&color.to_string()));
                true
            }
            None => false,
        },
        None => {
            push_native(tk, h, name, None);
            true
        }
    }
}

fn get_title(tk: &Toolkit, h: Handle) -> Option<String> {
    let native = tk.native(h)?;
    tk.driver.get_native_attribute(native, "TITLE")
}

fn set_title(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    push_native(tk, h, "TITLE", value);
    true
}

fn set_alignment(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    push_native(tk, h, "ALIGNMENT", value);
    true
}

fn get_natural_size(tk: &Toolkit, h: Handle) -> Option<String> {
    let (w, height) = tk.natural_size(h);
    Some(format!("{w}x{height}"))
}

fn get_position(tk: &Toolkit, h: Handle) -> Option<String> {
    let (x, y) = tk.position(h);
    Some(format!("{x},{y}"))
}
