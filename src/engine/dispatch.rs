//! Attribute Dispatch - Set/Get through class handlers, store and inheritance.
//!
//! # Set
//!
//! 1. Resolve a descriptor in the class chain (exact name, then `NAME<id>` /
//!    `NAME<lin>:<col>` against indexed descriptors).
//! 2. Read-only descriptors (flag, or a getter without a setter) ignore Set.
//! 3. Unmapped controls keep the raw value; `map` re-applies it later.
//!    Descriptors flagged `NOT_MAPPED` run immediately.
//! 4. The setter decides whether the raw value stays in the store.
//!    Write-only values never stay.
//! 5. Names without a descriptor go straight to the store.
//! 6. `None` unsets: the stored value is removed and the setter sees `None`.
//! 7. Inheritable values are pushed to mapped descendants that have no local
//!    value and own a setter for the name.
//!
//! # Get
//!
//! Getter (may decline) → store → ancestors' stores (inheritable only) →
//! global default, then class default (unless `NO_DEFAULT`) → `None`.
//!
//! Dispatch never fails. Stale handles, unknown names and bad ids degrade to
//! a no-op or `None`.

use tracing::{trace, warn};

use super::attrib::{
    compose_id, compose_id2, format_attribute_list, is_internal, parse_attribute_list,
    parse_boolean, parse_float, parse_int, parse_int_pair_any,
};
use super::class::{AttrAccess, AttrFlags, ClassId, Resolved};
use super::registry::Handle;
use super::toolkit::Toolkit;
use crate::types::Rgb;

impl Toolkit {
    // =========================================================================
    // Set
    // =========================================================================

    /// Set (or unset with `None`) an attribute.
    pub fn set_attribute(&mut self, h: Handle, name: &str, value: Option<&str>) {
        let Some(control) = self.controls.get(h) else {
            warn!(name, "set_attribute on stale handle");
            return;
        };
        let class = control.class;
        let mapped = control.is_mapped();

        let value = value.map(|v| self.substitute_language(v));
        let value = value.as_deref();
        trace!(handle = %h, name, ?value, "set attribute");

        let Some(resolved) = self.classes.resolve(class, name) else {
            self.store_raw(h, name, value);
            if !is_internal(name) {
                self.notify_children(h, name, value);
            }
            return;
        };

        let flags = resolved.descriptor.flags;
        let access = resolved.descriptor.access;
        let handled = access.has_getter() || access.has_setter();

        if flags.contains(AttrFlags::READ_ONLY) || (access.has_getter() && !access.has_setter()) {
            trace!(name, "read-only attribute ignored");
            return;
        }

        if !handled {
            // descriptor only carries a default
            self.store_raw(h, name, value);
        } else if !mapped && !flags.contains(AttrFlags::NOT_MAPPED) {
            self.store_raw(h, name, value);
        } else {
            let keep = self.call_setter(h, &resolved, value);
            if keep && value.is_some() && !flags.contains(AttrFlags::WRITE_ONLY) {
                self.store_raw(h, name, value);
            } else {
                self.store_raw(h, name, None);
            }
        }

        if resolved.descriptor.is_inheritable() && !is_internal(name) {
            self.notify_children(h, name, value);
        }
    }

    /// `NAME<id>`. Negative ids are rejected silently.
    pub fn set_attribute_id(&mut self, h: Handle, name: &str, id: i32, value: Option<&str>) {
        if id < 0 {
            trace!(name, id, "negative id rejected");
            return;
        }
        self.set_attribute(h, &compose_id(name, id), value);
    }

    /// `NAME<lin>:<col>`. Negative ids are rejected silently.
    pub fn set_attribute_id2(&mut self, h: Handle, name: &str, lin: i32, col: i32, value: Option<&str>) {
        if lin < 0 || col < 0 {
            trace!(name, lin, col, "negative id rejected");
            return;
        }
        self.set_attribute(h, &compose_id2(name, lin, col), value);
    }

    pub fn set_int(&mut self, h: Handle, name: &str, value: i32) {
        self.set_attribute(h, name, Some(&value.to_string()));
    }

    pub fn set_float(&mut self, h: Handle, name: &str, value: f32) {
        self.set_attribute(h, name, Some(&value.to_string()));
    }

    pub fn set_rgb(&mut self, h: Handle, name: &str, color: Rgb) {
        self.set_attribute(h, name, Some(&color.to_string()));
    }

    pub fn set_int_id(&mut self, h: Handle, name: &str, id: i32, value: i32) {
        self.set_attribute_id(h, name, id, Some(&value.to_string()));
    }

    pub fn set_float_id(&mut self, h: Handle, name: &str, id: i32, value: f32) {
        self.set_attribute_id(h, name, id, Some(&value.to_string()));
    }

    pub fn set_rgb_id(&mut self, h: Handle, name: &str, id: i32, color: Rgb) {
        self.set_attribute_id(h, name, id, Some(&color.to_string()));
    }

    pub fn set_int_id2(&mut self, h: Handle, name: &str, lin: i32, col: i32, value: i32) {
        self.set_attribute_id2(h, name, lin, col, Some(&value.to_string()));
    }

    pub fn set_float_id2(&mut self, h: Handle, name: &str, lin: i32, col: i32, value: f32) {
        self.set_attribute_id2(h, name, lin, col, Some(&value.to_string()));
    }

    pub fn set_rgb_id2(&mut self, h: Handle, name: &str, lin: i32, col: i32, color: Rgb) {
        self.set_attribute_id2(h, name, lin, col, Some(&color.to_string()));
    }

    /// Apply `NAME=value, NAME2="quoted value"` in order.
    pub fn set_attributes(&mut self, h: Handle, text: &str) {
        for (name, value) in parse_attribute_list(text) {
            self.set_attribute(h, &name, value.as_deref());
        }
    }

    /// Remove the local value without running the setter, then let
    /// descendants see the inherited value again.
    pub fn reset_attribute(&mut self, h: Handle, name: &str) {
        if !self.controls.is_alive(h) {
            return;
        }
        self.store_raw(h, name, None);

        let inheritable = self
            .controls
            .get(h)
            .and_then(|c| self.classes.resolve(c.class, name))
            .map_or(!is_internal(name), |r| r.descriptor.is_inheritable());
        if inheritable {
            let inherited = self.inherited_value(h, name);
            self.notify_children(h, name, inherited.as_deref());
        }
    }

    /// Point an attribute at another control by name, naming the target
    /// automatically when it has no name yet.
    pub fn set_attribute_handle(&mut self, h: Handle, name: &str, target: Option<Handle>) {
        let Some(target) = target else {
            self.set_attribute(h, name, None);
            return;
        };
        if !self.controls.is_alive(target) {
            warn!(name, "set_attribute_handle with stale target");
            return;
        }

        let target_name = match self.get_name(target) {
            Some(existing) => existing,
            None => {
                self.auto_names += 1;
                let generated = format!("_IUP_NAME_{}", self.auto_names);
                self.set_handle_name(&generated, Some(target));
                generated
            }
        };
        self.set_attribute(h, name, Some(&target_name));
    }

    // =========================================================================
    // Get
    // =========================================================================

    /// Resolve an attribute value.
    pub fn get_attribute(&self, h: Handle, name: &str) -> Option<String> {
        let control = self.controls.get(h)?;
        let mapped = control.is_mapped();

        let Some(resolved) = self.classes.resolve(control.class, name) else {
            if let Some(value) = control.attributes.get(name) {
                return Some(value.to_string());
            }
            if is_internal(name) {
                return None;
            }
            return self.inherited_value(h, name);
        };

        let flags = resolved.descriptor.flags;
        if flags.contains(AttrFlags::WRITE_ONLY) {
            return None;
        }
        if flags.contains(AttrFlags::MAPPED) && !mapped {
            return None;
        }

        if mapped || flags.contains(AttrFlags::NOT_MAPPED) {
            if let Some(value) = self.call_getter(h, &resolved) {
                return Some(value);
            }
        }

        if let Some(value) = control.attributes.get(name) {
            return Some(value.to_string());
        }

        if resolved.descriptor.is_inheritable() {
            if let Some(value) = self.inherited_value(h, name) {
                return Some(value);
            }
        }

        if flags.contains(AttrFlags::NO_DEFAULT) {
            return None;
        }
        if let Some(value) = resolved
            .descriptor
            .global_default
            .as_deref()
            .and_then(|global| self.get_global(global))
        {
            return Some(value);
        }
        resolved.descriptor.default.clone()
    }

    pub fn get_attribute_id(&self, h: Handle, name: &str, id: i32) -> Option<String> {
        if id < 0 {
            return None;
        }
        self.get_attribute(h, &compose_id(name, id))
    }

    pub fn get_attribute_id2(&self, h: Handle, name: &str, lin: i32, col: i32) -> Option<String> {
        if lin < 0 || col < 0 {
            return None;
        }
        self.get_attribute(h, &compose_id2(name, lin, col))
    }

    /// Integer value; `YES`/`ON` read as 1, anything unparsable as 0.
    pub fn get_int(&self, h: Handle, name: &str) -> i32 {
        self.get_attribute(h, name).map_or(0, |v| to_int(&v))
    }

    /// First integer of a pair (`"10x20"` → 10).
    pub fn get_int_first(&self, h: Handle, name: &str) -> i32 {
        self.get_int_int(h, name).0
    }

    /// Second integer of a pair (`"10x20"` → 20).
    pub fn get_int2(&self, h: Handle, name: &str) -> i32 {
        self.get_int_int(h, name).1
    }

    /// Both integers of a pair separated by `x`, `:`, `,`, `-` or a space.
    /// Missing parts are 0.
    pub fn get_int_int(&self, h: Handle, name: &str) -> (i32, i32) {
        match self.get_attribute(h, name) {
            Some(value) => {
                let (a, b) = parse_int_pair_any(&value);
                (a.unwrap_or(0), b.unwrap_or(0))
            }
            None => (0, 0),
        }
    }

    pub fn get_float(&self, h: Handle, name: &str) -> f32 {
        self.get_attribute(h, name)
            .and_then(|v| parse_float(&v))
            .unwrap_or(0.0)
    }

    pub fn get_rgb(&self, h: Handle, name: &str) -> Option<Rgb> {
        Rgb::parse(&self.get_attribute(h, name)?)
    }

    pub fn get_int_id(&self, h: Handle, name: &str, id: i32) -> i32 {
        self.get_attribute_id(h, name, id).map_or(0, |v| to_int(&v))
    }

    pub fn get_float_id(&self, h: Handle, name: &str, id: i32) -> f32 {
        self.get_attribute_id(h, name, id)
            .and_then(|v| parse_float(&v))
            .unwrap_or(0.0)
    }

    pub fn get_rgb_id(&self, h: Handle, name: &str, id: i32) -> Option<Rgb> {
        Rgb::parse(&self.get_attribute_id(h, name, id)?)
    }

    pub fn get_int_id2(&self, h: Handle, name: &str, lin: i32, col: i32) -> i32 {
        self.get_attribute_id2(h, name, lin, col)
            .map_or(0, |v| to_int(&v))
    }

    pub fn get_float_id2(&self, h: Handle, name: &str, lin: i32, col: i32) -> f32 {
        self.get_attribute_id2(h, name, lin, col)
            .and_then(|v| parse_float(&v))
            .unwrap_or(0.0)
    }

    pub fn get_rgb_id2(&self, h: Handle, name: &str, lin: i32, col: i32) -> Option<Rgb> {
        Rgb::parse(&self.get_attribute_id2(h, name, lin, col)?)
    }

    /// Boolean view: `YES`/`ON` are true.
    pub fn get_boolean(&self, h: Handle, name: &str) -> bool {
        self.get_attribute(h, name).is_some_and(|v| parse_boolean(&v))
    }

    /// Control named by a handle-typed attribute.
    pub fn get_attribute_handle(&self, h: Handle, name: &str) -> Option<Handle> {
        let value = self.get_attribute(h, name)?;
        self.get_handle(&value)
    }

    /// Stored values in the bulk mini-language.
    pub fn get_attributes(&self, h: Handle) -> Option<String> {
        Some(format_attribute_list(&self.controls.get(h)?.attributes))
    }

    /// Stored names followed by the readable class attributes. `NO_STRING`
    /// attributes are left out.
    pub fn get_all_attributes(&self, h: Handle) -> Vec<String> {
        let Some(control) = self.controls.get(h) else {
            return Vec::new();
        };

        let mut names: Vec<String> = control
            .attributes
            .names()
            .into_iter()
            .filter(|name| !is_internal(name) && !self.is_no_string(control.class, name))
            .collect();

        for class in self.classes.chain(control.class) {
            for name in class.attribute_names() {
                let readable = class
                    .descriptor(name)
                    .is_some_and(|d| !d.flags.intersects(AttrFlags::WRITE_ONLY | AttrFlags::NO_STRING));
                if readable && !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    // =========================================================================
    // Class Attribute Persistence
    // =========================================================================

    /// Copy handler-held values into the store so they survive an unmap.
    /// The getter's value replaces whatever text the store held.
    pub fn save_class_attributes(&mut self, h: Handle) {
        let Some(control) = self.controls.get(h) else {
            return;
        };
        if !control.is_mapped() {
            return;
        }

        let mut saved = Vec::new();
        for class in self.classes.chain(control.class) {
            for name in class.attribute_names() {
                let Some(descriptor) = class.descriptor(name) else {
                    continue;
                };
                let skip = AttrFlags::NO_SAVE
                    | AttrFlags::READ_ONLY
                    | AttrFlags::WRITE_ONLY
                    | AttrFlags::NO_STRING;
                let AttrAccess::Plain { get: Some(get), set: Some(_) } = descriptor.access else {
                    continue;
                };
                if descriptor.flags.intersects(skip) || saved.iter().any(|(n, _)| n == name) {
                    continue;
                }
                if let Some(value) = get(self, h) {
                    let stored = control.attributes.contains(name);
                    if stored || descriptor.default.as_deref() != Some(value.as_str()) {
                        saved.push((name.to_string(), value));
                    }
                }
            }
        }

        if let Some(control) = self.controls.get_mut(h) {
            for (name, value) in saved {
                control.attributes.set(&name, &value);
            }
        }
    }

    /// Copy stored and handler-held values between two controls of the
    /// same class.
    pub fn copy_class_attributes(&mut self, src: Handle, dst: Handle) {
        let (Some(a), Some(b)) = (self.controls.get(src), self.controls.get(dst)) else {
            return;
        };
        if a.class != b.class {
            warn!("copy_class_attributes between different classes ignored");
            return;
        }

        let mut values: Vec<(String, String)> = a
            .attributes
            .iter()
            .filter(|(name, _)| !is_internal(name) && !self.is_no_string(a.class, name))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for class in self.classes.chain(a.class) {
            for name in class.attribute_names() {
                let Some(descriptor) = class.descriptor(name) else {
                    continue;
                };
                let skip = AttrFlags::NO_SAVE
                    | AttrFlags::READ_ONLY
                    | AttrFlags::WRITE_ONLY
                    | AttrFlags::NO_STRING;
                if descriptor.flags.intersects(skip)
                    || !matches!(descriptor.access, AttrAccess::Plain { set: Some(_), .. })
                    || values.iter().any(|(n, _)| n == name)
                {
                    continue;
                }
                if let Some(value) = self.get_attribute(src, name) {
                    if descriptor.default.as_deref() != Some(value.as_str()) {
                        values.push((name.to_string(), value));
                    }
                }
            }
        }

        for (name, value) in values {
            self.set_attribute(dst, &name, Some(&value));
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Write or remove a raw store value.
    pub(crate) fn store_raw(&mut self, h: Handle, name: &str, value: Option<&str>) {
        if let Some(control) = self.controls.get_mut(h) {
            match value {
                Some(value) => {
                    control.attributes.set(name, value);
                }
                None => {
                    control.attributes.remove(name);
                }
            }
        }
    }

    fn is_no_string(&self, class: ClassId, name: &str) -> bool {
        self.classes
            .resolve(class, name)
            .is_some_and(|r| r.descriptor.flags.contains(AttrFlags::NO_STRING))
    }

    /// Nearest ancestor's stored value.
    pub(crate) fn inherited_value(&self, h: Handle, name: &str) -> Option<String> {
        let mut current = self.controls.get(h)?.parent;
        while let Some(ancestor) = current {
            let control = self.controls.get(ancestor)?;
            if let Some(value) = control.attributes.get(name) {
                return Some(value.to_string());
            }
            current = control.parent;
        }
        None
    }

    fn call_setter(&mut self, h: Handle, resolved: &Resolved, value: Option<&str>) -> bool {
        match resolved.descriptor.access {
            AttrAccess::Plain { set: Some(set), .. } => set(self, h, value),
            AttrAccess::Id { set: Some(set), .. } => set(self, h, resolved.id, value),
            AttrAccess::Id2 { set: Some(set), .. } => set(self, h, resolved.id, resolved.id2, value),
            _ => true,
        }
    }

    fn call_getter(&self, h: Handle, resolved: &Resolved) -> Option<String> {
        match resolved.descriptor.access {
            AttrAccess::Plain { get: Some(get), .. } => get(self, h),
            AttrAccess::Id { get: Some(get), .. } => get(self, h, resolved.id),
            AttrAccess::Id2 { get: Some(get), .. } => get(self, h, resolved.id, resolved.id2),
            _ => None,
        }
    }

    /// Push an inheritable value to descendants without a local value.
    ///
    /// A descendant holding its own value shadows its whole subtree.
    fn notify_children(&mut self, h: Handle, name: &str, value: Option<&str>) {
        let Some(control) = self.controls.get(h) else {
            return;
        };
        let mut stack: Vec<Handle> = control.children.iter().rev().copied().collect();

        while let Some(child) = stack.pop() {
            let Some(control) = self.controls.get(child) else {
                continue;
            };
            if control.attributes.contains(name) {
                continue;
            }
            stack.extend(control.children.iter().rev().copied());

            let Some(resolved) = self.classes.resolve(control.class, name) else {
                continue;
            };
            let flags = resolved.descriptor.flags;
            let runnable = control.is_mapped() || flags.contains(AttrFlags::NOT_MAPPED);
            if runnable
                && resolved.descriptor.access.has_setter()
                && resolved.descriptor.is_inheritable()
                && !flags.contains(AttrFlags::READ_ONLY)
            {
                self.call_setter(child, &resolved, value);
            }
        }
    }

    /// Re-run setters for values stored while unmapped, and for inherited
    /// values the class handles. Called right after the native is created.
    pub(crate) fn apply_deferred_attributes(&mut self, h: Handle) {
        let Some(control) = self.controls.get(h) else {
            return;
        };
        let class = control.class;
        let stored: Vec<(String, String)> = control
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for (name, value) in stored {
            let Some(resolved) = self.classes.resolve(class, &name) else {
                continue;
            };
            let flags = resolved.descriptor.flags;
            if flags.contains(AttrFlags::NOT_MAPPED) || !resolved.descriptor.access.has_setter() {
                continue;
            }
            if !self.controls.is_alive(h) {
                return;
            }
            let keep = self.call_setter(h, &resolved, Some(&value));
            if !keep || flags.contains(AttrFlags::WRITE_ONLY) {
                self.store_raw(h, &name, None);
            }
        }

        // inherited values for handled attributes without a local value
        let inheritable: Vec<String> = self
            .classes
            .attribute_names(class)
            .into_iter()
            .filter(|name| {
                self.classes.find_descriptor(class, name).is_some_and(|d| {
                    d.is_inheritable()
                        && d.access.has_setter()
                        && matches!(d.access, AttrAccess::Plain { .. })
                        && !d.flags.intersects(AttrFlags::NOT_MAPPED | AttrFlags::READ_ONLY)
                })
            })
            .collect();

        for name in inheritable {
            let has_local = self
                .controls
                .get(h)
                .is_some_and(|c| c.attributes.contains(&name));
            if has_local {
                continue;
            }
            if let Some(value) = self.inherited_value(h, &name) {
                if let Some(resolved) = self.classes.resolve(class, &name) {
                    self.call_setter(h, &resolved, Some(&value));
                }
            }
        }
    }
}

fn to_int(value: &str) -> i32 {
    if parse_boolean(value) {
        return 1;
    }
    parse_int(value).unwrap_or(0)
}
