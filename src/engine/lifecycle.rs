//! Native Lifecycle - Map and unmap.
//!
//! Unmapped → Mapped → Unmapped (re-enterable) → Destroyed.
//!
//! Mapping creates the native through the class Map method or the driver,
//! registers it in the native lookup table, re-applies deferred attribute
//! values, fires `MAP_CB` and then maps the children in order. Unmapping runs
//! the same steps backwards and saves handler-held values into the store so a
//! later map restores them.

use tracing::{debug, warn};

use super::control::ControlData;
use super::events::CallbackArgs;
use super::registry::Handle;
use super::toolkit::Toolkit;
use crate::driver::MapRequest;
use crate::error::{Result, ToolkitError};
use crate::types::{NativeHandle, NativeType};

impl Toolkit {
    /// Create the native resources of `h` and its subtree.
    ///
    /// Mapping an already mapped control does nothing. A control whose parent
    /// is not mapped cannot be mapped.
    pub fn map(&mut self, h: Handle) -> Result<()> {
        let Some(control) = self.controls.get(h) else {
            return Err(ToolkitError::StaleHandle);
        };
        if control.is_mapped() {
            return Ok(());
        }

        let class_id = control.class;
        let class = self.classes.get(class_id);
        let class_name = class.name.clone();
        let native_type = class.native_type;

        if let Some(parent) = control.parent {
            if !self.is_mapped(parent) {
                warn!(class = %class_name, "map: parent not mapped");
                return Err(ToolkitError::ParentNotMapped(class_name));
            }
        }

        let created = match self.classes.find_method(class_id, |m| m.map) {
            Some(map) => map(self, h),
            None if native_type == NativeType::Void => Ok(None),
            None => {
                let request = MapRequest {
                    handle: h,
                    class: class_name.clone(),
                    native_type,
                    parent: self.native_parent(h),
                    title: self.get_attribute(h, "TITLE"),
                };
                self.driver.map(&request).map(Some)
            }
        };

        let native = match created {
            Ok(native) => native,
            Err(source) => {
                warn!(class = %class_name, %source, "native creation failed");
                return Err(ToolkitError::MapFailed {
                    class: class_name,
                    source,
                });
            }
        };

        if let Some(control) = self.controls.get_mut(h) {
            control.mapped = true;
            control.native = native;
        }
        if let Some(native) = native {
            self.native_table.insert(native, h);
        }
        if !matches!(native_type, NativeType::Void | NativeType::Dialog) {
            if let Some(serial) = self.next_child_id(h) {
                if let Some(control) = self.controls.get_mut(h) {
                    control.serial = serial;
                }
            }
        }
        debug!(class = %class_name, handle = %h, ?native, "mapped");

        self.apply_deferred_attributes(h);
        self.call_callback(h, "MAP_CB", &CallbackArgs::None);

        // MAP_CB may have destroyed or unmapped the control
        if !self.is_mapped(h) {
            return Ok(());
        }

        for child in self.children(h) {
            if self.is_alive(child) && self.get_parent(child) == Some(h) {
                self.map(child)?;
            }
        }

        let menu_bar = self
            .controls
            .get(h)
            .and_then(|c| c.dialog_data())
            .and_then(|d| d.menu);
        if let Some(menu) = menu_bar {
            if self.is_alive(menu) {
                self.map(menu)?;
            }
        }

        Ok(())
    }

    /// Destroy the native resources of `h` and its subtree, keeping the
    /// controls and their attributes.
    pub fn unmap(&mut self, h: Handle) {
        if !self.is_mapped(h) {
            return;
        }

        self.call_callback(h, "UNMAP_CB", &CallbackArgs::None);
        if !self.is_mapped(h) {
            return;
        }

        for child in self.children(h) {
            self.unmap(child);
        }
        let menu_bar = self
            .controls
            .get(h)
            .and_then(|c| c.dialog_data())
            .and_then(|d| d.menu);
        if let Some(menu) = menu_bar {
            self.unmap(menu);
        }

        self.save_class_attributes(h);

        let Some(control) = self.controls.get(h) else {
            return;
        };
        let class_id = control.class;
        if let Some(unmap) = self.classes.find_method(class_id, |m| m.unmap) {
            unmap(self, h);
        }

        let native_type = self.classes.get(class_id).native_type;
        let native = self.controls.get_mut(h).and_then(|c| {
            c.mapped = false;
            if !matches!(native_type, NativeType::Void | NativeType::Dialog) {
                c.serial = -1;
            }
            c.native.take()
        });
        if let Some(native) = native {
            self.driver.unmap(native);
            self.native_table.remove(&native);
        }
        if self.focus.get() == Some(h) {
            self.focus.set(None);
        }

        debug!(handle = %h, ?native, "unmapped");
    }

    /// Native of the nearest ancestor that has one. A menu bar answers with
    /// the native of the dialog that shows it.
    pub(crate) fn native_parent(&self, h: Handle) -> Option<NativeHandle> {
        let mut node = h;
        while let Some(parent) = self.get_parent(node) {
            if let Some(native) = self.native(parent) {
                return Some(native);
            }
            node = parent;
        }
        let owner = self.controls.get(node)?.menu_data()?.bar_of?;
        self.native(owner)
    }

    /// Take the next child id from the counter that owns `h`.
    ///
    /// Controls inside a dialog (and inside its menu bar) share the dialog's
    /// counter; a free-standing menu keeps its own.
    pub(crate) fn next_child_id(&mut self, h: Handle) -> Option<i32> {
        let root = self.root_of(h)?;
        let owner = match self.controls.get(root)?.menu_data() {
            Some(menu) => menu.bar_of.filter(|&d| self.is_alive(d)).unwrap_or(root),
            None => root,
        };

        let control = self.controls.get_mut(owner)?;
        let counter = match control.data {
            ControlData::Dialog(ref mut dialog) => &mut dialog.child_id,
            ControlData::Menu(ref mut menu) => &mut menu.child_id,
            _ => return None,
        };
        let id = *counter;
        *counter += 1;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::driver::HeadlessDriver;
    use crate::engine::Toolkit;
    use crate::error::ToolkitError;
    use crate::types::CallbackResult;

    fn toolkit() -> (Toolkit, crate::driver::HeadlessProbe) {
        let driver = HeadlessDriver::new();
        let probe = driver.probe();
        (Toolkit::with_driver(driver).unwrap(), probe)
    }

    #[test]
    fn test_map_requires_mapped_parent() {
        let (mut tk, _) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        tk.append(dlg, vbox).unwrap();

        assert!(matches!(tk.map(vbox), Err(ToolkitError::ParentNotMapped(_))));
        assert!(!tk.is_mapped(vbox));
    }

    #[test]
    fn test_map_unmap_dialog_scenario() {
        let (mut tk, probe) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        let label = tk.create("label").unwrap();
        let button = tk.create("button").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.append(vbox, label).unwrap();
        tk.append(vbox, button).unwrap();

        tk.map(dlg).unwrap();
        assert!(tk.is_mapped(dlg) && tk.is_mapped(vbox));
        assert!(tk.native(vbox).is_none());
        assert_eq!(probe.native_count(), 3);

        let native = tk.native(label).unwrap();
        assert_eq!(tk.from_native(native), Some(label));
        assert_eq!(probe.record(native).unwrap().parent, tk.native(dlg));

        tk.unmap(dlg);
        assert!(!tk.is_mapped(dlg) && !tk.is_mapped(label));
        assert_eq!(probe.native_count(), 0);
        assert_eq!(tk.from_native(native), None);

        // Re-entrant
        tk.map(dlg).unwrap();
        assert_eq!(probe.native_count(), 3);
    }

    #[test]
    fn test_map_failure_leaves_unmapped() {
        let (mut tk, probe) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        probe.fail_class("dialog");

        let err = tk.map(dlg).unwrap_err();
        assert!(matches!(err, ToolkitError::MapFailed { ref class, .. } if class == "dialog"));
        assert!(!tk.is_mapped(dlg));
        assert!(tk.native(dlg).is_none());

        probe.allow_class("dialog");
        tk.map(dlg).unwrap();
        assert!(tk.is_mapped(dlg));
    }

    #[test]
    fn test_child_failure_stops_mapping() {
        let (mut tk, probe) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        let a = tk.create("label").unwrap();
        let b = tk.create("button").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.append(vbox, a).unwrap();
        tk.append(vbox, b).unwrap();
        probe.fail_class("button");

        assert!(tk.map(dlg).is_err());
        assert!(tk.is_mapped(a));
        assert!(!tk.is_mapped(b));
    }

    #[test]
    fn test_serials_from_dialog_counter() {
        let (mut tk, _) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        let a = tk.create("label").unwrap();
        let b = tk.create("label").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.append(vbox, a).unwrap();
        tk.append(vbox, b).unwrap();

        tk.map(dlg).unwrap();
        assert_eq!(tk.serial(dlg), -1);
        assert_eq!(tk.serial(vbox), -1);
        assert_eq!(tk.serial(a), 100);
        assert_eq!(tk.serial(b), 101);

        tk.unmap(dlg);
        assert_eq!(tk.serial(a), -1);
    }

    #[test]
    fn test_deferred_attribute_applied_at_map() {
        let (mut tk, probe) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let label = tk.create("label").unwrap();
        tk.append(dlg, label).unwrap();
        tk.set_attribute(label, "TITLE", Some("Hello"));

        tk.map(dlg).unwrap();
        let native = tk.native(label).unwrap();
        assert_eq!(probe.native_attribute(native, "TITLE").as_deref(), Some("Hello"));
        assert_eq!(tk.get_attribute(label, "TITLE").as_deref(), Some("Hello"));
    }

    #[test]
    fn test_map_and_unmap_callbacks() {
        let (mut tk, _) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let label = tk.create("label").unwrap();
        tk.append(dlg, label).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for (h, tag) in [(dlg, "dlg"), (label, "label")] {
            for event in ["MAP_CB", "UNMAP_CB"] {
                let log = Rc::clone(&log);
                tk.set_callback(h, event, move |_, _, _| {
                    log.borrow_mut().push(format!("{tag}:{event}"));
                    CallbackResult::Default
                });
            }
        }

        tk.map(dlg).unwrap();
        tk.unmap(dlg);
        assert_eq!(
            *log.borrow(),
            vec!["dlg:MAP_CB", "label:MAP_CB", "dlg:UNMAP_CB", "label:UNMAP_CB"]
        );
    }

    #[test]
    fn test_append_to_mapped_parent_maps_child() {
        let (mut tk, _) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.map(dlg).unwrap();

        let label = tk.create("label").unwrap();
        tk.append(vbox, label).unwrap();
        assert!(tk.is_mapped(label));
    }

    #[test]
    fn test_strict_detach_unmaps() {
        let driver = HeadlessDriver::new().with_strict_hierarchy(true);
        let mut tk = Toolkit::with_driver(driver).unwrap();
        let dlg = tk.create("dialog").unwrap();
        let label = tk.create("label").unwrap();
        tk.append(dlg, label).unwrap();
        tk.map(dlg).unwrap();

        tk.detach(label).unwrap();
        assert!(!tk.is_mapped(label));
    }

    #[test]
    fn test_reparent_mapped_keeps_native() {
        let (mut tk, probe) = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        let hbox = tk.create("hbox").unwrap();
        let label = tk.create("label").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.append(vbox, hbox).unwrap();
        tk.append(vbox, label).unwrap();
        tk.map(dlg).unwrap();

        let native = tk.native(label).unwrap();
        tk.append(hbox, label).unwrap();
        assert_eq!(tk.native(label), Some(native));
        assert!(probe.is_alive(native));
    }
}
