//! Widget Tree - Parent/child links, reparenting, destruction, traversal.
//!
//! The tree is a forest: every control has at most one parent and appears in
//! its parent's ordered child list exactly once. Appending enforces the
//! parent's child policy and refuses cycles. Attaching to a mapped parent
//! maps the new subtree; moving a mapped subtree reparents its natives.
//!
//! Destruction and traversals use explicit stacks, never recursion.

use tracing::{debug, warn};

use super::events::CallbackArgs;
use super::registry::Handle;
use super::toolkit::Toolkit;
use crate::error::{Result, ToolkitError};
use crate::types::{ChildType, NativeType};

/// Where a child lands in its new parent's child list.
#[derive(Debug, Clone, Copy)]
enum Position {
    End,
    Before(Option<Handle>),
}

impl Toolkit {
    // =========================================================================
    // Attach / Detach
    // =========================================================================

    /// Append `child` as the last child of `parent`, detaching it from its
    /// current parent first.
    pub fn append(&mut self, parent: Handle, child: Handle) -> Result<()> {
        self.attach(parent, child, Position::End)
    }

    /// Insert `child` before `reference`; `None` inserts as first child.
    pub fn insert(&mut self, parent: Handle, reference: Option<Handle>, child: Handle) -> Result<()> {
        self.attach(parent, child, Position::Before(reference))
    }

    /// Move `child` under `new_parent`, before `reference` (or last).
    pub fn reparent(&mut self, child: Handle, new_parent: Handle, reference: Option<Handle>) -> Result<()> {
        match reference {
            Some(_) => self.attach(new_parent, child, Position::Before(reference)),
            None => self.attach(new_parent, child, Position::End),
        }
    }

    /// Remove `child` from its parent without destroying it.
    ///
    /// The subtree is unmapped when the driver (or config) requires native
    /// parents to match the tree.
    pub fn detach(&mut self, child: Handle) -> Result<()> {
        if !self.controls.is_alive(child) {
            return Err(ToolkitError::StaleHandle);
        }
        if self.strict_hierarchy() && self.is_mapped(child) {
            self.unmap(child);
        }
        self.unlink(child);
        Ok(())
    }

    fn attach(&mut self, parent: Handle, child: Handle, position: Position) -> Result<()> {
        let (Some(parent_control), Some(child_control)) = (self.controls.get(parent), self.controls.get(child)) else {
            return Err(ToolkitError::StaleHandle);
        };

        if parent == child || self.is_ancestor(child, parent) {
            warn!(parent = %parent, child = %child, "append would create a cycle");
            return Err(ToolkitError::WouldCycle);
        }

        let class = self.classes.get(parent_control.class);
        let siblings = parent_control
            .children
            .iter()
            .filter(|&&c| c != child)
            .count();
        let refused = match class.child_type {
            ChildType::None => true,
            ChildType::One => siblings > 0,
            ChildType::Many => false,
        };
        if refused {
            warn!(class = %class.name, policy = %class.child_type, "child refused by policy");
            return Err(ToolkitError::ChildPolicy {
                class: class.name.clone(),
                policy: class.child_type,
            });
        }

        if let Position::Before(Some(reference)) = position {
            if reference == child || !parent_control.children.contains(&reference) {
                return Err(ToolkitError::NotAChild);
            }
        }

        let was_attached = child_control.parent.is_some();
        let child_mapped = child_control.is_mapped();
        let parent_mapped = parent_control.is_mapped();

        self.unlink(child);
        if let Some(control) = self.controls.get_mut(parent) {
            let index = match position {
                Position::End => control.children.len(),
                Position::Before(None) => 0,
                Position::Before(Some(reference)) => control
                    .children
                    .iter()
                    .position(|&c| c == reference)
                    .unwrap_or(control.children.len()),
            };
            control.children.insert(index, child);
        }
        if let Some(control) = self.controls.get_mut(child) {
            control.parent = Some(parent);
        }
        debug!(parent = %parent, child = %child, moved = was_attached, "child attached");

        match (parent_mapped, child_mapped) {
            (true, false) => self.map(child),
            (true, true) => {
                let native = self.native(child);
                let parent_native = self.native_parent(child);
                if let Some(native) = native {
                    if let Err(source) = self.driver.reparent(native, parent_native) {
                        warn!(%source, "native reparent failed, remapping");
                        self.unmap(child);
                        return self.map(child);
                    }
                }
                Ok(())
            }
            (false, true) => {
                self.unmap(child);
                Ok(())
            }
            (false, false) => Ok(()),
        }
    }

    /// Drop the parent link on both sides.
    fn unlink(&mut self, child: Handle) {
        let Some(parent) = self.controls.get(child).and_then(|c| c.parent) else {
            return;
        };
        if let Some(control) = self.controls.get_mut(parent) {
            control.children.retain(|&c| c != child);
        }
        if let Some(control) = self.controls.get_mut(child) {
            control.parent = None;
        }
    }

    // =========================================================================
    // Destroy
    // =========================================================================

    /// Destroy a control and its whole subtree.
    ///
    /// The subtree is unmapped and detached, then every control is released
    /// children first: `DESTROY_CB`, class Destroy, names removed, slot freed.
    /// Stale handles are ignored.
    pub fn destroy(&mut self, h: Handle) {
        if !self.controls.is_alive(h) {
            return;
        }

        if self.is_mapped(h) {
            self.unmap(h);
        }
        self.unlink(h);

        let mut order = self.descendants(h);
        order.insert(0, h);
        let mut released = 0;

        for &node in order.iter().rev() {
            if !self.controls.is_alive(node) {
                continue;
            }
            self.call_callback(node, "DESTROY_CB", &CallbackArgs::None);

            let Some(control) = self.controls.get(node) else {
                continue;
            };
            if let Some(destroy) = self.classes.find_method(control.class, |m| m.destroy) {
                destroy(self, node);
            }

            self.remove_names_of(node);
            if self.focus.get() == Some(node) {
                self.focus.set(None);
            }
            if let Some(control) = self.controls.release(node) {
                if let Some(native) = control.native {
                    self.native_table.remove(&native);
                }
                released += 1;
            }
        }

        debug!(handle = %h, released, "control destroyed");
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn get_parent(&self, h: Handle) -> Option<Handle> {
        self.controls.get(h)?.parent
    }

    /// Child at `pos`.
    pub fn get_child(&self, h: Handle, pos: usize) -> Option<Handle> {
        self.controls.get(h)?.children.get(pos).copied()
    }

    /// Position of `child` in `parent`'s child list.
    pub fn get_child_pos(&self, parent: Handle, child: Handle) -> Option<usize> {
        self.controls
            .get(parent)?
            .children
            .iter()
            .position(|&c| c == child)
    }

    pub fn get_child_count(&self, h: Handle) -> usize {
        self.controls.get(h).map_or(0, |c| c.children.len())
    }

    /// Child after `child`; the first child when `child` is `None`.
    pub fn get_next_child(&self, parent: Handle, child: Option<Handle>) -> Option<Handle> {
        let children = &self.controls.get(parent)?.children;
        match child {
            None => children.first().copied(),
            Some(child) => {
                let pos = children.iter().position(|&c| c == child)?;
                children.get(pos + 1).copied()
            }
        }
    }

    /// Next sibling.
    pub fn get_brother(&self, h: Handle) -> Option<Handle> {
        let parent = self.get_parent(h)?;
        self.get_next_child(parent, Some(h))
    }

    pub fn children(&self, h: Handle) -> Vec<Handle> {
        self.controls
            .get(h)
            .map(|c| c.children.clone())
            .unwrap_or_default()
    }

    /// All descendants of `h` in pre-order, `h` excluded.
    pub fn descendants(&self, h: Handle) -> Vec<Handle> {
        let mut result = Vec::new();
        let mut stack: Vec<Handle> = self.children(h).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            if let Some(control) = self.controls.get(node) {
                stack.extend(control.children.iter().rev().copied());
            }
        }
        result
    }

    /// Whether `ancestor` is a strict ancestor of `h` in the tree.
    pub fn is_ancestor(&self, ancestor: Handle, h: Handle) -> bool {
        let mut current = self.get_parent(h);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get_parent(node);
        }
        false
    }

    /// Nearest enclosing dialog. A menu bar resolves to the dialog that
    /// shows it.
    pub fn get_dialog(&self, h: Handle) -> Option<Handle> {
        let mut current = Some(h);
        let mut last = h;
        while let Some(node) = current {
            if self.class_type(node)? == NativeType::Dialog {
                return Some(node);
            }
            last = node;
            current = self.get_parent(node);
        }

        let owner = self.controls.get(last)?.menu_data()?.bar_of?;
        self.controls.is_alive(owner).then_some(owner)
    }

    /// Control named `name` inside the dialog (or top-level tree) of `h`.
    pub fn get_dialog_child(&self, h: Handle, name: &str) -> Option<Handle> {
        let target = self.get_handle(name)?;
        let root = self.get_dialog(h).or_else(|| self.root_of(h))?;
        if target == root || self.get_dialog(target) == Some(root) || self.is_ancestor(root, target) {
            Some(target)
        } else {
            None
        }
    }

    pub(crate) fn root_of(&self, h: Handle) -> Option<Handle> {
        let mut node = h;
        if !self.controls.is_alive(node) {
            return None;
        }
        while let Some(parent) = self.get_parent(node) {
            node = parent;
        }
        Some(node)
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

    fn toolkit() -> Toolkit {
        Toolkit::with_driver(HeadlessDriver::new()).unwrap()
    }

    #[test]
    fn test_append_and_navigate() {
        let mut tk = toolkit();
        let vbox = tk.create("vbox").unwrap();
        let a = tk.create("label").unwrap();
        let b = tk.create("label").unwrap();
        let c = tk.create("label").unwrap();

        tk.append(vbox, a).unwrap();
        tk.append(vbox, c).unwrap();
        tk.insert(vbox, Some(c), b).unwrap();

        assert_eq!(tk.children(vbox), vec![a, b, c]);
        assert_eq!(tk.get_child(vbox, 1), Some(b));
        assert_eq!(tk.get_child_pos(vbox, c), Some(2));
        assert_eq!(tk.get_child_count(vbox), 3);
        assert_eq!(tk.get_next_child(vbox, None), Some(a));
        assert_eq!(tk.get_next_child(vbox, Some(c)), None);
        assert_eq!(tk.get_brother(a), Some(b));
        assert_eq!(tk.get_parent(b), Some(vbox));
    }

    #[test]
    fn test_insert_first_and_not_a_child() {
        let mut tk = toolkit();
        let vbox = tk.create("vbox").unwrap();
        let a = tk.create("label").unwrap();
        let b = tk.create("label").unwrap();
        let stranger = tk.create("label").unwrap();

        tk.append(vbox, a).unwrap();
        tk.insert(vbox, None, b).unwrap();
        assert_eq!(tk.children(vbox), vec![b, a]);

        let extra = tk.create("label").unwrap();
        let err = tk.insert(vbox, Some(stranger), extra).unwrap_err();
        assert!(matches!(err, ToolkitError::NotAChild));
    }

    #[test]
    fn test_none_policy_leaves_children_unchanged() {
        let mut tk = toolkit();
        let label = tk.create("label").unwrap();
        let child = tk.create("label").unwrap();

        let err = tk.append(label, child).unwrap_err();
        assert!(matches!(err, ToolkitError::ChildPolicy { .. }));
        assert!(tk.children(label).is_empty());
        assert_eq!(tk.get_parent(child), None);
    }

    #[test]
    fn test_exactly_one_policy() {
        let mut tk = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let a = tk.create("vbox").unwrap();
        let b = tk.create("vbox").unwrap();

        tk.append(dlg, a).unwrap();
        assert!(matches!(tk.append(dlg, b), Err(ToolkitError::ChildPolicy { .. })));

        // Re-appending the same child is a move, not a second child
        tk.append(dlg, a).unwrap();
        assert_eq!(tk.children(dlg), vec![a]);

        tk.detach(a).unwrap();
        tk.append(dlg, b).unwrap();
        assert_eq!(tk.children(dlg), vec![b]);
    }

    #[test]
    fn test_cycle_refused() {
        let mut tk = toolkit();
        let outer = tk.create("vbox").unwrap();
        let inner = tk.create("vbox").unwrap();
        tk.append(outer, inner).unwrap();

        assert!(matches!(tk.append(inner, outer), Err(ToolkitError::WouldCycle)));
        assert!(matches!(tk.append(outer, outer), Err(ToolkitError::WouldCycle)));
        assert_eq!(tk.children(inner), vec![]);
    }

    #[test]
    fn test_reparent_by_append() {
        let mut tk = toolkit();
        let first = tk.create("vbox").unwrap();
        let second = tk.create("hbox").unwrap();
        let child = tk.create("label").unwrap();

        tk.append(first, child).unwrap();
        tk.append(second, child).unwrap();
        assert!(tk.children(first).is_empty());
        assert_eq!(tk.children(second), vec![child]);
        assert_eq!(tk.get_parent(child), Some(second));
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut tk = toolkit();
        let root = tk.create("vbox").unwrap();
        let a = tk.create("hbox").unwrap();
        let a1 = tk.create("label").unwrap();
        let a2 = tk.create("label").unwrap();
        let b = tk.create("label").unwrap();
        tk.append(root, a).unwrap();
        tk.append(a, a1).unwrap();
        tk.append(a, a2).unwrap();
        tk.append(root, b).unwrap();

        assert_eq!(tk.descendants(root), vec![a, a1, a2, b]);
        assert!(tk.is_ancestor(root, a2));
        assert!(!tk.is_ancestor(a2, root));
    }

    #[test]
    fn test_destroy_removes_names_and_link() {
        let mut tk = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        let a = tk.create("label").unwrap();
        let b = tk.create("button").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.append(vbox, a).unwrap();
        tk.append(vbox, b).unwrap();

        tk.set_handle_name("box", Some(vbox));
        tk.set_handle_name("a", Some(a));
        tk.set_handle_name("b", Some(b));
        tk.set_handle_name("dlg", Some(dlg));
        let before = tk.get_all_names().len();

        tk.destroy(vbox);

        assert_eq!(before - tk.get_all_names().len(), 3);
        assert!(tk.children(dlg).is_empty());
        assert!(!tk.is_alive(vbox) && !tk.is_alive(a) && !tk.is_alive(b));
        assert_eq!(tk.get_handle("dlg"), Some(dlg));
    }

    #[test]
    fn test_destroy_callbacks_children_first() {
        let mut tk = toolkit();
        let vbox = tk.create("vbox").unwrap();
        let a = tk.create("label").unwrap();
        tk.append(vbox, a).unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        for (h, tag) in [(vbox, "vbox"), (a, "a")] {
            let order = Rc::clone(&order);
            tk.set_callback(h, "DESTROY_CB", move |_, _, _| {
                order.borrow_mut().push(tag);
                CallbackResult::Default
            });
        }

        tk.destroy(vbox);
        assert_eq!(*order.borrow(), vec!["a", "vbox"]);

        // Second destroy is a no-op
        tk.destroy(vbox);
        assert_eq!(order.borrow().len(), 2);
    }

    #[test]
    fn test_get_dialog_and_dialog_child() {
        let mut tk = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let vbox = tk.create("vbox").unwrap();
        let label = tk.create("label").unwrap();
        let outside = tk.create("label").unwrap();
        tk.append(dlg, vbox).unwrap();
        tk.append(vbox, label).unwrap();
        tk.set_handle_name("caption", Some(label));
        tk.set_handle_name("orphan", Some(outside));

        assert_eq!(tk.get_dialog(label), Some(dlg));
        assert_eq!(tk.get_dialog(outside), None);
        assert_eq!(tk.get_dialog_child(vbox, "caption"), Some(label));
        assert_eq!(tk.get_dialog_child(vbox, "orphan"), None);
    }
}
