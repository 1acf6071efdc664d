//! Layout - Natural size, current size and position of a subtree.
//!
//! # Algorithm
//!
//! 1. **Pass 1**: Pre-order list of the subtree (parents before children)
//! 2. **Pass 2**: Natural sizes, bottom-up (leaf → root)
//! 3. **Pass 3**: Current sizes, top-down; each container sizes its children
//! 4. **Pass 4**: Positions, top-down; each container places its children
//!
//! Natural size comes from the class `compute_natural_size` method, or from
//! the driver for leaf controls. A non-zero component of a user RASTERSIZE
//! ("WxH") replaces the computed one.
//!
//! Containers without their own methods give every child its natural size
//! and place it at the container's origin.

use tracing::trace;

use super::attrib::parse_int_pair_any;
use super::registry::Handle;
use super::toolkit::Toolkit;

impl Toolkit {
    /// Recompute sizes and positions of `h` and its subtree.
    ///
    /// `h` keeps its position and gets its natural size as current size.
    pub fn refresh(&mut self, h: Handle) {
        if !self.is_alive(h) {
            return;
        }

        // PASS 1
        let mut order = self.descendants(h);
        order.insert(0, h);

        // PASS 2
        for &node in order.iter().rev() {
            let size = self.compute_natural(node);
            if let Some(control) = self.controls.get_mut(node) {
                control.natural_size = size;
            }
        }

        let natural = self.natural_size(h);
        self.set_current_size(h, natural);

        // PASS 3
        for &node in &order {
            let Some(class) = self.controls.get(node).map(|c| c.class) else {
                continue;
            };
            match self.classes.find_method(class, |m| m.set_children_current_size) {
                Some(method) => method(self, node),
                None => {
                    for child in self.children(node) {
                        let natural = self.natural_size(child);
                        self.set_current_size(child, natural);
                    }
                }
            }
        }

        // PASS 4
        for &node in &order {
            let Some((class, (x, y))) = self.controls.get(node).map(|c| (c.class, c.position)) else {
                continue;
            };
            match self.classes.find_method(class, |m| m.set_children_position) {
                Some(method) => method(self, node, x, y),
                None => {
                    for child in self.children(node) {
                        self.set_position(child, x, y);
                    }
                }
            }
        }

        trace!(handle = %h, nodes = order.len(), "layout refreshed");
    }

    /// Natural size from the last `refresh`.
    pub fn natural_size(&self, h: Handle) -> (i32, i32) {
        self.controls.get(h).map_or((0, 0), |c| c.natural_size)
    }

    /// Size assigned by the parent during the last `refresh`.
    pub fn current_size(&self, h: Handle) -> (i32, i32) {
        self.controls.get(h).map_or((0, 0), |c| c.current_size)
    }

    pub fn position(&self, h: Handle) -> (i32, i32) {
        self.controls.get(h).map_or((0, 0), |c| c.position)
    }

    pub(crate) fn set_current_size(&mut self, h: Handle, size: (i32, i32)) {
        if let Some(control) = self.controls.get_mut(h) {
            control.current_size = size;
        }
    }

    pub(crate) fn set_position(&mut self, h: Handle, x: i32, y: i32) {
        if let Some(control) = self.controls.get_mut(h) {
            control.position = (x, y);
        }
    }

    fn compute_natural(&self, h: Handle) -> (i32, i32) {
        let Some(control) = self.controls.get(h) else {
            return (0, 0);
        };
        let class = self.classes.get(control.class);

        let (mut w, mut height) = match self.classes.find_method(control.class, |m| m.compute_natural_size) {
            Some(method) => method(self, h),
            None if control.children.is_empty() => {
                let title = self.get_attribute(h, "TITLE");
                self.driver.natural_size(&class.name, title.as_deref())
            }
            None => control
                .children
                .iter()
                .map(|&c| self.natural_size(c))
                .fold((0, 0), |(aw, ah), (cw, ch)| (aw.max(cw), ah.max(ch))),
        };

        if let Some(raster) = control.attributes.get("RASTERSIZE") {
            let (user_w, user_h) = parse_int_pair_any(raster);
            if let Some(user_w) = user_w.filter(|&v| v > 0) {
                w = user_w;
            }
            if let Some(user_h) = user_h.filter(|&v| v > 0) {
                height = user_h;
            }
        }
        (w, height)
    }
}
