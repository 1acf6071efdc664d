//! Layout containers - `vbox`, `hbox` and `fill`.
//!
//! Boxes stack their children along one axis with GAP pixels between them
//! and MARGIN ("HxV") around them. Space left over when a box is larger than
//! its natural size is shared by its `fill` children.

use crate::engine::{AttrFlags, ClassMethods, ControlClass, Handle, Toolkit};
use crate::error::Result;
use crate::types::{ChildType, Param};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    fn of(tk: &Toolkit, h: Handle) -> Self {
        if tk.class_match(h, "hbox") {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    /// (main, cross) components of a size.
    fn split(self, (w, h): (i32, i32)) -> (i32, i32) {
        match self {
            Self::Vertical => (h, w),
            Self::Horizontal => (w, h),
        }
    }

    fn join(self, main: i32, cross: i32) -> (i32, i32) {
        match self {
            Self::Vertical => (cross, main),
            Self::Horizontal => (main, cross),
        }
    }
}

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    tk.register_class(box_class("vbox"))?;
    tk.register_class(box_class("hbox"))?;
    tk.register_class(ControlClass::new("fill").parent("element"))?;
    Ok(())
}

fn box_class(name: &str) -> ControlClass {
    let mut class = ControlClass::new(name)
        .parent("element")
        .child_type(ChildType::Many)
        .format("G")
        .methods(ClassMethods {
            create: Some(create_box),
            compute_natural_size: Some(compute_box_size),
            set_children_current_size: Some(set_box_children_size),
            set_children_position: Some(set_box_children_position),
            ..Default::default()
        });
    class.register_attribute("GAP", None, None, Some("0"), AttrFlags::NO_INHERIT);
    class.register_attribute("MARGIN", None, None, Some("0x0"), AttrFlags::NO_INHERIT);
    class
}

/// Optional list of initial children.
fn create_box(tk: &mut Toolkit, h: Handle, params: &[Param]) -> Result<()> {
    if let Some(Param::Handles(children)) = params.first() {
        for &child in children {
            tk.append(h, child)?;
        }
    }
    Ok(())
}

fn gap_and_margin(tk: &Toolkit, h: Handle) -> (i32, (i32, i32)) {
    let gap = tk.get_int(h, "GAP").max(0);
    let (mx, my) = tk.get_int_int(h, "MARGIN");
    (gap, (mx.max(0), my.max(0)))
}

fn compute_box_size(tk: &Toolkit, h: Handle) -> (i32, i32) {
    let axis = Axis::of(tk, h);
    let (gap, margin) = gap_and_margin(tk, h);
    let (margin_main, margin_cross) = axis.split(margin);

    let children = tk.children(h);
    let mut main = 0;
    let mut cross = 0;
    for &child in &children {
        let (child_main, child_cross) = axis.split(tk.natural_size(child));
        main += child_main;
        cross = cross.max(child_cross);
    }
    if children.len() > 1 {
        main += gap * (children.len() as i32 - 1);
    }

    axis.join(main + 2 * margin_main, cross + 2 * margin_cross)
}

fn set_box_children_size(tk: &mut Toolkit, h: Handle) {
    let axis = Axis::of(tk, h);
    let (main_current, _) = axis.split(tk.current_size(h));
    let (main_natural, _) = axis.split(tk.natural_size(h));
    let leftover = (main_current - main_natural).max(0);

    let children = tk.children(h);
    let fills: Vec<Handle> = children
        .iter()
        .copied()
        .filter(|&c| tk.class_match(c, "fill"))
        .collect();

    for &child in &children {
        let (mut main, cross) = axis.split(tk.natural_size(child));
        if let Some(pos) = fills.iter().position(|&f| f == child) {
            let count = fills.len() as i32;
            main += leftover / count;
            if (pos as i32) < leftover % count {
                main += 1;
            }
        }
        tk.set_current_size(child, axis.join(main, cross));
    }
}

fn set_box_children_position(tk: &mut Toolkit, h: Handle, x: i32, y: i32) {
    let axis = Axis::of(tk, h);
    let (gap, margin) = gap_and_margin(tk, h);
    let (margin_main, margin_cross) = axis.split(margin);
    let (origin_main, origin_cross) = axis.split((x, y));

    let mut cursor = origin_main + margin_main;
    for child in tk.children(h) {
        let (cx, cy) = axis.join(cursor, origin_cross + margin_cross);
        tk.set_position(child, cx, cy);
        let (child_main, _) = axis.split(tk.current_size(child));
        cursor += child_main + gap;
    }
}

#[cfg(test)]
mod tests {
    use crate::driver::HeadlessDriver;
    use crate::engine::Toolkit;
    use crate::types::Param;

    fn toolkit() -> Toolkit {
        Toolkit::with_driver(HeadlessDriver::new()).unwrap()
    }

    fn label(tk: &mut Toolkit, title: &str) -> crate::engine::Handle {
        tk.create_with("label", &[title.into()]).unwrap()
    }

    #[test]
    fn test_vbox_natural_size_and_positions() {
        let mut tk = toolkit();
        let a = label(&mut tk, "abc");
        let b = label(&mut tk, "abcdef");
        let vbox = tk.create_with("vbox", &[Param::Handles(vec![a, b])]).unwrap();
        tk.set_attribute(vbox, "GAP", Some("4"));
        tk.set_attribute(vbox, "MARGIN", Some("2x3"));

        tk.refresh(vbox);
        assert_eq!(tk.natural_size(vbox), (48 + 4, 16 + 4 + 16 + 6));
        assert_eq!(tk.position(a), (2, 3));
        assert_eq!(tk.position(b), (2, 3 + 16 + 4));
        assert_eq!(tk.get_attribute(b, "POSITION").as_deref(), Some("2,23"));
        assert_eq!(tk.get_attribute(vbox, "NATURALSIZE").as_deref(), Some("52x42"));
    }

    #[test]
    fn test_hbox_places_side_by_side() {
        let mut tk = toolkit();
        let a = label(&mut tk, "ab");
        let b = label(&mut tk, "abcd");
        let hbox = tk.create_with("hbox", &[Param::Handles(vec![a, b])]).unwrap();

        tk.refresh(hbox);
        assert_eq!(tk.natural_size(hbox), (48, 16));
        assert_eq!(tk.position(b), (16, 0));
    }

    #[test]
    fn test_fill_takes_leftover_space() {
        let mut tk = toolkit();
        let dlg = tk.create("dialog").unwrap();
        let a = label(&mut tk, "ab");
        let fill = tk.create("fill").unwrap();
        let b = label(&mut tk, "ab");
        let hbox = tk.create_with("hbox", &[Param::Handles(vec![a, fill, b])]).unwrap();
        tk.append(dlg, hbox).unwrap();
        tk.set_attribute(dlg, "RASTERSIZE", Some("100x0"));

        tk.refresh(dlg);
        assert_eq!(tk.current_size(hbox), (100, 16));
        assert_eq!(tk.current_size(fill), (68, 0));
        assert_eq!(tk.position(b), (84, 0));
    }
}
