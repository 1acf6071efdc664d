//! Matrix - Grid of text cells with line and column titles.
//!
//! Cells are addressed through Id2 attributes on the empty name: `"2:3"` is
//! line 2, column 3. Line 0 and column 0 are the titles. Cell data lives in
//! the control from creation on, so it can be filled before the matrix is
//! mapped; mapped matrices also forward each cell change to the native.

mod cells;
mod navigation;

pub use cells::{Cell, MatrixData};

use tracing::debug;

use crate::controls::base::push_native;
use crate::engine::attrib::{compose_id2, parse_int, parse_int_pair};
use crate::engine::{AttrFlags, ClassMethods, ControlClass, ControlData, Handle, NativeEvent, Toolkit};
use crate::error::Result;
use crate::types::{CallbackResult, NO_ID, NativeType, Param, Rgb};

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    let mut class = ControlClass::new("matrix")
        .parent("element")
        .native_type(NativeType::Control)
        .interactive(true)
        .methods(ClassMethods {
            create: Some(create),
            handle_event: Some(handle_event),
            ..Default::default()
        });

    let data = AttrFlags::NOT_MAPPED | AttrFlags::NO_INHERIT;
    let write_only = data | AttrFlags::WRITE_ONLY;

    class.register_attribute("NUMLIN", Some(get_num_lines), Some(set_num_lines), None, data);
    class.register_attribute("NUMCOL", Some(get_num_cols), Some(set_num_cols), None, data);
    class.register_attribute("NUMLIN_VISIBLE", None, None, Some("3"), AttrFlags::NO_INHERIT);
    class.register_attribute("ADDLIN", None, Some(set_add_lines), None, write_only);
    class.register_attribute("DELLIN", None, Some(set_del_lines), None, write_only);
    class.register_attribute("ADDCOL", None, Some(set_add_cols), None, write_only);
    class.register_attribute("DELCOL", None, Some(set_del_cols), None, write_only);
    class.register_attribute(
        "FOCUS_CELL",
        Some(get_focus_cell),
        Some(set_focus_cell),
        None,
        data | AttrFlags::NO_SAVE,
    );

    class.register_attribute_id2("", Some(get_cell), Some(set_cell), data);
    // without ids these address the whole control and inherit as usual
    class.register_attribute_id2("BGCOLOR", Some(get_bgcolor), Some(set_bgcolor), AttrFlags::NOT_MAPPED);
    class.register_attribute_id2("FGCOLOR", Some(get_fgcolor), Some(set_fgcolor), AttrFlags::NOT_MAPPED);

    tk.register_class(class)?;
    Ok(())
}

fn create(tk: &mut Toolkit, h: Handle, _params: &[Param]) -> Result<()> {
    if let Some(control) = tk.control_mut(h) {
        control.data = ControlData::Matrix(MatrixData::new());
    }
    Ok(())
}

fn handle_event(tk: &mut Toolkit, h: Handle, event: &NativeEvent) -> Option<CallbackResult> {
    match event {
        NativeEvent::Key(code) => navigation::on_key(tk, h, *code),
        _ => None,
    }
}

fn data(tk: &Toolkit, h: Handle) -> Option<&MatrixData> {
    tk.control(h)?.matrix()
}

fn data_mut(tk: &mut Toolkit, h: Handle) -> Option<&mut MatrixData> {
    tk.control_mut(h)?.matrix_mut()
}

// =============================================================================
// Dimensions
// =============================================================================

fn get_num_lines(tk: &Toolkit, h: Handle) -> Option<String> {
    Some(data(tk, h)?.num_lines().to_string())
}

fn set_num_lines(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    if let Some(lines) = value.and_then(parse_int).and_then(|n| usize::try_from(n).ok()) {
        if let Some(data) = data_mut(tk, h) {
            data.set_num_lines(lines);
        }
    }
    false
}

fn get_num_cols(tk: &Toolkit, h: Handle) -> Option<String> {
    Some(data(tk, h)?.num_cols().to_string())
}

fn set_num_cols(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    if let Some(cols) = value.and_then(parse_int).and_then(|n| usize::try_from(n).ok()) {
        if let Some(data) = data_mut(tk, h) {
            data.set_num_cols(cols);
        }
    }
    false
}

/// `"L"` or `"L-count"`; the count defaults to 1.
fn parse_position_count(value: Option<&str>) -> Option<(usize, usize)> {
    let (position, count) = parse_int_pair(value?, '-');
    let position = usize::try_from(position?).ok()?;
    let count = usize::try_from(count.unwrap_or(1)).ok()?;
    Some((position, count))
}

fn edit(tk: &mut Toolkit, h: Handle, value: Option<&str>, op: fn(&mut MatrixData, usize, usize) -> bool) -> bool {
    let Some((position, count)) = parse_position_count(value) else {
        return false;
    };
    let changed = data_mut(tk, h).is_some_and(|data| op(data, position, count));
    if changed {
        debug!(handle = %h, position, count, "matrix resized");
    }
    false
}

fn set_add_lines(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    edit(tk, h, value, MatrixData::insert_lines)
}

fn set_del_lines(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    edit(tk, h, value, MatrixData::delete_lines)
}

fn set_add_cols(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    edit(tk, h, value, MatrixData::insert_cols)
}

fn set_del_cols(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    edit(tk, h, value, MatrixData::delete_cols)
}

// =============================================================================
// Focus
// =============================================================================

fn get_focus_cell(tk: &Toolkit, h: Handle) -> Option<String> {
    let (lin, col) = data(tk, h)?.focus;
    Some(format!("{lin}:{col}"))
}

/// Only data cells can take the focus.
fn set_focus_cell(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let Some((Some(lin), Some(col))) = value.map(|v| parse_int_pair(v, ':')) else {
        return false;
    };
    let (Ok(lin), Ok(col)) = (usize::try_from(lin), usize::try_from(col)) else {
        return false;
    };
    if let Some(data) = data_mut(tk, h) {
        if data.is_data_cell(lin, col) {
            data.focus = (lin, col);
        }
    }
    false
}

// =============================================================================
// Cells
// =============================================================================

fn get_cell(tk: &Toolkit, h: Handle, lin: i32, col: i32) -> Option<String> {
    data(tk, h)?.cell(lin, col)?.value.clone()
}

fn set_cell(tk: &mut Toolkit, h: Handle, lin: i32, col: i32, value: Option<&str>) -> bool {
    let Some(cell) = data_mut(tk, h).and_then(|d| d.cell_mut(lin, col)) else {
        return false;
    };
    cell.value = value.map(str::to_string);
    push_native(tk, h, &compose_id2("", lin, col), value);
    false
}

/// Cell color, falling back to the control's color. Without ids the getter
/// declines so the control value resolves normally.
fn get_cell_color(tk: &Toolkit, h: Handle, name: &str, lin: i32, col: i32, pick: fn(&Cell) -> Option<Rgb>) -> Option<String> {
    if lin == NO_ID {
        return None;
    }
    let color = pick(data(tk, h)?.cell(lin, col)?);
    color
        .map(|c| c.to_string())
        .or_else(|| tk.get_attribute(h, name))
}

/// Set a cell color, or the control's color when no ids are given.
fn set_cell_color(
    tk: &mut Toolkit,
    h: Handle,
    name: &str,
    lin: i32,
    col: i32,
    value: Option<&str>,
    pick: fn(&mut Cell) -> &mut Option<Rgb>,
) -> bool {
    if lin == NO_ID {
        push_native(tk, h, name, value);
        return true;
    }
    let color = match value {
        Some(text) => match Rgb::parse(text) {
            Some(color) => Some(color),
            None => return false,
        },
        None => None,
    };
    let Some(cell) = data_mut(tk, h).and_then(|d| d.cell_mut(lin, col)) else {
        return false;
    };
    *pick(cell) = color;
    push_native(tk, h, &compose_id2(name, lin, col), value);
    false
}

fn get_bgcolor(tk: &Toolkit, h: Handle, lin: i32, col: i32) -> Option<String> {
    get_cell_color(tk, h, "BGCOLOR", lin, col, |c| c.bgcolor)
}

fn set_bgcolor(tk: &mut Toolkit, h: Handle, lin: i32, col: i32, value: Option<&str>) -> bool {
    set_cell_color(tk, h, "BGCOLOR", lin, col, value, |c| &mut c.bgcolor)
}

fn get_fgcolor(tk: &Toolkit, h: Handle, lin: i32, col: i32) -> Option<String> {
    get_cell_color(tk, h, "FGCOLOR", lin, col, |c| c.fgcolor)
}

fn set_fgcolor(tk: &mut Toolkit, h: Handle, lin: i32, col: i32, value: Option<&str>) -> bool {
    set_cell_color(tk, h, "FGCOLOR", lin, col, value, |c| &mut c.fgcolor)
}

#[cfg(test)]
mod tests {
    use crate::driver::{HeadlessDriver, HeadlessProbe};
    use crate::engine::{Handle, Toolkit};

    fn matrix(lines: i32, cols: i32) -> (Toolkit, Handle, HeadlessProbe) {
        let driver = HeadlessDriver::new();
        let probe = driver.probe();
        let mut tk = Toolkit::with_driver(driver).unwrap();
        let mat = tk.create("matrix").unwrap();
        tk.set_int(mat, "NUMLIN", lines);
        tk.set_int(mat, "NUMCOL", cols);
        (tk, mat, probe)
    }

    #[test]
    fn test_cells_by_line_and_column() {
        let (mut tk, mat, _) = matrix(3, 2);
        tk.set_attribute_id2(mat, "", 0, 1, Some("Name"));
        tk.set_attribute_id2(mat, "", 2, 1, Some("beta"));
        tk.set_attribute(mat, "3:2", Some("gamma"));

        assert_eq!(tk.get_attribute(mat, "0:1").as_deref(), Some("Name"));
        assert_eq!(tk.get_attribute_id2(mat, "", 2, 1).as_deref(), Some("beta"));
        assert_eq!(tk.get_attribute_id2(mat, "", 3, 2).as_deref(), Some("gamma"));
        assert_eq!(tk.get_attribute_id2(mat, "", 1, 1), None);

        // outside the grid nothing is kept
        tk.set_attribute(mat, "4:1", Some("lost"));
        assert_eq!(tk.get_attribute(mat, "4:1"), None);
        tk.set_attribute(mat, "NUMLIN", Some("4"));
        assert_eq!(tk.get_attribute(mat, "4:1"), None);
    }

    #[test]
    fn test_dimensions() {
        let (mut tk, mat, _) = matrix(3, 2);
        assert_eq!(tk.get_attribute(mat, "NUMLIN").as_deref(), Some("3"));
        assert_eq!(tk.get_int(mat, "NUMCOL"), 2);

        tk.set_attribute(mat, "2:2", Some("x"));
        tk.set_attribute(mat, "NUMLIN", Some("1"));
        tk.set_attribute(mat, "NUMLIN", Some("3"));
        assert_eq!(tk.get_attribute(mat, "2:2"), None);

        tk.set_attribute(mat, "NUMCOL", Some("-2"));
        assert_eq!(tk.get_int(mat, "NUMCOL"), 2);
    }

    #[test]
    fn test_add_and_delete_lines() {
        let (mut tk, mat, _) = matrix(3, 1);
        for lin in 1..=3 {
            tk.set_attribute_id2(mat, "", lin, 1, Some(&format!("row {lin}")));
        }

        tk.set_attribute(mat, "ADDLIN", Some("1"));
        assert_eq!(tk.get_int(mat, "NUMLIN"), 4);
        assert_eq!(tk.get_attribute(mat, "2:1"), None);
        assert_eq!(tk.get_attribute(mat, "3:1").as_deref(), Some("row 2"));

        tk.set_attribute(mat, "DELLIN", Some("1-2"));
        assert_eq!(tk.get_int(mat, "NUMLIN"), 2);
        assert_eq!(tk.get_attribute(mat, "1:1").as_deref(), Some("row 2"));
        assert_eq!(tk.get_attribute(mat, "ADDLIN"), None);

        tk.set_attribute(mat, "DELLIN", Some("9"));
        assert_eq!(tk.get_int(mat, "NUMLIN"), 2);
    }

    #[test]
    fn test_add_and_delete_columns() {
        let (mut tk, mat, _) = matrix(1, 2);
        tk.set_attribute(mat, "1:1", Some("a"));
        tk.set_attribute(mat, "1:2", Some("b"));

        tk.set_attribute(mat, "ADDCOL", Some("0-2"));
        assert_eq!(tk.get_int(mat, "NUMCOL"), 4);
        assert_eq!(tk.get_attribute(mat, "1:3").as_deref(), Some("a"));

        tk.set_attribute(mat, "DELCOL", Some("3"));
        assert_eq!(tk.get_attribute(mat, "1:3").as_deref(), Some("b"));
    }

    #[test]
    fn test_cell_colors_fall_back_to_control() {
        let (mut tk, mat, _) = matrix(2, 2);
        tk.set_attribute_id2(mat, "BGCOLOR", 1, 2, Some("255 0 0"));
        assert_eq!(tk.get_attribute_id2(mat, "BGCOLOR", 1, 2).as_deref(), Some("255 0 0"));
        assert_eq!(tk.get_attribute_id2(mat, "BGCOLOR", 2, 2), None);

        tk.set_attribute(mat, "BGCOLOR", Some("10 20 30"));
        assert_eq!(tk.get_attribute(mat, "BGCOLOR").as_deref(), Some("10 20 30"));
        assert_eq!(tk.get_attribute_id2(mat, "BGCOLOR", 2, 2).as_deref(), Some("10 20 30"));
        assert_eq!(tk.get_attribute_id2(mat, "BGCOLOR", 1, 2).as_deref(), Some("255 0 0"));

        tk.set_attribute_id2(mat, "FGCOLOR", 1, 1, Some("not a color"));
        assert_eq!(tk.get_attribute_id2(mat, "FGCOLOR", 1, 1), None);
        assert_eq!(tk.get_attribute_id2(mat, "FGCOLOR", 5, 5), None);
    }

    #[test]
    fn test_control_color_inherits() {
        let (mut tk, mat, _) = matrix(1, 1);
        let dlg = tk.create("dialog").unwrap();
        tk.append(dlg, mat).unwrap();
        tk.set_attribute(dlg, "FGCOLOR", Some("1 2 3"));
        assert_eq!(tk.get_attribute(mat, "FGCOLOR").as_deref(), Some("1 2 3"));
        assert_eq!(tk.get_attribute(mat, "FGCOLOR1:1").as_deref(), Some("1 2 3"));
    }

    #[test]
    fn test_focus_cell() {
        let (mut tk, mat, _) = matrix(3, 3);
        assert_eq!(tk.get_attribute(mat, "FOCUS_CELL").as_deref(), Some("1:1"));
        tk.set_attribute(mat, "FOCUS_CELL", Some("2:3"));
        assert_eq!(tk.get_attribute(mat, "FOCUS_CELL").as_deref(), Some("2:3"));

        // titles and cells outside the grid cannot take the focus
        tk.set_attribute(mat, "FOCUS_CELL", Some("0:1"));
        tk.set_attribute(mat, "FOCUS_CELL", Some("4:1"));
        tk.set_attribute(mat, "FOCUS_CELL", Some("bogus"));
        assert_eq!(tk.get_attribute(mat, "FOCUS_CELL").as_deref(), Some("2:3"));
    }

    #[test]
    fn test_cells_reach_native_once_mapped() {
        let (mut tk, mat, probe) = matrix(2, 2);
        let dlg = tk.create("dialog").unwrap();
        tk.append(dlg, mat).unwrap();
        tk.set_attribute(mat, "1:1", Some("before"));
        tk.map(dlg).unwrap();

        // data set before mapping stays in the control
        assert_eq!(tk.get_attribute(mat, "1:1").as_deref(), Some("before"));
        tk.set_attribute(mat, "2:2", Some("after"));
        let native = tk.native(mat).unwrap();
        assert_eq!(probe.native_attribute(native, "2:2").as_deref(), Some("after"));
        tk.set_attribute_id2(mat, "BGCOLOR", 2, 1, Some("0 0 255"));
        assert_eq!(probe.native_attribute(native, "BGCOLOR2:1").as_deref(), Some("0 0 255"));
    }
}
