//! Tree - Hierarchical node list with marking, renaming and drag-drop.
//!
//! The control's nodes exist only while it is mapped: mapping creates the
//! root branch (id 0) and unmapping drops every node. Node attributes are
//! indexed by node id (`TITLE3`, `COLOR5`); without an id they address the
//! focus node. Node values set before map are kept and applied to the new
//! root; node commands (`ADDLEAF`, `DELNODE`, `MARK`) need existing nodes.
//!
//! Native events arrive already translated to node ids. The class handles
//! them itself so the node model stays in step with what the user did, and
//! re-checks the control after every callback since a callback may destroy
//! it.

mod nodes;

pub use nodes::{NodeKind, PAGE_STEP, Placement, TreeNode, TreeState};

use tracing::{debug, trace};

use crate::driver::{DriverError, MapRequest};
use crate::engine::attrib::{bool_str, parse_boolean, parse_int, parse_int_pair};
use crate::engine::{AttrFlags, CallbackArgs, ClassMethods, ControlClass, ControlData, Handle, NativeEvent, Toolkit};
use crate::error::Result;
use crate::types::{CallbackResult, NO_ID, NativeHandle, NativeType, Param, Rgb, keys};

pub(crate) fn register(tk: &mut Toolkit) -> Result<()> {
    let mut class = ControlClass::new("tree")
        .parent("element")
        .native_type(NativeType::Control)
        .interactive(true)
        .methods(ClassMethods {
            create: Some(create),
            map: Some(map),
            unmap: Some(unmap),
            handle_event: Some(handle_event),
            ..Default::default()
        });

    // values set before map are stored and re-applied once the root exists
    let node = AttrFlags::NO_INHERIT;
    let command = AttrFlags::NOT_MAPPED | AttrFlags::NO_INHERIT;
    let write_only = command | AttrFlags::WRITE_ONLY;
    let read_only = command | AttrFlags::READ_ONLY;

    class.register_attribute("COUNT", Some(get_count), None, None, read_only | AttrFlags::NO_DEFAULT);
    class.register_attribute("LASTADDNODE", Some(get_last_add_node), None, None, read_only);
    class.register_attribute("INDENTATION", Some(get_indentation), Some(set_indentation), None, node);
    class.register_attribute("ADDEXPANDED", None, None, Some("YES"), AttrFlags::NO_INHERIT);
    class.register_attribute("SHOWRENAME", None, None, Some("NO"), AttrFlags::NO_INHERIT);
    class.register_attribute("MARKMODE", None, Some(set_mark_mode), Some("SINGLE"), node);
    class.register_attribute("EXPANDALL", None, Some(set_expand_all), None, write_only);
    class.register_attribute("MARK", None, Some(set_mark), None, write_only);
    let mark_start = node | AttrFlags::NO_DEFAULT | AttrFlags::NO_SAVE;
    class.register_attribute("MARKSTART", Some(get_mark_start), Some(set_mark_start), None, mark_start);
    class.register_attribute("STARTING", Some(get_mark_start), Some(set_mark_start), None, mark_start);
    class.register_attribute("RENAME", None, Some(set_rename), None, write_only);
    class.register_attribute(
        "VALUE",
        Some(get_value),
        Some(set_value),
        None,
        node | AttrFlags::NO_DEFAULT | AttrFlags::NO_SAVE,
    );

    class.register_attribute_id("ADDLEAF", None, Some(set_add_leaf), write_only);
    class.register_attribute_id("ADDBRANCH", None, Some(set_add_branch), write_only);
    class.register_attribute_id("INSERTLEAF", None, Some(set_insert_leaf), write_only);
    class.register_attribute_id("INSERTBRANCH", None, Some(set_insert_branch), write_only);
    class.register_attribute_id("DELNODE", None, Some(set_del_node), write_only);
    class.register_attribute_id("MOVENODE", None, Some(set_move_node), write_only);
    class.register_attribute_id("STATE", Some(get_state), Some(set_state), node | AttrFlags::NO_DEFAULT);
    class.register_attribute_id("DEPTH", Some(get_depth), None, read_only);
    class.register_attribute_id("KIND", Some(get_kind), None, read_only);
    class.register_attribute_id("PARENT", Some(get_parent), None, read_only);
    class.register_attribute_id("CHILDCOUNT", Some(get_child_count), None, read_only);
    class.register_attribute_id("COLOR", Some(get_color), Some(set_color), node);
    class.register_attribute_id("TITLE", Some(get_title), Some(set_title), node);
    class.register_attribute_id("NAME", Some(get_title), Some(set_title), node);
    class.register_attribute_id("USERDATA", Some(get_userdata), Some(set_userdata), node);
    class.register_attribute_id("TITLEFONT", Some(get_title_font), Some(set_title_font), node);
    class.register_attribute_id("IMAGE", None, Some(set_image), write_only);
    class.register_attribute_id("IMAGEEXPANDED", None, Some(set_image_expanded), write_only);
    class.register_attribute_id("MARKED", Some(get_marked), Some(set_marked), node);

    tk.register_class(class)?;
    Ok(())
}

// =============================================================================
// Methods
// =============================================================================

fn create(tk: &mut Toolkit, h: Handle, _params: &[Param]) -> Result<()> {
    if let Some(control) = tk.control_mut(h) {
        control.data = ControlData::Tree(TreeState::new());
    }
    Ok(())
}

fn map(tk: &mut Toolkit, h: Handle) -> std::result::Result<Option<NativeHandle>, DriverError> {
    let request = MapRequest {
        handle: h,
        class: "tree".to_string(),
        native_type: NativeType::Control,
        parent: tk.native_parent(h),
        title: None,
    };
    let native = tk.driver.map(&request)?;
    if let Some(state) = tk.control_mut(h).and_then(|c| c.tree_mut()) {
        state.add_root();
    }
    Ok(Some(native))
}

fn unmap(tk: &mut Toolkit, h: Handle) {
    if let Some(state) = tk.control_mut(h).and_then(|c| c.tree_mut()) {
        state.clear();
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn state(tk: &Toolkit, h: Handle) -> Option<&TreeState> {
    tk.control(h)?.tree()
}

fn state_mut(tk: &mut Toolkit, h: Handle) -> Option<&mut TreeState> {
    tk.control_mut(h)?.tree_mut()
}

/// Node addressed by an attribute id. `NO_ID` means the focus node.
fn node_id(tk: &Toolkit, h: Handle, id: i32) -> Option<usize> {
    let state = state(tk, h)?;
    if id == NO_ID {
        return state.focus.filter(|&f| f < state.len());
    }
    state.check(id)
}

/// Node named by a text value (`"3"`), as MOVENODE and MARK use.
fn node_from_text(tk: &Toolkit, h: Handle, text: &str) -> Option<usize> {
    state(tk, h)?.check(parse_int(text)?)
}

fn with_node<T>(tk: &Toolkit, h: Handle, id: i32, f: impl FnOnce(&TreeNode) -> T) -> Option<T> {
    let id = node_id(tk, h, id)?;
    state(tk, h)?.node(id).map(f)
}

fn update_node(tk: &mut Toolkit, h: Handle, id: i32, f: impl FnOnce(&mut TreeNode)) -> bool {
    let Some(id) = node_id(tk, h, id) else {
        return false;
    };
    if let Some(node) = state_mut(tk, h).and_then(|s| s.node_mut(id)) {
        f(node);
    }
    false
}

// =============================================================================
// Plain Attributes
// =============================================================================

fn get_count(tk: &Toolkit, h: Handle) -> Option<String> {
    Some(state(tk, h)?.len().to_string())
}

fn get_last_add_node(tk: &Toolkit, h: Handle) -> Option<String> {
    state(tk, h)?.last_added.map(|id| id.to_string())
}

fn get_indentation(tk: &Toolkit, h: Handle) -> Option<String> {
    Some(state(tk, h)?.indentation.to_string())
}

fn set_indentation(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    if let Some(indent) = value.and_then(parse_int) {
        if let Some(state) = state_mut(tk, h) {
            state.indentation = indent;
        }
    }
    false
}

fn set_mark_mode(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let multiple = value.is_some_and(|v| v.eq_ignore_ascii_case("MULTIPLE"));
    if let Some(state) = state_mut(tk, h) {
        state.multiple = multiple;
    }
    true
}

fn set_expand_all(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let expanded = value.is_some_and(parse_boolean);
    if let Some(state) = state_mut(tk, h) {
        state.set_all_expanded(expanded);
    }
    false
}

/// Marking commands. Only trees in MULTIPLE mode accept them; returns
/// whether `value` was a marking command.
fn apply_mark(tk: &mut Toolkit, h: Handle, value: &str) -> bool {
    let Some(state) = state(tk, h) else {
        return false;
    };
    if !state.multiple {
        return false;
    }

    if value.eq_ignore_ascii_case("CLEARALL") {
        if let Some(state) = state_mut(tk, h) {
            state.set_all_marked(false);
        }
    } else if value.eq_ignore_ascii_case("MARKALL") {
        if let Some(state) = state_mut(tk, h) {
            state.set_all_marked(true);
        }
    } else if value.eq_ignore_ascii_case("INVERTALL") {
        if let Some(state) = state_mut(tk, h) {
            state.invert_all_marks();
        }
    } else if let Some(rest) = value.strip_prefix("INVERT") {
        let Some(id) = node_from_text(tk, h, rest) else {
            return false;
        };
        if let Some(node) = state_mut(tk, h).and_then(|s| s.node_mut(id)) {
            node.marked = !node.marked;
        }
    } else if value.eq_ignore_ascii_case("BLOCK") {
        let (Some(start), Some(focus)) = (state.mark_start, state.focus) else {
            return false;
        };
        if let Some(state) = state_mut(tk, h) {
            state.mark_range(focus, start, false);
        }
    } else {
        let (Some(a), Some(b)) = parse_int_pair(value, '-') else {
            return false;
        };
        let (Some(a), Some(b)) = (state.check(a), state.check(b)) else {
            return false;
        };
        if let Some(state) = state_mut(tk, h) {
            state.mark_range(a, b, false);
        }
    }
    true
}

fn set_mark(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    if let Some(value) = value {
        apply_mark(tk, h, value);
    }
    false
}

fn get_mark_start(tk: &Toolkit, h: Handle) -> Option<String> {
    let state = state(tk, h)?;
    state.mark_start.filter(|&i| i < state.len()).map(|i| i.to_string())
}

fn set_mark_start(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let Some(id) = value.and_then(|v| node_from_text(tk, h, v)) else {
        return false;
    };
    if let Some(state) = state_mut(tk, h) {
        state.mark_start = Some(id);
    }
    false
}

fn get_value(tk: &Toolkit, h: Handle) -> Option<String> {
    let state = state(tk, h)?;
    state.focus.filter(|&f| f < state.len()).map(|f| f.to_string())
}

/// Move the focus: ROOT, LAST, PGUP, PGDN, NEXT, PREVIOUS or a node id.
/// Marking commands are accepted too.
fn set_value(tk: &mut Toolkit, h: Handle, value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    if apply_mark(tk, h, value) {
        return false;
    }
    let Some(state) = state(tk, h) else {
        return false;
    };
    let focus = state.focus.filter(|&f| f < state.len());

    let target = match value.to_ascii_uppercase().as_str() {
        "ROOT" => state.check(0),
        "LAST" => state.last_visible(),
        "PGUP" => focus.and_then(|f| state.visible_offset(f, -PAGE_STEP)),
        "PGDN" => focus.and_then(|f| state.visible_offset(f, PAGE_STEP)),
        "NEXT" => focus.and_then(|f| state.next_visible(f)),
        "PREVIOUS" => focus.and_then(|f| state.previous_visible(f)),
        _ => node_from_text(tk, h, value),
    };
    if let Some(id) = target {
        select_node(tk, h, id);
    }
    false
}

/// Focus a node, marking it alone in SINGLE mode.
fn select_node(tk: &mut Toolkit, h: Handle, id: usize) {
    if let Some(state) = state_mut(tk, h) {
        if !state.multiple {
            state.mark_single(id);
        }
        state.focus = Some(id);
        state.old_value = Some(id);
    }
    trace!(handle = %h, id, "tree focus");
}

fn set_rename(tk: &mut Toolkit, h: Handle, _value: Option<&str>) -> bool {
    start_rename(tk, h);
    false
}

/// With SHOWRENAME the native editor opens on the focus node; otherwise the
/// application gets RENAMENODE_CB.
fn start_rename(tk: &mut Toolkit, h: Handle) {
    let Some(focus) = node_id(tk, h, NO_ID) else {
        return;
    };
    let focus_id = focus as i32;
    if tk.get_boolean(h, "SHOWRENAME") {
        tk.call_callback(h, "SHOWRENAME_CB", &CallbackArgs::Node(focus_id));
        crate::controls::base::push_native(tk, h, "RENAME", Some(&focus_id.to_string()));
    } else {
        let title = with_node(tk, h, NO_ID, |n| n.title.clone()).unwrap_or_default();
        tk.call_callback(
            h,
            "RENAMENODE_CB",
            &CallbackArgs::Rename {
                node: focus_id,
                title,
            },
        );
    }
}

// =============================================================================
// Node Attributes
// =============================================================================

fn add(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>, kind: NodeKind, placement: Placement) -> bool {
    let Some(reference) = node_id(tk, h, id) else {
        return false;
    };
    let expanded = tk.get_boolean(h, "ADDEXPANDED");
    let title = value.unwrap_or("");
    let added = state_mut(tk, h).and_then(|s| s.add_node(reference, kind, title, placement, expanded));
    debug!(handle = %h, reference, ?added, kind = kind.as_str(), "tree node added");
    false
}

fn set_add_leaf(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    add(tk, h, id, value, NodeKind::Leaf, Placement::Add)
}

fn set_add_branch(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    add(tk, h, id, value, NodeKind::Branch, Placement::Add)
}

fn set_insert_leaf(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    add(tk, h, id, value, NodeKind::Leaf, Placement::Insert)
}

fn set_insert_branch(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    add(tk, h, id, value, NodeKind::Branch, Placement::Insert)
}

/// SELECTED removes the node, CHILDREN its descendants, MARKED every marked
/// node. The root itself is never removed.
fn set_del_node(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    if value.eq_ignore_ascii_case("MARKED") {
        if let Some(state) = state_mut(tk, h) {
            state.remove_marked();
        }
        return false;
    }

    let Some(node) = node_id(tk, h, id) else {
        return false;
    };
    if let Some(state) = state_mut(tk, h) {
        if value.eq_ignore_ascii_case("SELECTED") {
            state.remove_node(node);
        } else if value.eq_ignore_ascii_case("CHILDREN") {
            state.remove_children(node);
        }
    }
    false
}

fn set_move_node(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let Some(src) = node_id(tk, h, id) else {
        return false;
    };
    let Some(dst) = value.and_then(|v| node_from_text(tk, h, v)) else {
        return false;
    };
    if let Some(state) = state_mut(tk, h) {
        state.move_node(src, dst);
    }
    false
}

fn get_state(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| {
        n.is_branch()
            .then(|| if n.expanded { "EXPANDED" } else { "COLLAPSED" }.to_string())
    })
    .flatten()
}

fn set_state(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let expanded = value.is_some_and(|v| v.eq_ignore_ascii_case("EXPANDED"));
    update_node(tk, h, id, |n| {
        if n.is_branch() {
            n.expanded = expanded;
        }
    })
}

fn get_depth(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| n.depth.to_string())
}

fn get_kind(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| n.kind.as_str().to_string())
}

fn get_parent(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    let node = node_id(tk, h, id)?;
    state(tk, h)?.parent(node).map(|p| p.to_string())
}

fn get_child_count(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    let node = node_id(tk, h, id)?;
    Some(state(tk, h)?.children(node).len().to_string())
}

/// Node color, falling back to the tree's FGCOLOR.
fn get_color(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    let color = with_node(tk, h, id, |n| n.color)?;
    let color = color
        .or_else(|| tk.get_rgb(h, "FGCOLOR"))
        .unwrap_or(Rgb::BLACK);
    Some(color.to_string())
}

fn set_color(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let color = match value {
        Some(text) => match Rgb::parse(text) {
            Some(color) => Some(color),
            None => return false,
        },
        None => None,
    };
    update_node(tk, h, id, |n| n.color = color)
}

fn get_title(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| n.title.clone())
}

fn set_title(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let title = value.unwrap_or("").to_string();
    update_node(tk, h, id, |n| n.title = title)
}

fn get_userdata(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| n.userdata.clone()).flatten()
}

fn set_userdata(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let data = value.map(str::to_string);
    update_node(tk, h, id, |n| n.userdata = data)
}

/// Node font, falling back to the tree's FONT.
fn get_title_font(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| n.font.clone())?.or_else(|| tk.get_attribute(h, "FONT"))
}

fn set_title_font(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let font = value.map(str::to_string);
    update_node(tk, h, id, |n| n.font = font)
}

fn set_image(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let image = value.map(str::to_string);
    update_node(tk, h, id, |n| n.image = image)
}

fn set_image_expanded(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let image = value.map(str::to_string);
    update_node(tk, h, id, |n| n.image_expanded = image)
}

fn get_marked(tk: &Toolkit, h: Handle, id: i32) -> Option<String> {
    with_node(tk, h, id, |n| bool_str(n.marked).to_string())
}

fn set_marked(tk: &mut Toolkit, h: Handle, id: i32, value: Option<&str>) -> bool {
    let marked = value.is_some_and(parse_boolean);
    update_node(tk, h, id, |n| n.marked = marked)
}

// =============================================================================
// Events
// =============================================================================

fn handle_event(tk: &mut Toolkit, h: Handle, event: &NativeEvent) -> Option<CallbackResult> {
    match event {
        NativeEvent::Selection { node, selected } => Some(on_selection(tk, h, *node, *selected)),
        NativeEvent::MultiSelection(nodes) => Some(on_multi_selection(tk, h, nodes)),
        NativeEvent::BranchOpen(node) => Some(on_branch_toggle(tk, h, *node, true)),
        NativeEvent::BranchClose(node) => Some(on_branch_toggle(tk, h, *node, false)),
        NativeEvent::ExecuteLeaf(node) => Some(on_execute(tk, h, *node)),
        NativeEvent::Rename { node, title } => Some(on_rename(tk, h, *node, title)),
        NativeEvent::DragDrop { drag, drop, shift, control } => {
            Some(on_drag_drop(tk, h, *drag, *drop, *shift, *control))
        }
        NativeEvent::Key(code) => on_key(tk, h, *code),
        NativeEvent::RightClick(node) => {
            // clicks outside any node are not reported
            state(tk, h)?.check(*node)?;
            None
        }
        _ => None,
    }
}

/// The native selection moved. In SINGLE mode the previous node is reported
/// unselected and the new one selected; a toggled node in MULTIPLE mode is
/// reported as is.
fn on_selection(tk: &mut Toolkit, h: Handle, node: i32, selected: bool) -> CallbackResult {
    let Some(id) = state(tk, h).and_then(|s| s.check(node)) else {
        return CallbackResult::Default;
    };
    let multiple = state(tk, h).is_some_and(|s| s.multiple);

    if multiple {
        if let Some(n) = state_mut(tk, h).and_then(|s| s.node_mut(id)) {
            n.marked = selected;
        }
        if let Some(state) = state_mut(tk, h) {
            state.focus = Some(id);
        }
        return tk.call_callback(h, "SELECTION_CB", &CallbackArgs::Selection { node, selected });
    }

    let old = state(tk, h).and_then(|s| s.old_value);
    select_node(tk, h, id);
    if old == Some(id) {
        return CallbackResult::Default;
    }
    if let Some(old) = old {
        let args = CallbackArgs::Selection {
            node: old as i32,
            selected: false,
        };
        tk.call_callback(h, "SELECTION_CB", &args);
        if !tk.is_alive(h) {
            return CallbackResult::Default;
        }
    }
    tk.call_callback(h, "SELECTION_CB", &CallbackArgs::Selection { node, selected: true })
}

/// A block of nodes was selected. Without MULTISELECTION_CB each node is
/// reported through SELECTION_CB.
fn on_multi_selection(tk: &mut Toolkit, h: Handle, nodes: &[i32]) -> CallbackResult {
    let ids: Vec<i32> = match state(tk, h) {
        Some(state) => nodes.iter().copied().filter(|&n| state.check(n).is_some()).collect(),
        None => return CallbackResult::Default,
    };
    if ids.is_empty() {
        return CallbackResult::Default;
    }
    if let Some(state) = state_mut(tk, h) {
        for &id in &ids {
            if let Some(node) = state.node_mut(id as usize) {
                node.marked = true;
            }
        }
    }

    if tk.get_callback(h, "MULTISELECTION_CB").is_some() {
        return tk.call_callback(h, "MULTISELECTION_CB", &CallbackArgs::Nodes(ids));
    }
    let mut result = CallbackResult::Default;
    for id in ids {
        if !tk.is_alive(h) {
            break;
        }
        result = tk.call_callback(h, "SELECTION_CB", &CallbackArgs::Selection { node: id, selected: true });
    }
    result
}

/// A branch was opened or closed by the user. IGNORE keeps the old state.
fn on_branch_toggle(tk: &mut Toolkit, h: Handle, node: i32, open: bool) -> CallbackResult {
    let Some(id) = state(tk, h).and_then(|s| s.check(node)) else {
        return CallbackResult::Default;
    };
    let name = if open { "BRANCHOPEN_CB" } else { "BRANCHCLOSE_CB" };
    let result = tk.call_callback(h, name, &CallbackArgs::Node(node));
    if result != CallbackResult::Ignore {
        if let Some(n) = state_mut(tk, h).and_then(|s| s.node_mut(id)) {
            if n.is_branch() {
                n.expanded = open;
            }
        }
    }
    result
}

/// Default action: a branch toggles, a leaf fires EXECUTELEAF_CB.
fn on_execute(tk: &mut Toolkit, h: Handle, node: i32) -> CallbackResult {
    let Some(branch) = state(tk, h)
        .and_then(|s| s.check(node).and_then(|id| s.node(id)))
        .map(|n| (n.is_branch(), n.expanded))
    else {
        return CallbackResult::Default;
    };
    match branch {
        (true, expanded) => on_branch_toggle(tk, h, node, !expanded),
        (false, _) => tk.call_callback(h, "EXECUTELEAF_CB", &CallbackArgs::Node(node)),
    }
}

/// The in-place editor closed. IGNORE keeps the old title.
fn on_rename(tk: &mut Toolkit, h: Handle, node: i32, title: &str) -> CallbackResult {
    let Some(id) = state(tk, h).and_then(|s| s.check(node)) else {
        return CallbackResult::Default;
    };
    let args = CallbackArgs::Rename {
        node,
        title: title.to_string(),
    };
    let result = tk.call_callback(h, "RENAME_CB", &args);
    if result != CallbackResult::Ignore {
        if let Some(n) = state_mut(tk, h).and_then(|s| s.node_mut(id)) {
            n.title = title.to_string();
        }
    }
    result
}

/// A node was dropped on another. Without a callback, or when it answers
/// CONTINUE, the node moves.
fn on_drag_drop(tk: &mut Toolkit, h: Handle, drag: i32, drop: i32, shift: bool, control: bool) -> CallbackResult {
    let ids = state(tk, h).and_then(|s| Some((s.check(drag)?, s.check(drop)?)));
    let Some((src, dst)) = ids else {
        return CallbackResult::Default;
    };

    let result = if tk.get_callback(h, "DRAGDROP_CB").is_some() {
        let args = CallbackArgs::DragDrop {
            drag,
            drop,
            shift,
            control,
        };
        tk.call_callback(h, "DRAGDROP_CB", &args)
    } else {
        CallbackResult::Continue
    };

    if result == CallbackResult::Continue {
        if let Some(state) = state_mut(tk, h) {
            state.move_node(src, dst);
        }
    }
    result
}

/// Keys the tree handles itself. Others go to K_ANY.
fn on_key(tk: &mut Toolkit, h: Handle, code: i32) -> Option<CallbackResult> {
    let state = state(tk, h)?;
    let focus = state.focus.filter(|&f| f < state.len());

    match keys::base(code) {
        keys::K_F2 => {
            start_rename(tk, h);
        }
        keys::K_HOME | keys::K_END => {
            let target = if keys::base(code) == keys::K_HOME {
                state.check(0)
            } else {
                state.last_visible()
            }?;
            if keys::is_ctrl(code) {
                if let Some(state) = state_mut(tk, h) {
                    state.focus = Some(target);
                }
            } else if keys::is_shift(code) {
                let focus = focus?;
                if let Some(state) = state_mut(tk, h) {
                    state.mark_range(focus, target, true);
                    state.focus = Some(target);
                }
            } else {
                if let Some(state) = state_mut(tk, h) {
                    state.mark_single(target);
                    state.focus = Some(target);
                }
            }
        }
        keys::K_UP | keys::K_DOWN if keys::is_ctrl(code) => {
            // focus moves without touching the marks
            let focus = focus?;
            let target = if keys::base(code) == keys::K_DOWN {
                state.next_visible(focus)
            } else {
                state.previous_visible(focus)
            }?;
            if let Some(state) = state_mut(tk, h) {
                state.focus = Some(target);
            }
        }
        _ => return None,
    }
    Some(CallbackResult::Default)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::driver::HeadlessDriver;
    use crate::engine::{CallbackArgs, Handle, NativeEvent, Toolkit};
    use crate::types::{CallbackResult, keys};

    fn mapped_tree() -> (Toolkit, Handle) {
        let mut tk = Toolkit::with_driver(HeadlessDriver::new()).unwrap();
        let dlg = tk.create("dialog").unwrap();
        let tree = tk.create("tree").unwrap();
        tk.append(dlg, tree).unwrap();
        tk.map(dlg).unwrap();
        (tk, tree)
    }

    /// root
    ///   docs (branch)
    ///     a.txt
    ///     b.txt
    ///   notes.txt
    fn populated() -> (Toolkit, Handle) {
        let (mut tk, tree) = mapped_tree();
        tk.set_attribute(tree, "TITLE0", Some("root"));
        tk.set_attribute(tree, "ADDLEAF0", Some("notes.txt"));
        tk.set_attribute(tree, "ADDBRANCH0", Some("docs"));
        tk.set_attribute(tree, "ADDLEAF1", Some("b.txt"));
        tk.set_attribute(tree, "ADDLEAF1", Some("a.txt"));
        (tk, tree)
    }

    fn titles(tk: &Toolkit, tree: Handle) -> Vec<String> {
        let count = tk.get_int(tree, "COUNT");
        (0..count)
            .map(|id| tk.get_attribute_id(tree, "TITLE", id).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_nodes_exist_only_while_mapped() {
        let mut tk = Toolkit::with_driver(HeadlessDriver::new()).unwrap();
        let dlg = tk.create("dialog").unwrap();
        let tree = tk.create("tree").unwrap();
        tk.append(dlg, tree).unwrap();

        tk.set_attribute(tree, "ADDLEAF0", Some("early"));
        assert_eq!(tk.get_attribute(tree, "COUNT"), Some("0".to_string()));

        tk.map(dlg).unwrap();
        assert_eq!(tk.get_int(tree, "COUNT"), 1);
        assert_eq!(tk.get_attribute(tree, "KIND0").as_deref(), Some("BRANCH"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("0"));

        tk.unmap(dlg);
        assert_eq!(tk.get_int(tree, "COUNT"), 0);
    }

    #[test]
    fn test_node_values_set_before_map_apply_to_root() {
        let mut tk = Toolkit::with_driver(HeadlessDriver::new()).unwrap();
        let dlg = tk.create("dialog").unwrap();
        let tree = tk.create("tree").unwrap();
        tk.append(dlg, tree).unwrap();

        tk.set_attribute(tree, "TITLE0", Some("home"));
        tk.set_attribute_id(tree, "COLOR", 0, Some("0 0 255"));
        tk.set_attribute(tree, "USERDATA0", Some("root-data"));
        assert_eq!(tk.get_attribute(tree, "TITLE0").as_deref(), Some("home"));

        tk.map(dlg).unwrap();
        assert_eq!(tk.get_attribute(tree, "TITLE0").as_deref(), Some("home"));
        assert_eq!(tk.get_attribute(tree, "COLOR0").as_deref(), Some("0 0 255"));
        assert_eq!(tk.get_attribute(tree, "USERDATA0").as_deref(), Some("root-data"));

        // applied values live in the node, not in the store
        let stored = tk.get_attributes(tree).unwrap();
        assert!(!stored.contains("TITLE0"), "{stored}");
    }

    #[test]
    fn test_add_nodes_in_preorder() {
        let (tk, tree) = populated();
        assert_eq!(titles(&tk, tree), vec!["root", "docs", "a.txt", "b.txt", "notes.txt"]);
        assert_eq!(tk.get_attribute(tree, "DEPTH3").as_deref(), Some("2"));
        assert_eq!(tk.get_attribute(tree, "PARENT3").as_deref(), Some("1"));
        assert_eq!(tk.get_attribute(tree, "PARENT0"), None);
        assert_eq!(tk.get_attribute(tree, "CHILDCOUNT0").as_deref(), Some("2"));
        assert_eq!(tk.get_attribute(tree, "KIND4").as_deref(), Some("LEAF"));
        assert_eq!(tk.get_attribute(tree, "STATE1").as_deref(), Some("EXPANDED"));
        assert_eq!(tk.get_attribute(tree, "STATE2"), None);
        assert_eq!(tk.get_attribute(tree, "LASTADDNODE").as_deref(), Some("2"));
    }

    #[test]
    fn test_add_collapsed_and_insert() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "ADDEXPANDED", Some("NO"));
        tk.set_attribute(tree, "INSERTBRANCH1", Some("archive"));
        assert_eq!(titles(&tk, tree), vec!["root", "docs", "a.txt", "b.txt", "archive", "notes.txt"]);
        assert_eq!(tk.get_attribute(tree, "STATE4").as_deref(), Some("COLLAPSED"));

        tk.set_attribute(tree, "INSERTLEAF0", Some("sibling of root"));
        assert_eq!(tk.get_int(tree, "COUNT"), 6);
    }

    #[test]
    fn test_node_color_by_id() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "ADDLEAF4", Some("extra"));
        tk.set_attribute_id(tree, "COLOR", 5, Some("255 0 0"));
        assert_eq!(tk.get_attribute_id(tree, "COLOR", 5).as_deref(), Some("255 0 0"));
        assert_eq!(tk.get_attribute_id(tree, "COLOR", 999), None);
        assert_eq!(tk.get_attribute_id(tree, "COLOR", 1).as_deref(), Some("0 0 0"));

        // invalid colors leave the node alone
        tk.set_attribute_id(tree, "COLOR", 5, Some("red"));
        assert_eq!(tk.get_attribute_id(tree, "COLOR", 5).as_deref(), Some("255 0 0"));
        tk.set_attribute_id(tree, "COLOR", 999, Some("1 2 3"));
        assert_eq!(tk.get_attribute_id(tree, "COLOR", 999), None);
    }

    #[test]
    fn test_plain_name_addresses_focus_node() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "VALUE", Some("4"));
        assert_eq!(tk.get_attribute(tree, "TITLE").as_deref(), Some("notes.txt"));
        tk.set_attribute(tree, "NAME", Some("todo.txt"));
        assert_eq!(tk.get_attribute_id(tree, "TITLE", 4).as_deref(), Some("todo.txt"));
        tk.set_attribute(tree, "USERDATA", Some("blob"));
        assert_eq!(tk.get_attribute(tree, "USERDATA4").as_deref(), Some("blob"));
    }

    #[test]
    fn test_title_font_falls_back_to_font() {
        let (mut tk, tree) = populated();
        assert_eq!(tk.get_attribute(tree, "TITLEFONT2").as_deref(), Some("Sans, 10"));
        tk.set_attribute(tree, "TITLEFONT2", Some("Mono, 9"));
        assert_eq!(tk.get_attribute(tree, "TITLEFONT2").as_deref(), Some("Mono, 9"));
        tk.set_attribute(tree, "IMAGE2", Some("IMGPAPER"));
        assert_eq!(tk.get_attribute(tree, "IMAGE2"), None);
    }

    #[test]
    fn test_delnode_variants() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "DELNODE0", Some("SELECTED"));
        assert_eq!(tk.get_int(tree, "COUNT"), 5);

        tk.set_attribute(tree, "DELNODE1", Some("CHILDREN"));
        assert_eq!(titles(&tk, tree), vec!["root", "docs", "notes.txt"]);

        tk.set_attribute(tree, "DELNODE1", Some("SELECTED"));
        assert_eq!(titles(&tk, tree), vec!["root", "notes.txt"]);

        tk.set_attribute(tree, "MARKED1", Some("YES"));
        tk.set_attribute(tree, "DELNODE", Some("MARKED"));
        assert_eq!(titles(&tk, tree), vec!["root"]);
        assert_eq!(tk.get_attribute(tree, "DELNODE"), None);
    }

    #[test]
    fn test_movenode() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "MOVENODE4", Some("1"));
        assert_eq!(titles(&tk, tree), vec!["root", "docs", "notes.txt", "a.txt", "b.txt"]);

        // into its own subtree is refused
        tk.set_attribute(tree, "MOVENODE1", Some("3"));
        assert_eq!(tk.get_int(tree, "COUNT"), 5);
        assert_eq!(tk.get_attribute(tree, "DEPTH3").as_deref(), Some("2"));
    }

    #[test]
    fn test_value_navigation() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "VALUE", Some("LAST"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("4"));
        tk.set_attribute(tree, "VALUE", Some("NEXT"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("4"));
        tk.set_attribute(tree, "VALUE", Some("PREVIOUS"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("3"));
        tk.set_attribute(tree, "VALUE", Some("PGUP"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("0"));
        tk.set_attribute(tree, "VALUE", Some("PGDN"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("4"));
        tk.set_attribute(tree, "VALUE", Some("ROOT"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("0"));

        // collapsed branches hide their children from navigation
        tk.set_attribute(tree, "STATE1", Some("COLLAPSED"));
        tk.set_attribute(tree, "VALUE", Some("1"));
        tk.set_attribute(tree, "VALUE", Some("NEXT"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("4"));

        tk.set_attribute(tree, "VALUE", Some("77"));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("4"));
        assert_eq!(tk.get_attribute(tree, "MARKED4").as_deref(), Some("YES"));
        assert_eq!(tk.get_attribute(tree, "MARKED0").as_deref(), Some("NO"));
    }

    #[test]
    fn test_expandall() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "EXPANDALL", Some("NO"));
        assert_eq!(tk.get_attribute(tree, "STATE0").as_deref(), Some("EXPANDED"));
        assert_eq!(tk.get_attribute(tree, "STATE1").as_deref(), Some("COLLAPSED"));
        tk.set_attribute(tree, "EXPANDALL", Some("YES"));
        assert_eq!(tk.get_attribute(tree, "STATE1").as_deref(), Some("EXPANDED"));
    }

    #[test]
    fn test_marking_requires_multiple_mode() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "MARK", Some("MARKALL"));
        assert_eq!(tk.get_attribute(tree, "MARKED3").as_deref(), Some("NO"));

        tk.set_attribute(tree, "MARKMODE", Some("MULTIPLE"));
        tk.set_attribute(tree, "MARK", Some("MARKALL"));
        assert_eq!(tk.get_attribute(tree, "MARKED3").as_deref(), Some("YES"));

        tk.set_attribute(tree, "MARK", Some("CLEARALL"));
        tk.set_attribute(tree, "MARK", Some("1-3"));
        let marked: Vec<String> = (0..5)
            .map(|id| tk.get_attribute_id(tree, "MARKED", id).unwrap())
            .collect();
        assert_eq!(marked, vec!["NO", "YES", "YES", "YES", "NO"]);

        tk.set_attribute(tree, "MARK", Some("INVERT2"));
        assert_eq!(tk.get_attribute(tree, "MARKED2").as_deref(), Some("NO"));

        tk.set_attribute(tree, "MARK", Some("CLEARALL"));
        tk.set_attribute(tree, "MARKSTART", Some("2"));
        tk.set_attribute(tree, "VALUE", Some("4"));
        tk.set_attribute(tree, "VALUE", Some("BLOCK"));
        let marked: Vec<String> = (0..5)
            .map(|id| tk.get_attribute_id(tree, "MARKED", id).unwrap())
            .collect();
        assert_eq!(marked, vec!["NO", "NO", "YES", "YES", "YES"]);
        assert_eq!(tk.get_attribute(tree, "MARKSTART").as_deref(), Some("2"));
    }

    #[test]
    fn test_mark_start_follows_node_removal() {
        let (mut tk, tree) = populated();
        tk.set_attribute(tree, "MARKSTART", Some("4"));
        tk.set_attribute(tree, "DELNODE1", Some("SELECTED"));
        assert_eq!(titles(&tk, tree), vec!["root", "notes.txt"]);
        assert_eq!(tk.get_attribute(tree, "MARKSTART").as_deref(), Some("1"));

        tk.set_attribute(tree, "DELNODE0", Some("CHILDREN"));
        assert_eq!(tk.get_attribute(tree, "MARKSTART"), None);
        assert!(!tk.get_attributes(tree).unwrap().contains("MARKSTART"));
    }

    #[test]
    fn test_selection_events_report_old_and_new() {
        let (mut tk, tree) = populated();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        tk.set_callback(tree, "SELECTION_CB", move |_, _, args| {
            if let CallbackArgs::Selection { node, selected } = args {
                log.borrow_mut().push((*node, *selected));
            }
            CallbackResult::Default
        });

        tk.dispatch_event(tree, &NativeEvent::Selection { node: 2, selected: true });
        tk.dispatch_event(tree, &NativeEvent::Selection { node: 2, selected: true });
        tk.dispatch_event(tree, &NativeEvent::Selection { node: 99, selected: true });
        assert_eq!(*seen.borrow(), vec![(0, false), (2, true)]);
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("2"));
    }

    #[test]
    fn test_multi_selection_falls_back_to_selection() {
        let (mut tk, tree) = populated();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        tk.set_callback(tree, "SELECTION_CB", move |_, _, args| {
            if let CallbackArgs::Selection { node, .. } = args {
                log.borrow_mut().push(*node);
            }
            CallbackResult::Default
        });
        tk.dispatch_event(tree, &NativeEvent::MultiSelection(vec![1, 3, 42]));
        assert_eq!(*seen.borrow(), vec![1, 3]);

        let nodes = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&nodes);
        tk.set_callback(tree, "MULTISELECTION_CB", move |_, _, args| {
            if let CallbackArgs::Nodes(ids) = args {
                log.borrow_mut().extend(ids.iter().copied());
            }
            CallbackResult::Default
        });
        tk.dispatch_event(tree, &NativeEvent::MultiSelection(vec![4]));
        assert_eq!(*nodes.borrow(), vec![4]);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_branch_close_can_be_refused() {
        let (mut tk, tree) = populated();
        tk.set_callback(tree, "BRANCHCLOSE_CB", |_, _, _| CallbackResult::Ignore);
        tk.dispatch_event(tree, &NativeEvent::BranchClose(1));
        assert_eq!(tk.get_attribute(tree, "STATE1").as_deref(), Some("EXPANDED"));

        tk.unset_callback(tree, "BRANCHCLOSE_CB");
        tk.dispatch_event(tree, &NativeEvent::BranchClose(1));
        assert_eq!(tk.get_attribute(tree, "STATE1").as_deref(), Some("COLLAPSED"));

        // default action on a branch toggles it
        tk.dispatch_event(tree, &NativeEvent::ExecuteLeaf(1));
        assert_eq!(tk.get_attribute(tree, "STATE1").as_deref(), Some("EXPANDED"));
    }

    #[test]
    fn test_execute_leaf() {
        let (mut tk, tree) = populated();
        let hit = Rc::new(RefCell::new(None));
        let log = Rc::clone(&hit);
        tk.set_callback(tree, "EXECUTELEAF_CB", move |_, _, args| {
            *log.borrow_mut() = Some(args.clone());
            CallbackResult::Default
        });
        tk.dispatch_event(tree, &NativeEvent::ExecuteLeaf(4));
        assert_eq!(*hit.borrow(), Some(CallbackArgs::Node(4)));
    }

    #[test]
    fn test_rename_event() {
        let (mut tk, tree) = populated();
        tk.dispatch_event(
            tree,
            &NativeEvent::Rename {
                node: 4,
                title: "renamed".to_string(),
            },
        );
        assert_eq!(tk.get_attribute(tree, "TITLE4").as_deref(), Some("renamed"));

        tk.set_callback(tree, "RENAME_CB", |_, _, _| CallbackResult::Ignore);
        tk.dispatch_event(
            tree,
            &NativeEvent::Rename {
                node: 4,
                title: "refused".to_string(),
            },
        );
        assert_eq!(tk.get_attribute(tree, "TITLE4").as_deref(), Some("renamed"));
    }

    #[test]
    fn test_rename_attribute_calls_back() {
        let (mut tk, tree) = populated();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        tk.set_callback(tree, "RENAMENODE_CB", move |_, _, args| {
            log.borrow_mut().push(args.clone());
            CallbackResult::Default
        });
        let shown = Rc::new(RefCell::new(Vec::new()));
        let show_log = Rc::clone(&shown);
        tk.set_callback(tree, "SHOWRENAME_CB", move |_, _, args| {
            show_log.borrow_mut().push(args.clone());
            CallbackResult::Default
        });

        tk.set_attribute(tree, "VALUE", Some("2"));
        tk.set_attribute(tree, "RENAME", Some("YES"));
        assert_eq!(
            *seen.borrow(),
            vec![CallbackArgs::Rename {
                node: 2,
                title: "a.txt".to_string()
            }]
        );

        tk.set_attribute(tree, "SHOWRENAME", Some("YES"));
        tk.dispatch_event(tree, &NativeEvent::Key(keys::K_F2));
        assert_eq!(*shown.borrow(), vec![CallbackArgs::Node(2)]);
    }

    #[test]
    fn test_drag_drop_moves_by_default() {
        let (mut tk, tree) = populated();
        let result = tk.dispatch_event(
            tree,
            &NativeEvent::DragDrop {
                drag: 4,
                drop: 2,
                shift: false,
                control: false,
            },
        );
        assert_eq!(result, CallbackResult::Continue);
        assert_eq!(titles(&tk, tree), vec!["root", "docs", "a.txt", "notes.txt", "b.txt"]);

        tk.set_callback(tree, "DRAGDROP_CB", |_, _, _| CallbackResult::Default);
        tk.dispatch_event(
            tree,
            &NativeEvent::DragDrop {
                drag: 3,
                drop: 4,
                shift: true,
                control: false,
            },
        );
        assert_eq!(tk.get_attribute(tree, "TITLE3").as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_keys_move_focus() {
        let (mut tk, tree) = populated();
        tk.dispatch_event(tree, &NativeEvent::Key(keys::K_END));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("4"));
        assert_eq!(tk.get_attribute(tree, "MARKED0").as_deref(), Some("NO"));

        tk.dispatch_event(tree, &NativeEvent::Key(keys::K_UP | keys::CTRL_MASK));
        assert_eq!(tk.get_attribute(tree, "VALUE").as_deref(), Some("3"));
        assert_eq!(tk.get_attribute(tree, "MARKED4").as_deref(), Some("YES"));

        tk.dispatch_event(tree, &NativeEvent::Key(keys::K_HOME | keys::SHIFT_MASK));
        let marked: Vec<String> = (0..5)
            .map(|id| tk.get_attribute_id(tree, "MARKED", id).unwrap())
            .collect();
        assert_eq!(marked, vec!["YES", "YES", "YES", "YES", "NO"]);

        // other keys reach K_ANY
        let seen = Rc::new(RefCell::new(None));
        let log = Rc::clone(&seen);
        tk.set_callback(tree, "K_ANY", move |_, _, args| {
            *log.borrow_mut() = Some(args.clone());
            CallbackResult::Default
        });
        tk.dispatch_event(tree, &NativeEvent::Key('x' as i32));
        assert_eq!(*seen.borrow(), Some(CallbackArgs::Key('x' as i32)));
    }

    #[test]
    fn test_destroy_from_selection_callback() {
        let (mut tk, tree) = populated();
        let native = tk.native(tree).unwrap();
        tk.set_callback(tree, "SELECTION_CB", |tk, h, _| {
            tk.destroy(h);
            CallbackResult::Default
        });

        tk.dispatch_native_event(native, NativeEvent::Selection { node: 3, selected: true });
        assert!(!tk.is_alive(tree));
        assert_eq!(
            tk.dispatch_native_event(native, NativeEvent::Selection { node: 1, selected: true }),
            CallbackResult::Default
        );
    }
}
