//! Tree node model.
//!
//! Nodes live in one flat vector in pre-order; a node's id is its index. A
//! node's subtree is the run of following nodes that are deeper than it, so
//! every bulk operation is a slice operation or a forward scan. Nothing here
//! recurses.
//!
//! The focus node and the other remembered positions are plain indices and
//! are shifted by every insertion and removal.

use crate::types::Rgb;

/// Rows skipped by PGUP / PGDN.
pub const PAGE_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Branch,
    Leaf,
}

impl NodeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "BRANCH",
            Self::Leaf => "LEAF",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub title: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub expanded: bool,
    pub marked: bool,
    pub color: Option<Rgb>,
    pub userdata: Option<String>,
    pub font: Option<String>,
    pub image: Option<String>,
    pub image_expanded: Option<String>,
}

impl TreeNode {
    pub fn new(kind: NodeKind, title: &str, depth: usize) -> Self {
        Self {
            title: title.to_string(),
            kind,
            depth,
            expanded: false,
            marked: false,
            color: None,
            userdata: None,
            font: None,
            image: None,
            image_expanded: None,
        }
    }

    pub fn is_branch(&self) -> bool {
        self.kind == NodeKind::Branch
    }
}

/// Where a new node goes relative to its reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First child of a branch; next sibling of a leaf.
    Add,
    /// Always the next sibling.
    Insert,
}

/// Node list of one tree control.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeState {
    nodes: Vec<TreeNode>,
    pub focus: Option<usize>,
    pub mark_start: Option<usize>,
    pub last_added: Option<usize>,
    /// Node reported as selected by the last selection event.
    pub old_value: Option<usize>,
    pub indentation: i32,
    pub multiple: bool,
}

impl Default for TreeState {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            focus: None,
            mark_start: None,
            last_added: None,
            old_value: None,
            indentation: 20,
            multiple: false,
        }
    }
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: usize) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    /// Convert a caller id, rejecting anything that is not a node.
    pub fn check(&self, id: i32) -> Option<usize> {
        usize::try_from(id).ok().filter(|&i| i < self.nodes.len())
    }

    /// One past the last node of `id`'s subtree.
    pub fn subtree_end(&self, id: usize) -> usize {
        let depth = self.nodes[id].depth;
        self.nodes[id + 1..]
            .iter()
            .position(|n| n.depth <= depth)
            .map_or(self.nodes.len(), |offset| id + 1 + offset)
    }

    pub fn parent(&self, id: usize) -> Option<usize> {
        let depth = self.nodes.get(id)?.depth;
        self.nodes[..id].iter().rposition(|n| n.depth < depth)
    }

    pub fn children(&self, id: usize) -> Vec<usize> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let depth = node.depth + 1;
        (id + 1..self.subtree_end(id))
            .filter(|&i| self.nodes[i].depth == depth)
            .collect()
    }

    /// Whether `id` lies in the subtree of `ancestor` (itself included).
    pub fn in_subtree(&self, ancestor: usize, id: usize) -> bool {
        id >= ancestor && id < self.subtree_end(ancestor)
    }

    pub fn marked(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.marked)
            .map(|(i, _)| i)
            .collect()
    }

    // =========================================================================
    // Visible Nodes
    // =========================================================================

    /// Nodes not hidden inside a collapsed branch, in display order.
    pub fn visible_nodes(&self) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut i = 0;
        while i < self.nodes.len() {
            visible.push(i);
            let node = &self.nodes[i];
            i = if node.is_branch() && !node.expanded {
                self.subtree_end(i)
            } else {
                i + 1
            };
        }
        visible
    }

    /// Display row of `id`. A hidden node counts as the last row.
    pub fn visible_index(&self, id: usize) -> i32 {
        let visible = self.visible_nodes();
        match visible.iter().position(|&v| v == id) {
            Some(row) => row as i32,
            None => visible.len() as i32 - 1,
        }
    }

    /// Node shown at `row`. Negative rows give the first node; rows past the
    /// end give `None`.
    pub fn visible_at(&self, row: i32) -> Option<usize> {
        let visible = self.visible_nodes();
        let row = usize::try_from(row.max(0)).ok()?;
        visible.get(row).copied()
    }

    pub fn last_visible(&self) -> Option<usize> {
        self.visible_nodes().last().copied()
    }

    /// Row offset from `id`, clamped to the first and last rows.
    pub fn visible_offset(&self, id: usize, delta: i32) -> Option<usize> {
        let row = self.visible_index(id) + delta;
        self.visible_at(row.max(0)).or_else(|| self.last_visible())
    }

    pub fn next_visible(&self, id: usize) -> Option<usize> {
        self.visible_offset(id, 1)
    }

    pub fn previous_visible(&self, id: usize) -> Option<usize> {
        self.visible_offset(id, -1)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Start over with a single expanded root branch holding the focus.
    pub fn add_root(&mut self) {
        let mut root = TreeNode::new(NodeKind::Branch, "", 0);
        root.expanded = true;
        root.marked = true;
        self.nodes = vec![root];
        self.focus = Some(0);
        self.mark_start = Some(0);
        self.last_added = None;
        self.old_value = Some(0);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.focus = None;
        self.mark_start = None;
        self.last_added = None;
        self.old_value = None;
    }

    /// Add a node next to `reference`. Returns the new id.
    ///
    /// The root stays the only top-level node: siblings of the root are
    /// refused.
    pub fn add_node(
        &mut self,
        reference: usize,
        kind: NodeKind,
        title: &str,
        placement: Placement,
        expanded: bool,
    ) -> Option<usize> {
        let parent_node = self.nodes.get(reference)?;
        let (position, depth) = if parent_node.is_branch() && placement == Placement::Add {
            (reference + 1, parent_node.depth + 1)
        } else {
            if parent_node.depth == 0 {
                return None;
            }
            (self.subtree_end(reference), parent_node.depth)
        };

        let mut node = TreeNode::new(kind, title, depth);
        node.expanded = kind == NodeKind::Branch && expanded;
        self.nodes.insert(position, node);
        self.shift_inserted(position, 1);
        self.nodes[0].expanded = true;
        self.last_added = Some(position);
        Some(position)
    }

    /// Remove a node with its subtree. The root cannot be removed.
    pub fn remove_node(&mut self, id: usize) -> bool {
        if id == 0 || id >= self.nodes.len() {
            return false;
        }
        let end = self.subtree_end(id);
        self.remove_range(id, end);
        true
    }

    /// Remove everything below `id`, keeping `id`.
    pub fn remove_children(&mut self, id: usize) -> bool {
        if id >= self.nodes.len() {
            return false;
        }
        let end = self.subtree_end(id);
        if end > id + 1 {
            self.remove_range(id + 1, end);
        }
        true
    }

    /// Remove every marked node except the root. Returns how many removals
    /// took place.
    pub fn remove_marked(&mut self) -> usize {
        let mut removed = 0;
        // back to front so earlier ids stay valid
        for id in self.marked().into_iter().rev() {
            if id != 0 && id < self.nodes.len() && self.nodes[id].marked {
                self.remove_node(id);
                removed += 1;
            }
        }
        removed
    }

    /// Move `src` with its subtree after `dst`: first child of an expanded
    /// branch, otherwise next sibling. Refused when `dst` is inside `src`.
    pub fn move_node(&mut self, src: usize, dst: usize) -> Option<usize> {
        if src >= self.nodes.len() || dst >= self.nodes.len() || self.in_subtree(src, dst) {
            return None;
        }
        let dst_node = &self.nodes[dst];
        let into = dst_node.is_branch() && dst_node.expanded;
        if !into && dst_node.depth == 0 {
            return None;
        }

        let end = self.subtree_end(src);
        let len = end - src;
        let tracked = self.tracked();

        let mut moved: Vec<TreeNode> = self.nodes.drain(src..end).collect();
        let dst = if dst > src { dst - len } else { dst };

        let (position, depth) = if into {
            (dst + 1, self.nodes[dst].depth + 1)
        } else {
            (self.subtree_end(dst), self.nodes[dst].depth)
        };
        let base = moved[0].depth;
        for node in &mut moved {
            node.depth = node.depth - base + depth;
        }
        self.nodes.splice(position..position, moved);

        let remap = |i: usize| {
            if (src..end).contains(&i) {
                return position + (i - src);
            }
            let after_remove = if i >= end { i - len } else { i };
            if after_remove >= position {
                after_remove + len
            } else {
                after_remove
            }
        };
        self.restore(tracked, remap);
        Some(position)
    }

    /// Expand or collapse every branch. The root always stays expanded.
    pub fn set_all_expanded(&mut self, expanded: bool) {
        for node in self.nodes.iter_mut().filter(|n| n.is_branch()) {
            node.expanded = expanded;
        }
        if let Some(root) = self.nodes.first_mut() {
            root.expanded = true;
        }
    }

    pub fn set_all_marked(&mut self, marked: bool) {
        for node in &mut self.nodes {
            node.marked = marked;
        }
    }

    pub fn invert_all_marks(&mut self) {
        for node in &mut self.nodes {
            node.marked = !node.marked;
        }
    }

    /// Mark every node between `a` and `b` in pre-order, both included.
    pub fn mark_range(&mut self, a: usize, b: usize, clear_outside: bool) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if (low..=high).contains(&i) {
                node.marked = true;
            } else if clear_outside {
                node.marked = false;
            }
        }
    }

    /// Make `id` the only marked node.
    pub fn mark_single(&mut self, id: usize) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.marked = i == id;
        }
    }

    // =========================================================================
    // Tracked Positions
    // =========================================================================

    fn tracked(&self) -> [Option<usize>; 4] {
        [self.focus, self.mark_start, self.last_added, self.old_value]
    }

    fn restore(&mut self, tracked: [Option<usize>; 4], remap: impl Fn(usize) -> usize) {
        let [focus, mark_start, last_added, old_value] = tracked.map(|i| i.map(&remap));
        self.focus = focus;
        self.mark_start = mark_start;
        self.last_added = last_added;
        self.old_value = old_value;
    }

    fn shift_inserted(&mut self, position: usize, count: usize) {
        let tracked = self.tracked();
        self.restore(tracked, |i| if i >= position { i + count } else { i });
    }

    /// Drop `start..end`. A focus inside the range moves to the node just
    /// before it; other positions inside it are forgotten.
    fn remove_range(&mut self, start: usize, end: usize) {
        let len = end - start;
        self.nodes.drain(start..end);

        let shift = |i: Option<usize>| -> Option<usize> {
            let i = i?;
            if i >= end {
                Some(i - len)
            } else if i >= start {
                None
            } else {
                Some(i)
            }
        };
        let focus_removed = self.focus.is_some_and(|f| (start..end).contains(&f));
        self.focus = if focus_removed {
            start.checked_sub(1)
        } else {
            shift(self.focus)
        };
        self.mark_start = shift(self.mark_start);
        self.last_added = shift(self.last_added);
        self.old_value = shift(self.old_value);
    }
}
