use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::warn;

use crate::common::collections::HashMap;
use crate::layout_engine::Orientation;
use crate::layout_engine::utils::clamp_ratio;
use crate::model::{WindowId, WorkspaceId};
use crate::sys::geometry::{Point, Rect};

slotmap::new_key_type! { pub struct NodeId; }

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum NodeKind {
    Split {
        children: [NodeId; 2],
        orientation: Orientation,
        /// Share of the primary axis given to `children[0]`; 1.0 is an even split.
        ratio: f32,
    },
    Leaf {
        window: WindowId,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Node {
    pub rect: Rect,
    pub parent: Option<NodeId>,
    pub workspace: WorkspaceId,
    pub kind: NodeKind,
    /// Cleared while a batch removal is in progress.
    pub valid: bool,
}

impl Node {
    pub fn window(&self) -> Option<WindowId> {
        match self.kind {
            NodeKind::Leaf { window } => Some(window),
            NodeKind::Split { .. } => None,
        }
    }

    pub fn children(&self) -> Option<[NodeId; 2]> {
        match self.kind {
            NodeKind::Split { children, .. } => Some(children),
            NodeKind::Leaf { .. } => None,
        }
    }
}

/// Arena of per-workspace binary trees. Leaves own exactly one tiled window; every
/// split owns exactly two children whose boxes partition its own.
#[derive(Default, Serialize, Deserialize, Debug)]
pub struct BinaryTree {
    nodes: SlotMap<NodeId, Node>,
    roots: HashMap<WorkspaceId, NodeId>,
    window_to_node: HashMap<WindowId, NodeId>,
}

impl BinaryTree {
    pub fn get(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> { self.nodes.get_mut(id) }

    pub fn root(&self, ws: WorkspaceId) -> Option<NodeId> { self.roots.get(&ws).copied() }

    pub fn node_of(&self, window: WindowId) -> Option<NodeId> {
        self.window_to_node.get(&window).copied()
    }

    pub fn contains_window(&self, window: WindowId) -> bool {
        self.window_to_node.contains_key(&window)
    }

    pub fn workspaces(&self) -> Vec<WorkspaceId> { self.roots.keys().copied().collect() }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.nodes.get(id)?.parent }

    /// The other child of `id`'s parent, and whether `id` is the first child.
    pub fn sibling(&self, id: NodeId) -> Option<(NodeId, bool)> {
        let children = self.nodes.get(self.parent(id)?)?.children()?;
        if children[0] == id {
            Some((children[1], true))
        } else {
            Some((children[0], false))
        }
    }

    pub fn is_first_child(&self, id: NodeId) -> bool {
        self.sibling(id).is_some_and(|(_, first)| first)
    }

    pub fn make_root_leaf(&mut self, ws: WorkspaceId, window: WindowId, rect: Rect) -> NodeId {
        let id = self.nodes.insert(Node {
            rect,
            parent: None,
            workspace: ws,
            kind: NodeKind::Leaf { window },
            valid: true,
        });
        self.roots.insert(ws, id);
        self.window_to_node.insert(window, id);
        id
    }

    /// Replaces `leaf` with a split holding `leaf` and a new leaf for `window`. The split
    /// inherits the leaf's box and parent slot. Returns the new leaf.
    pub fn split_leaf(
        &mut self,
        leaf: NodeId,
        window: WindowId,
        orientation: Orientation,
        new_first: bool,
        ratio: f32,
    ) -> Option<NodeId> {
        let target = self.nodes.get(leaf)?;
        if target.window().is_none() {
            warn!(?leaf, "refusing to split a non-leaf node");
            return None;
        }
        let (rect, parent, workspace) = (target.rect, target.parent, target.workspace);

        let split = self.nodes.insert(Node {
            rect,
            parent,
            workspace,
            kind: NodeKind::Split {
                children: [leaf, leaf],
                orientation,
                ratio: clamp_ratio(ratio),
            },
            valid: true,
        });
        let new_leaf = self.nodes.insert(Node {
            rect,
            parent: Some(split),
            workspace,
            kind: NodeKind::Leaf { window },
            valid: true,
        });
        let pair = if new_first { [new_leaf, leaf] } else { [leaf, new_leaf] };
        if let Some(NodeKind::Split { children, .. }) = self.nodes.get_mut(split).map(|n| &mut n.kind)
        {
            *children = pair;
        }
        if let Some(n) = self.nodes.get_mut(leaf) {
            n.parent = Some(split);
        }
        self.replace_in_parent(parent, workspace, leaf, split);
        self.window_to_node.insert(window, new_leaf);
        self.relayout(split, None);
        Some(new_leaf)
    }

    /// Removes `leaf`, promoting its sibling into the parent's slot with the parent's box.
    /// Returns the promoted sibling, or `None` when the workspace tree became empty.
    pub fn remove_leaf(&mut self, leaf: NodeId) -> Option<NodeId> {
        let node = self.nodes.remove(leaf)?;
        if let Some(w) = node.window() {
            if self.window_to_node.get(&w) == Some(&leaf) {
                self.window_to_node.remove(&w);
            }
        }
        let Some(parent_id) = node.parent else {
            if self.roots.get(&node.workspace) == Some(&leaf) {
                self.roots.remove(&node.workspace);
            }
            return None;
        };
        let parent = self.nodes.remove(parent_id)?;
        let sibling = match parent.children() {
            Some([a, b]) if a == leaf => b,
            Some([a, _]) => a,
            None => {
                warn!(?parent_id, "leaf parent was not a split");
                return None;
            }
        };
        if let Some(s) = self.nodes.get_mut(sibling) {
            s.parent = parent.parent;
            s.rect = parent.rect;
        }
        self.replace_in_parent(parent.parent, parent.workspace, parent_id, sibling);
        Some(sibling)
    }

    fn replace_in_parent(
        &mut self,
        parent: Option<NodeId>,
        ws: WorkspaceId,
        old: NodeId,
        new: NodeId,
    ) {
        match parent {
            Some(p) => {
                if let Some(Node { kind: NodeKind::Split { children, .. }, .. }) =
                    self.nodes.get_mut(p)
                {
                    for c in children.iter_mut() {
                        if *c == old {
                            *c = new;
                        }
                    }
                }
            }
            None => {
                self.roots.insert(ws, new);
            }
        }
    }

    /// Recomputes every descendant box of `node` from its own box. With `auto_axis`,
    /// each split re-derives its axis from its box shape using that width multiplier.
    pub fn relayout(&mut self, node: NodeId, auto_axis: Option<f64>) {
        let Some(n) = self.nodes.get_mut(node) else {
            return;
        };
        let rect = n.rect;
        let NodeKind::Split { children, orientation, ratio } = &mut n.kind else {
            return;
        };
        if let Some(mult) = auto_axis {
            *orientation = if rect.size.width * mult > rect.size.height {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
        }
        let (first, second) = split_rect(rect, *orientation, *ratio);
        let children = *children;
        for (child, r) in children.into_iter().zip([first, second]) {
            if let Some(c) = self.nodes.get_mut(child) {
                c.rect = r;
            }
            self.relayout(child, auto_axis);
        }
    }

    pub fn ratio(&self, split: NodeId) -> Option<f32> {
        match self.nodes.get(split)?.kind {
            NodeKind::Split { ratio, .. } => Some(ratio),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn set_ratio(&mut self, split: NodeId, value: f32) {
        if let Some(Node { kind: NodeKind::Split { ratio, .. }, .. }) = self.nodes.get_mut(split) {
            *ratio = clamp_ratio(value);
        }
    }

    pub fn orientation(&self, split: NodeId) -> Option<Orientation> {
        match self.nodes.get(split)?.kind {
            NodeKind::Split { orientation, .. } => Some(orientation),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn flip_orientation(&mut self, split: NodeId) {
        if let Some(Node { kind: NodeKind::Split { orientation, .. }, .. }) =
            self.nodes.get_mut(split)
        {
            *orientation = orientation.flip();
        }
    }

    /// Every node of `ws`, parents before children.
    pub fn nodes_on(&self, ws: WorkspaceId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.root(ws).into_iter().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some([a, b]) = self.nodes.get(id).and_then(Node::children) {
                stack.push(b);
                stack.push(a);
            }
        }
        out
    }

    /// Nearest ancestor of `node` splitting along `orientation`, and whether the path
    /// to it enters through the first child.
    pub fn find_parent_split(
        &self,
        node: NodeId,
        orientation: Orientation,
    ) -> Option<(NodeId, bool)> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if self.orientation(parent) == Some(orientation) {
                let is_first = self.is_first_child(current);
                return Some((parent, is_first));
            }
            current = parent;
        }
        None
    }

    /// Exchanges the positions of two disjoint subtrees.
    pub fn swap_subtrees(&mut self, a: NodeId, b: NodeId) -> bool {
        let (Some(pa), Some(pb)) = (self.parent(a), self.parent(b)) else {
            return false;
        };
        if pa == pb {
            if let Some(Node { kind: NodeKind::Split { children, .. }, .. }) =
                self.nodes.get_mut(pa)
            {
                children.swap(0, 1);
            }
            return true;
        }
        let Some(ws) = self.nodes.get(a).map(|n| n.workspace) else {
            return false;
        };
        self.replace_in_parent(Some(pa), ws, a, b);
        self.replace_in_parent(Some(pb), ws, b, a);
        if let Some(n) = self.nodes.get_mut(a) {
            n.parent = Some(pb);
        }
        if let Some(n) = self.nodes.get_mut(b) {
            n.parent = Some(pa);
        }
        true
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.rect = rect;
        }
    }

    /// Leaf nodes under `node` in left-to-right order.
    pub fn leaves_under(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            match self.nodes.get(id).map(|n| &n.kind) {
                Some(NodeKind::Leaf { .. }) => out.push(id),
                Some(NodeKind::Split { children, .. }) => {
                    stack.push(children[1]);
                    stack.push(children[0]);
                }
                None => {}
            }
        }
        out
    }

    pub fn windows_on(&self, ws: WorkspaceId) -> Vec<WindowId> {
        self.root(ws)
            .map(|r| self.leaves_under(r))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.nodes.get(id).and_then(Node::window))
            .collect()
    }

    pub fn first_leaf(&self, ws: WorkspaceId) -> Option<NodeId> {
        self.root(ws).and_then(|r| self.leaves_under(r).into_iter().next())
    }

    pub fn leaf_at(&self, ws: WorkspaceId, point: Point) -> Option<NodeId> {
        let root = self.root(ws)?;
        self.leaves_under(root)
            .into_iter()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.rect.contains(point)))
    }

    pub fn closest_leaf(&self, ws: WorkspaceId, point: Point) -> Option<NodeId> {
        let root = self.root(ws)?;
        self.leaves_under(root)
            .into_iter()
            .filter_map(|id| self.nodes.get(id).map(|n| (id, n.rect.distance_to(point))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Points `node` at `window` instead of its current window.
    pub fn set_window(&mut self, node: NodeId, window: WindowId) -> Option<WindowId> {
        let n = self.nodes.get_mut(node)?;
        let NodeKind::Leaf { window: current } = &mut n.kind else {
            return None;
        };
        let old = std::mem::replace(current, window);
        if self.window_to_node.get(&old) == Some(&node) {
            self.window_to_node.remove(&old);
        }
        self.window_to_node.insert(window, node);
        Some(old)
    }

    pub fn swap_windows(&mut self, a: NodeId, b: NodeId) -> bool {
        let (Some(wa), Some(wb)) = (
            self.nodes.get(a).and_then(Node::window),
            self.nodes.get(b).and_then(Node::window),
        ) else {
            return false;
        };
        if let Some(NodeKind::Leaf { window }) = self.nodes.get_mut(a).map(|n| &mut n.kind) {
            *window = wb;
        }
        if let Some(NodeKind::Leaf { window }) = self.nodes.get_mut(b).map(|n| &mut n.kind) {
            *window = wa;
        }
        self.window_to_node.insert(wa, b);
        self.window_to_node.insert(wb, a);
        true
    }

    /// Swaps the two children of a split, keeping the ratio attached to the same box side.
    pub fn swap_children(&mut self, split: NodeId) {
        if let Some(Node { kind: NodeKind::Split { children, ratio, .. }, .. }) =
            self.nodes.get_mut(split)
        {
            children.swap(0, 1);
            *ratio = clamp_ratio(2.0 - *ratio);
        }
        self.relayout(split, None);
    }

    /// Drops every node of `ws` in one pass and returns the windows that were tiled there.
    pub fn remove_workspace(&mut self, ws: WorkspaceId) -> Vec<WindowId> {
        let windows = self.windows_on(ws);
        for (_, n) in self.nodes.iter_mut() {
            if n.workspace == ws {
                n.valid = false;
            }
        }
        self.nodes.retain(|_, n| n.valid);
        self.roots.remove(&ws);
        for w in &windows {
            self.window_to_node.remove(w);
        }
        windows
    }

    /// Every split has two children linking back to it, every leaf is indexed by its
    /// window, and split children partition the split's box.
    pub fn is_well_formed(&self, ws: WorkspaceId) -> bool {
        let Some(root) = self.root(ws) else {
            return true;
        };
        if self.parent(root).is_some() {
            return false;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(n) = self.nodes.get(id) else {
                return false;
            };
            if n.workspace != ws || !n.valid {
                return false;
            }
            match n.kind {
                NodeKind::Leaf { window } => {
                    if self.window_to_node.get(&window) != Some(&id) {
                        return false;
                    }
                }
                NodeKind::Split { children, orientation, ratio } => {
                    if children[0] == children[1] {
                        return false;
                    }
                    let (first, second) = split_rect(n.rect, orientation, ratio);
                    for (child, expected) in children.into_iter().zip([first, second]) {
                        let Some(c) = self.nodes.get(child) else {
                            return false;
                        };
                        if c.parent != Some(id) || !c.rect.approx_eq(&expected, 1e-6) {
                            return false;
                        }
                        stack.push(child);
                    }
                }
            }
        }
        true
    }

    pub fn draw(&self, ws: WorkspaceId) -> String {
        let Some(root) = self.root(ws) else {
            return String::new();
        };
        let tree = self.ascii_node(root);
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            warn!(?ws, "failed to render layout tree");
        }
        out
    }

    fn ascii_node(&self, id: NodeId) -> ascii_tree::Tree {
        let Some(n) = self.nodes.get(id) else {
            return ascii_tree::Tree::Leaf(vec![format!("{id:?} <missing>")]);
        };
        let r = n.rect;
        let geometry = format!(
            "{}x{} @ {},{}",
            r.size.width, r.size.height, r.origin.x, r.origin.y
        );
        match n.kind {
            NodeKind::Leaf { window } => {
                ascii_tree::Tree::Leaf(vec![format!("{window:?} {geometry}")])
            }
            NodeKind::Split { children, orientation, ratio } => ascii_tree::Tree::Node(
                format!("{orientation:?} {ratio:.2} {geometry}"),
                children.iter().map(|&c| self.ascii_node(c)).collect(),
            ),
        }
    }
}

/// Divides `rect` along `orientation`; the first part gets `rect * ratio / 2`.
pub fn split_rect(rect: Rect, orientation: Orientation, ratio: f32) -> (Rect, Rect) {
    let fraction = f64::from(clamp_ratio(ratio)) / 2.0;
    match orientation {
        Orientation::Horizontal => {
            let first_w = rect.size.width * fraction;
            (
                Rect::new(rect.origin.x, rect.origin.y, first_w, rect.size.height),
                Rect::new(
                    rect.origin.x + first_w,
                    rect.origin.y,
                    rect.size.width - first_w,
                    rect.size.height,
                ),
            )
        }
        Orientation::Vertical => {
            let first_h = rect.size.height * fraction;
            (
                Rect::new(rect.origin.x, rect.origin.y, rect.size.width, first_h),
                Rect::new(
                    rect.origin.x,
                    rect.origin.y + first_h,
                    rect.size.width,
                    rect.size.height - first_h,
                ),
            )
        }
    }
}
