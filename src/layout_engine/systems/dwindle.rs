use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::config::{DwindleSettings, ForceSplit};
use crate::layout_engine::binary_tree::{BinaryTree, NodeId, split_rect};
use crate::layout_engine::systems::{
    LayoutSystem, apply_cell, exchange_membership, float_instead, focal_point, merge_into_group,
    over_constrained,
};
use crate::layout_engine::utils::{Edges, clamp_ratio};
use crate::layout_engine::{
    Direction, LayoutContext, LayoutError, LayoutMessage, Orientation, RatioChange, ResizeCorner,
};
use crate::model::{WindowId, WorkspaceId};
use crate::sys::geometry::{Point, Rect};

/// Recursive binary splitter. Each workspace owns one tree; a new window splits the
/// leaf it opens on, and removing a window promotes its sibling.
#[derive(Default, Serialize, Deserialize, Debug)]
pub struct DwindleLayout {
    tree: BinaryTree,
    /// Direction the next insertion splits toward. Consumed by that insertion.
    preselect: Option<Direction>,
}

fn axis_len(rect: Rect, orientation: Orientation) -> f64 {
    match orientation {
        Orientation::Horizontal => rect.size.width,
        Orientation::Vertical => rect.size.height,
    }
}

/// Picks the split axis and whether the new window takes the first half.
fn choose_split(
    settings: &DwindleSettings,
    target: Rect,
    cursor: Point,
    direction: Option<Direction>,
) -> (Orientation, bool) {
    if let Some(direction) = direction {
        return (direction.orientation(), direction.is_first());
    }
    if settings.smart_split {
        let delta = cursor.delta_from(target.mid());
        let proportions = target.size.height / target.size.width;
        let slope = delta.y / delta.x;
        return if slope.abs() < proportions {
            (Orientation::Horizontal, delta.x <= 0.0)
        } else {
            (Orientation::Vertical, delta.y <= 0.0)
        };
    }
    let orientation = if target.size.width * settings.split_width_multiplier > target.size.height
    {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };
    let new_first = match settings.force_split {
        ForceSplit::First => true,
        ForceSplit::Second => false,
        ForceSplit::Cursor => {
            let mid = target.mid();
            match orientation {
                Orientation::Horizontal => cursor.x < mid.x,
                Orientation::Vertical => cursor.y < mid.y,
            }
        }
    };
    (orientation, new_first)
}

impl DwindleLayout {
    fn auto_axis(settings: &DwindleSettings) -> Option<f64> {
        (!settings.preserve_split && !settings.smart_split).then_some(settings.split_width_multiplier)
    }

    /// Recomputes the boxes below `node` and hands them to the windows.
    fn recalc_node(&mut self, ctx: &mut LayoutContext<'_>, node: NodeId) {
        self.tree.relayout(node, Self::auto_axis(&ctx.settings.layout.dwindle));
        for leaf in self.tree.leaves_under(node) {
            let Some(n) = self.tree.get(leaf) else {
                continue;
            };
            if let Some(window) = n.window() {
                apply_cell(ctx, window, n.rect);
            }
        }
    }

    fn opening_target(
        &self,
        ctx: &LayoutContext<'_>,
        window: WindowId,
        ws: WorkspaceId,
        cursor: Point,
    ) -> Option<NodeId> {
        if ctx.settings.layout.dwindle.use_active_for_splits {
            let focused = ctx
                .input
                .focused
                .filter(|&f| f != window)
                .and_then(|f| {
                    self.tree
                        .node_of(f)
                        .or_else(|| ctx.windows.group_current(f).and_then(|c| self.tree.node_of(c)))
                })
                .filter(|&n| self.tree.get(n).is_some_and(|n| n.workspace == ws));
            if focused.is_some() {
                return focused;
            }
        }
        if let Some(node) = self.tree.leaf_at(ws, cursor) {
            return Some(node);
        }
        let on_reserved = ctx
            .monitors
            .monitor_for_workspace(ws)
            .is_some_and(|(_, m)| m.frame.contains(cursor) && !m.working_area().contains(cursor));
        if on_reserved {
            if let Some(node) = self.tree.closest_leaf(ws, cursor) {
                return Some(node);
            }
        }
        self.tree.first_leaf(ws)
    }

    /// Splits `target` and places `window` in the new half, unless the half violates the
    /// window's size limits.
    fn split_into(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        target: NodeId,
        orientation: Orientation,
        new_first: bool,
    ) {
        let Some(target_rect) = self.tree.get(target).map(|n| n.rect) else {
            return;
        };
        let ratio = clamp_ratio(ctx.settings.layout.dwindle.default_split_ratio);
        let (first, second) = split_rect(target_rect, orientation, ratio);
        let predicted = if new_first { first } else { second };
        if ctx.windows.get(window).is_some_and(|w| over_constrained(w, predicted.size)) {
            float_instead(ctx, window);
            return;
        }
        if self.tree.split_leaf(target, window, orientation, new_first, ratio).is_none() {
            return;
        }
        if let Some(split) = self.tree.parent(target) {
            self.recalc_node(ctx, split);
        }
    }

    fn split_of(&self, window: Option<WindowId>) -> Option<NodeId> {
        let node = self.tree.node_of(window?)?;
        self.tree.parent(node)
    }

    /// Walks the ancestors of the resized leaf and adjusts the split that owns the dragged
    /// edge, then the next same-axis split so the far sibling keeps its size.
    fn smart_resize(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        node: NodeId,
        delta: Point,
        corner: ResizeCorner,
        edges: Edges,
    ) {
        let none = corner == ResizeCorner::None;
        let left = corner.affects_left() || edges.contains(Edges::RIGHT);
        let top = corner.affects_top() || edges.contains(Edges::BOTTOM);
        let right = (!none && !corner.affects_left()) || edges.contains(Edges::LEFT);
        let bottom = (!none && !corner.affects_top()) || edges.contains(Edges::TOP);

        let (mut v_outer, mut v_inner) = (None, None);
        let (mut h_outer, mut h_inner) = (None, None);
        let mut current = node;
        while let Some(parent) = self.tree.parent(current) {
            let Some(orientation) = self.tree.orientation(parent) else {
                break;
            };
            let second = !self.tree.is_first_child(current);
            let vertical = orientation == Orientation::Vertical;
            if v_outer.is_none() && vertical && (none || (top && second) || (bottom && !second)) {
                v_outer = Some(current);
            } else if v_outer.is_none() && v_inner.is_none() && vertical {
                v_inner = Some(current);
            } else if h_outer.is_none()
                && !vertical
                && (none || (left && second) || (right && !second))
            {
                h_outer = Some(current);
            } else if h_outer.is_none() && h_inner.is_none() && !vertical {
                h_inner = Some(current);
            }
            if v_outer.is_some() && h_outer.is_some() {
                break;
            }
            current = parent;
        }

        if let Some(outer) = h_outer {
            if delta.x != 0.0 {
                self.resize_pair(ctx, outer, h_inner, delta.x, Orientation::Horizontal);
            }
        }
        if let Some(outer) = v_outer {
            if delta.y != 0.0 {
                self.resize_pair(ctx, outer, v_inner, delta.y, Orientation::Vertical);
            }
        }
    }

    fn resize_pair(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        outer: NodeId,
        inner: Option<NodeId>,
        delta: f64,
        orientation: Orientation,
    ) {
        let Some(outer_parent) = self.tree.parent(outer) else {
            return;
        };
        let (Some(parent_rect), Some(ratio)) =
            (self.tree.get(outer_parent).map(|n| n.rect), self.tree.ratio(outer_parent))
        else {
            return;
        };
        let parent_len = axis_len(parent_rect, orientation);
        if parent_len <= 0.0 {
            return;
        }
        self.tree.set_ratio(outer_parent, ratio + (delta * 2.0 / parent_len) as f32);

        let Some(inner) = inner else {
            self.recalc_node(ctx, outer_parent);
            return;
        };
        let Some(original) = self.tree.get(inner).map(|n| axis_len(n.rect, orientation)) else {
            return;
        };
        self.recalc_node(ctx, outer_parent);
        let Some(inner_parent) = self.tree.parent(inner) else {
            return;
        };
        let Some(inner_len) = self.tree.get(inner_parent).map(|n| axis_len(n.rect, orientation))
        else {
            return;
        };
        if inner_len <= 0.0 {
            return;
        }
        let new_ratio = if self.tree.is_first_child(inner) {
            (original - delta) / inner_len * 2.0
        } else {
            2.0 - (original + delta) / inner_len * 2.0
        };
        self.tree.set_ratio(inner_parent, new_ratio as f32);
        self.recalc_node(ctx, inner_parent);
    }

    /// Adjusts the nearest split on each axis independently.
    fn axis_resize(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        node: NodeId,
        delta: Point,
        corner: ResizeCorner,
    ) {
        let axes = [
            (Orientation::Horizontal, delta.x, corner.affects_left()),
            (Orientation::Vertical, delta.y, corner.affects_top()),
        ];
        let mut touched = Vec::new();
        for (orientation, delta, affects_first_edge) in axes {
            if delta.abs() < 0.001 {
                continue;
            }
            let Some((split, is_first_child)) = self.tree.find_parent_split(node, orientation)
            else {
                continue;
            };
            let (Some(rect), Some(ratio)) =
                (self.tree.get(split).map(|n| n.rect), self.tree.ratio(split))
            else {
                continue;
            };
            let len = axis_len(rect, orientation);
            if len <= 0.0 {
                continue;
            }
            let ratio_delta = (delta * 2.0 / len) as f32;
            let increase_ratio = if affects_first_edge { !is_first_child } else { is_first_child };
            if increase_ratio {
                self.tree.set_ratio(split, ratio + ratio_delta);
            } else {
                self.tree.set_ratio(split, ratio - ratio_delta);
            }
            touched.push(split);
        }
        for split in touched {
            self.recalc_node(ctx, split);
        }
    }

    fn move_to_root(&mut self, ctx: &mut LayoutContext<'_>, window: Option<WindowId>, stable: bool) {
        let Some(leaf) = window.and_then(|w| self.tree.node_of(w)) else {
            return;
        };
        let Some(ws) = self.tree.get(leaf).map(|n| n.workspace) else {
            return;
        };
        let Some(root) = self.tree.root(ws) else {
            return;
        };
        if root == leaf {
            return;
        }
        let mut ancestor = leaf;
        while let Some(parent) = self.tree.parent(ancestor) {
            if parent == root {
                break;
            }
            ancestor = parent;
        }
        if ancestor != leaf {
            let Some((other, _)) = self.tree.sibling(ancestor) else {
                return;
            };
            self.tree.swap_subtrees(leaf, other);
        }
        if !stable && !self.tree.is_first_child(leaf) {
            if let Some((other, _)) = self.tree.sibling(leaf) {
                self.tree.swap_subtrees(leaf, other);
            }
        }
        self.recalc_node(ctx, root);
    }
}

impl LayoutSystem for DwindleLayout {
    fn name(&self) -> &'static str { "dwindle" }

    fn on_window_created_tiling(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Option<Direction>,
    ) {
        let Some(ws) = ctx.workspace_of(window) else {
            warn!(?window, "cannot tile an unknown window");
            return;
        };
        if self.tree.contains_window(window) {
            debug!(?window, "window already has a layout node");
            return;
        }
        let Some(area) = ctx.working_area(ws) else {
            return;
        };
        let cursor = ctx.input.cursor;

        let Some(opening) = self.opening_target(ctx, window, ws, cursor) else {
            let node = self.tree.make_root_leaf(ws, window, area);
            self.recalc_node(ctx, node);
            return;
        };
        let Some((target_rect, opening_window)) =
            self.tree.get(opening).and_then(|n| Some((n.rect, n.window()?)))
        else {
            return;
        };

        if merge_into_group(ctx, window, opening_window) {
            self.tree.set_window(opening, window);
            self.recalc_node(ctx, opening);
            return;
        }

        let direction = direction.or(self.preselect.take());
        let (orientation, new_first) =
            choose_split(&ctx.settings.layout.dwindle, target_rect, cursor, direction);
        self.split_into(ctx, window, opening, orientation, new_first);
    }

    fn on_window_removed_tiling(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        let Some(node) = self.tree.node_of(window) else {
            warn!(?window, "no layout node for removed window");
            return;
        };
        if let Some(promoted) = self.tree.remove_leaf(node) {
            self.recalc_node(ctx, promoted);
        }
    }

    fn is_window_tiled(&self, window: WindowId) -> bool { self.tree.contains_window(window) }

    fn tiled_windows(&self, ws: WorkspaceId) -> Vec<WindowId> { self.tree.windows_on(ws) }

    fn recalculate_workspace(&mut self, ctx: &mut LayoutContext<'_>, ws: WorkspaceId) {
        let Some(root) = self.tree.root(ws) else {
            return;
        };
        let Some(area) = ctx.working_area(ws) else {
            return;
        };
        self.tree.set_rect(root, area);
        self.recalc_node(ctx, root);
    }

    fn recalculate_window(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        let Some(node) = self.tree.node_of(window) else {
            warn!(?window, "no layout node to recalculate");
            return;
        };
        self.recalc_node(ctx, node);
    }

    fn resize_active_window(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        delta: Point,
        corner: ResizeCorner,
    ) {
        let Some(node) = self.tree.node_of(window) else {
            warn!(?window, "no layout node to resize");
            return;
        };
        let Some((rect, ws)) = self.tree.get(node).map(|n| (n.rect, n.workspace)) else {
            return;
        };
        let Some(area) = ctx.working_area(ws) else {
            return;
        };
        let edges = Edges::touching(rect, area);
        let mut delta = delta;
        if edges.contains(Edges::LEFT | Edges::RIGHT) {
            delta.x = 0.0;
        }
        if edges.contains(Edges::TOP | Edges::BOTTOM) {
            delta.y = 0.0;
        }
        if ctx.settings.layout.dwindle.smart_resizing {
            self.smart_resize(ctx, node, delta, corner, edges);
        } else {
            self.axis_resize(ctx, node, delta, corner);
        }
    }

    fn alter_split_ratio(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        change: RatioChange,
    ) {
        let Some(split) = self.split_of(Some(window)) else {
            debug!(?window, "window has no parent split");
            return;
        };
        let Some(ratio) = self.tree.ratio(split) else {
            return;
        };
        self.tree.set_ratio(split, change.apply(ratio));
        self.recalc_node(ctx, split);
    }

    fn layout_message(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: Option<WindowId>,
        message: LayoutMessage,
    ) -> Result<Option<WindowId>, LayoutError> {
        match message {
            LayoutMessage::Preselect(direction) => self.preselect = Some(direction),
            LayoutMessage::ToggleSplit => {
                if let Some(split) = self.split_of(window) {
                    self.tree.flip_orientation(split);
                    self.recalc_node(ctx, split);
                }
            }
            LayoutMessage::SwapSplit => {
                if let Some(split) = self.split_of(window) {
                    self.tree.swap_children(split);
                    self.recalc_node(ctx, split);
                }
            }
            LayoutMessage::MoveToRoot { stable } => self.move_to_root(ctx, window, stable),
            other => {
                return Err(LayoutError::UnsupportedMessage {
                    layout: self.name(),
                    message: format!("{other:?}"),
                });
            }
        }
        Ok(None)
    }

    fn switch_windows(&mut self, ctx: &mut LayoutContext<'_>, a: WindowId, b: WindowId) {
        if a == b {
            return;
        }
        let (Some(na), Some(nb)) = (self.tree.node_of(a), self.tree.node_of(b)) else {
            warn!(?a, ?b, "cannot switch windows without layout nodes");
            return;
        };
        let (Some(ws_a), Some(ws_b)) = (
            self.tree.get(na).map(|n| n.workspace),
            self.tree.get(nb).map(|n| n.workspace),
        ) else {
            return;
        };
        exchange_membership(ctx, a, b);
        self.tree.swap_windows(na, nb);
        if ws_a == ws_b {
            self.recalc_node(ctx, na);
            self.recalc_node(ctx, nb);
        } else {
            self.recalculate_workspace(ctx, ws_a);
            self.recalculate_workspace(ctx, ws_b);
        }
    }

    fn move_window_to(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Direction,
    ) {
        let Some(node) = self.tree.node_of(window) else {
            warn!(?window, "no layout node to move");
            return;
        };
        let Some((rect, ws)) = self.tree.get(node).map(|n| (n.rect, n.workspace)) else {
            return;
        };
        let Some(target) = self.tree.leaf_at(ws, focal_point(rect, direction)) else {
            debug!(?window, ?direction, "no neighbour in that direction");
            return;
        };
        if target == node {
            return;
        }
        if let Some(promoted) = self.tree.remove_leaf(node) {
            self.recalc_node(ctx, promoted);
        }
        self.split_into(ctx, window, target, direction.orientation(), direction.is_first());
    }

    fn replace_window_data(&mut self, ctx: &mut LayoutContext<'_>, from: WindowId, to: WindowId) {
        let Some(node) = self.tree.node_of(from) else {
            warn!(?from, "no layout node to rebind");
            return;
        };
        self.tree.set_window(node, to);
        if let Some(rect) = self.tree.get(node).map(|n| n.rect) {
            apply_cell(ctx, to, rect);
        }
    }

    fn draw_tree(&self, ws: WorkspaceId) -> String { self.tree.draw(ws) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::systems::test_support::Fixture;
    use crate::model::{Monitor, Window};
    use crate::sys::geometry::{Insets, Size};

    fn tiled(fx: &mut Fixture, layout: &mut DwindleLayout, n: usize) -> Vec<WindowId> {
        (0..n)
            .map(|_| {
                fx.cursor(999.0, 599.0);
                let w = fx.window();
                layout.on_window_created_tiling(&mut fx.ctx(), w, None);
                fx.input.focused = Some(w);
                w
            })
            .collect()
    }

    fn ratios(layout: &DwindleLayout, ws: WorkspaceId) -> Vec<f32> {
        layout.tree.nodes_on(ws).into_iter().filter_map(|n| layout.tree.ratio(n)).collect()
    }

    #[test]
    fn first_window_fills_working_area() {
        let mut fx = Fixture::new();
        fx.monitors.monitor_mut(fx.mon).unwrap().reserved = Insets::new(30.0, 0.0, 0.0, 0.0);
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        assert_eq!(fx.goal(a), Rect::new(0.0, 30.0, 1000.0, 570.0));
    }

    #[test]
    fn second_window_splits_wide_workspace_side_by_side() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        fx.cursor(750.0, 300.0);
        let b = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);

        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 500.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(500.0, 0.0, 500.0, 600.0));
        assert_eq!(layout.tree.nodes_on(fx.ws).len(), 3);
        assert!(layout.tree.is_well_formed(fx.ws));
    }

    #[test]
    fn cursor_side_picks_the_half() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        fx.cursor(100.0, 300.0);
        let b = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 500.0, 600.0));
    }

    #[test]
    fn removing_a_window_promotes_its_sibling() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        layout.on_window_removed_tiling(&mut fx.ctx(), a);
        fx.windows.remove(a);

        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert_eq!(layout.tiled_windows(fx.ws), vec![b]);
        assert!(layout.tree.is_well_formed(fx.ws));
    }

    #[test]
    fn third_window_splits_the_focused_leaf() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 500.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(500.0, 0.0, 500.0, 300.0));
        assert_eq!(fx.goal(c), Rect::new(500.0, 300.0, 500.0, 300.0));
    }

    #[test]
    fn leaves_track_tiled_windows_through_inserts_and_removes() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let mut live = tiled(&mut fx, &mut layout, 6);
        for idx in [3, 0, 2] {
            let w = live.remove(idx);
            layout.on_window_removed_tiling(&mut fx.ctx(), w);
            fx.windows.remove(w);
            assert!(layout.tree.is_well_formed(fx.ws));
        }
        live.extend(tiled(&mut fx, &mut layout, 2));

        let mut leaves = layout.tiled_windows(fx.ws);
        let mut tiled_windows: Vec<_> =
            fx.windows.on_workspace(fx.ws).filter(|(_, w)| w.is_tiled()).map(|(id, _)| id).collect();
        leaves.sort();
        tiled_windows.sort();
        assert_eq!(leaves, tiled_windows);
        assert!(layout.tree.is_well_formed(fx.ws));
    }

    #[test]
    fn recalculation_is_idempotent() {
        let mut fx = Fixture::new();
        fx.settings.layout.gaps.inner.horizontal = 7.0;
        fx.settings.layout.gaps.outer.left = 13.0;
        let mut layout = DwindleLayout::default();
        let windows = tiled(&mut fx, &mut layout, 5);
        let ws = fx.ws;
        layout.recalculate_workspace(&mut fx.ctx(), ws);
        let first: Vec<Rect> = windows.iter().map(|&w| fx.goal(w)).collect();
        layout.recalculate_workspace(&mut fx.ctx(), ws);
        let second: Vec<Rect> = windows.iter().map(|&w| fx.goal(w)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn smart_resize_moves_only_the_shared_boundary() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();
        let before = ratios(&layout, fx.ws);
        assert_eq!(before, vec![1.0, 1.0]);

        layout.resize_active_window(&mut fx.ctx(), a, Point::new(40.0, 0.0), ResizeCorner::BottomRight);

        let after = ratios(&layout, fx.ws);
        assert!((after[0] - 1.08).abs() < 1e-5);
        assert_eq!(after[1], 1.0);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 540.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(540.0, 0.0, 460.0, 300.0));
        assert_eq!(fx.goal(c), Rect::new(540.0, 300.0, 460.0, 300.0));
    }

    #[test]
    fn axis_resize_grows_the_window_on_each_axis() {
        let mut fx = Fixture::new();
        fx.settings.layout.dwindle.smart_resizing = false;
        let mut layout = DwindleLayout::default();
        let [_a, b, _c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();

        layout.resize_active_window(&mut fx.ctx(), b, Point::new(-50.0, 30.0), ResizeCorner::BottomLeft);

        let goal = fx.goal(b);
        assert_eq!(goal.min_x(), 450.0);
        assert_eq!(goal.size.height, 330.0);
    }

    #[test]
    fn ratios_stay_in_bounds_under_repeated_adjustments() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let windows = tiled(&mut fx, &mut layout, 4);
        for _ in 0..20 {
            for &w in &windows {
                layout.alter_split_ratio(&mut fx.ctx(), w, RatioChange::Delta(0.37));
                layout.resize_active_window(&mut fx.ctx(), w, Point::new(-400.0, 900.0), ResizeCorner::None);
            }
        }
        layout.alter_split_ratio(&mut fx.ctx(), windows[0], RatioChange::Exact(-3.0));
        for r in ratios(&layout, fx.ws) {
            assert!((0.1..=1.9).contains(&r), "ratio {r} out of bounds");
        }
        assert!(layout.tree.is_well_formed(fx.ws));
    }

    #[test]
    fn preselect_overrides_the_next_split_only() {
        let mut fx = Fixture::new();
        fx.settings.layout.dwindle.preserve_split = true;
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        layout
            .layout_message(&mut fx.ctx(), Some(a), LayoutMessage::Preselect(Direction::Up))
            .unwrap();
        let b = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 300.0));
        assert_eq!(layout.preselect, None);
    }

    #[test]
    fn smart_split_uses_the_pointer_quadrant() {
        let mut fx = Fixture::new();
        fx.settings.layout.dwindle.smart_split = true;
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        fx.cursor(500.0, 580.0);
        let b = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);
        assert_eq!(fx.goal(b), Rect::new(0.0, 300.0, 1000.0, 300.0));
    }

    #[test]
    fn togglesplit_and_swapsplit_rearrange_the_parent() {
        let mut fx = Fixture::new();
        fx.settings.layout.dwindle.preserve_split = true;
        let mut layout = DwindleLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();

        layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::ToggleSplit).unwrap();
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 300.0));

        layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::SwapSplit).unwrap();
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 300.0));
        assert_eq!(fx.goal(a), Rect::new(0.0, 300.0, 1000.0, 300.0));
    }

    #[test]
    fn master_verbs_are_unsupported() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let err = layout.layout_message(&mut fx.ctx(), None, LayoutMessage::AddMaster);
        assert!(matches!(err, Err(LayoutError::UnsupportedMessage { layout: "dwindle", .. })));
    }

    #[test]
    fn movetoroot_lifts_a_deep_window() {
        let mut fx = Fixture::new();
        fx.settings.layout.dwindle.preserve_split = true;
        let mut layout = DwindleLayout::default();
        let [a, _b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();

        layout
            .layout_message(&mut fx.ctx(), Some(c), LayoutMessage::MoveToRoot { stable: false })
            .unwrap();
        let root = layout.tree.root(fx.ws).unwrap();
        let leaf = layout.tree.node_of(c).unwrap();
        assert_eq!(layout.tree.parent(leaf), Some(root));
        assert!(layout.tree.is_first_child(leaf));
        assert_eq!(fx.goal(c), Rect::new(0.0, 0.0, 500.0, 600.0));
        assert_eq!(fx.goal(a).size.height, 300.0);
        assert!(layout.tree.is_well_formed(fx.ws));
    }

    #[test]
    fn max_size_too_small_for_half_diverts_to_floating() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        let mut b = Window::new(fx.ws, fx.mon);
        b.max_size = Some(Size::new(300.0, 300.0));
        let b = fx.windows.add(b);
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);

        assert!(!layout.is_window_tiled(b));
        assert!(fx.windows.get(b).unwrap().floating);
        assert_eq!(fx.goal(b).size, Size::new(300.0, 300.0));
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert!(matches!(
            fx.events.as_slice(),
            [crate::layout_engine::LayoutNotification::FloatingChanged { floating: true, .. }]
        ));
    }

    #[test]
    fn opening_on_a_group_merges_instead_of_splitting() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        fx.windows.create_group(a);
        fx.input.focused = Some(a);
        let b = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);

        assert_eq!(layout.tiled_windows(fx.ws), vec![b]);
        assert!(fx.windows.get(a).unwrap().hidden);
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert_eq!(fx.goal(a), fx.goal(b));
    }

    #[test]
    fn move_in_direction_reinserts_beside_the_neighbour() {
        let mut fx = Fixture::new();
        fx.settings.layout.dwindle.preserve_split = true;
        let mut layout = DwindleLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();

        layout.move_window_to(&mut fx.ctx(), c, Direction::Left);
        assert_eq!(fx.goal(c), Rect::new(0.0, 0.0, 250.0, 600.0));
        assert_eq!(fx.goal(a), Rect::new(250.0, 0.0, 250.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(500.0, 0.0, 500.0, 600.0));
        assert!(layout.tree.is_well_formed(fx.ws));
    }

    #[test]
    fn switching_across_workspaces_exchanges_membership() {
        let mut fx = Fixture::new();
        let other_mon = fx
            .monitors
            .add_monitor(Monitor::new("HDMI-1", Rect::new(1000.0, 0.0, 800.0, 800.0)));
        let other_ws = fx.monitors.add_workspace("2", other_mon);
        let mut layout = DwindleLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        let c = fx.windows.add(Window::new(other_ws, other_mon));
        layout.on_window_created_tiling(&mut fx.ctx(), c, None);

        layout.switch_windows(&mut fx.ctx(), a, c);
        assert_eq!(fx.windows.get(a).unwrap().workspace, other_ws);
        assert_eq!(fx.windows.get(c).unwrap().monitor, fx.mon);
        assert_eq!(fx.goal(a), Rect::new(1000.0, 0.0, 800.0, 800.0));
        assert_eq!(fx.goal(c), Rect::new(0.0, 0.0, 500.0, 600.0));
        assert_eq!(layout.tiled_windows(fx.ws), vec![c, b]);
    }

    #[test]
    fn orphaned_workspace_is_skipped() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let [a, _b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        let before = fx.goal(a);
        fx.monitors.remove_monitor(fx.mon);
        let ws = fx.ws;
        layout.recalculate_workspace(&mut fx.ctx(), ws);
        assert_eq!(fx.goal(a), before);
    }

    #[test]
    fn draw_tree_lists_every_window() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        tiled(&mut fx, &mut layout, 3);
        let drawn = layout.draw_tree(fx.ws);
        assert_eq!(drawn.matches("WindowId").count(), 3);
    }
}
