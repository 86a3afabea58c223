use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::collections::HashMap;
use crate::common::config::{MasterOrientation, MasterSettings};
use crate::layout_engine::systems::{
    LayoutSystem, apply_cell, exchange_membership, float_instead, focal_point, merge_into_group,
    over_constrained,
};
use crate::layout_engine::utils::Edges;
use crate::layout_engine::{
    Direction, LayoutContext, LayoutError, LayoutMessage, RatioChange, ResizeCorner,
};
use crate::model::{WindowId, WorkspaceId};
use crate::sys::geometry::{Point, Rect, Size};

const MIN_PERC_MASTER: f32 = 0.05;
const MAX_PERC_MASTER: f32 = 0.95;
const MIN_PERC_SIZE: f32 = 0.05;
const MAX_PERC_SIZE: f32 = 1.95;

const ORIENTATION_CYCLE: [MasterOrientation; 5] = [
    MasterOrientation::Left,
    MasterOrientation::Top,
    MasterOrientation::Right,
    MasterOrientation::Bottom,
    MasterOrientation::Center,
];

#[derive(Serialize, Deserialize, Clone, Debug)]
struct MasterNode {
    window: WindowId,
    workspace: WorkspaceId,
    is_master: bool,
    /// Share of the master axis for the master area. Kept equal across a workspace.
    perc_master: f32,
    /// Weight among peers of the same role.
    perc_size: f32,
    rect: Rect,
    seq: u64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
struct WorkspaceOrientation {
    orientation: MasterOrientation,
    /// Number of masters the workspace keeps.
    masters: usize,
}

/// One or more master windows along the orientation edge, the rest stacked beside them.
#[derive(Default, Serialize, Deserialize, Debug)]
pub struct MasterStackLayout {
    nodes: Vec<MasterNode>,
    workspaces: HashMap<WorkspaceId, WorkspaceOrientation>,
    next_seq: u64,
}

/// Orientation actually laid out: a centred master without enough stack windows to
/// flank it behaves like `Left`.
fn effective_orientation(
    orientation: MasterOrientation,
    slaves: usize,
    always_center: bool,
) -> MasterOrientation {
    if orientation == MasterOrientation::Center && slaves < 2 && !always_center {
        MasterOrientation::Left
    } else {
        orientation
    }
}

fn master_settings<'a>(ctx: &LayoutContext<'a>) -> &'a MasterSettings { &ctx.settings.layout.master }

fn stacks_vertically(orientation: MasterOrientation) -> bool {
    matches!(
        orientation,
        MasterOrientation::Left | MasterOrientation::Right | MasterOrientation::Center
    )
}

impl MasterStackLayout {
    fn record(&mut self, ws: WorkspaceId, settings: &MasterSettings) -> WorkspaceOrientation {
        *self.workspaces.entry(ws).or_insert_with(|| WorkspaceOrientation {
            orientation: settings.orientation,
            masters: settings.master_count.max(1),
        })
    }

    fn record_mut(
        &mut self,
        ws: WorkspaceId,
        settings: &MasterSettings,
    ) -> &mut WorkspaceOrientation {
        self.workspaces.entry(ws).or_insert_with(|| WorkspaceOrientation {
            orientation: settings.orientation,
            masters: settings.master_count.max(1),
        })
    }

    fn index_of(&self, window: WindowId) -> Option<usize> {
        self.nodes.iter().position(|n| n.window == window)
    }

    fn indices_on(&self, ws: WorkspaceId) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&i| self.nodes[i].workspace == ws).collect()
    }

    fn masters_on(&self, ws: WorkspaceId) -> usize {
        self.nodes.iter().filter(|n| n.workspace == ws && n.is_master).count()
    }

    fn perc_master_on(&self, ws: WorkspaceId) -> Option<f32> {
        self.nodes.iter().find(|n| n.workspace == ws && n.is_master).map(|n| n.perc_master)
    }

    fn set_perc_master(&mut self, ws: WorkspaceId, value: f32) {
        let value = value.clamp(MIN_PERC_MASTER, MAX_PERC_MASTER);
        for n in self.nodes.iter_mut().filter(|n| n.workspace == ws) {
            n.perc_master = value;
        }
    }

    /// Demotes masters other than `keep`, last first, until at most `limit` remain.
    fn demote_excess(&mut self, ws: WorkspaceId, keep: WindowId, limit: usize) {
        let mut masters: Vec<usize> =
            self.indices_on(ws).into_iter().filter(|&i| self.nodes[i].is_master).collect();
        while masters.len() > limit.max(1) {
            let Some(pos) = masters.iter().rposition(|&i| self.nodes[i].window != keep) else {
                break;
            };
            let idx = masters.remove(pos);
            self.nodes[idx].is_master = false;
        }
    }

    /// Approximate cell a new window would get, used to check its size limits.
    fn predicted_cell(
        area: Rect,
        orientation: MasterOrientation,
        mfact: f64,
        as_master: bool,
        masters: usize,
        slaves: usize,
    ) -> Size {
        let (w, h) = (area.size.width, area.size.height);
        if slaves == 0 {
            return Size::new(w, h / masters.max(1) as f64);
        }
        match (orientation, as_master) {
            (MasterOrientation::Top | MasterOrientation::Bottom, true) => {
                Size::new(w / masters.max(1) as f64, h * mfact)
            }
            (MasterOrientation::Top | MasterOrientation::Bottom, false) => {
                Size::new(w / slaves as f64, h * (1.0 - mfact))
            }
            (_, true) => Size::new(w * mfact, h / masters.max(1) as f64),
            (MasterOrientation::Center, false) => {
                Size::new(w * (1.0 - mfact) / 2.0, h / slaves.div_ceil(2) as f64)
            }
            (_, false) => Size::new(w * (1.0 - mfact), h / slaves as f64),
        }
    }

    /// Splits `area` among `items` along one axis by their `perc_size` weights. No item
    /// takes more than 90% of what is left while others still need room.
    fn stack(&self, items: &[usize], area: Rect, vertical: bool) -> Vec<(usize, Rect)> {
        let mut left = if vertical { area.size.height } else { area.size.width };
        let mut offset = 0.0;
        let mut out = Vec::with_capacity(items.len());
        for (n, &idx) in items.iter().enumerate() {
            let remaining = items.len() - n;
            let len = if remaining > 1 {
                let share = left / remaining as f64 * f64::from(self.nodes[idx].perc_size);
                share.min(left * 0.9)
            } else {
                left
            };
            let rect = if vertical {
                Rect::new(area.origin.x, area.origin.y + offset, area.size.width, len)
            } else {
                Rect::new(area.origin.x + offset, area.origin.y, len, area.size.height)
            };
            out.push((idx, rect));
            left -= len;
            offset += len;
        }
        out
    }

    /// Stack windows sharing a column with `idx`. Centred layouts alternate stack windows
    /// between the right and left columns.
    fn column_of(&self, idx: usize, orientation: MasterOrientation) -> Vec<usize> {
        let node = &self.nodes[idx];
        let peers: Vec<usize> = self
            .indices_on(node.workspace)
            .into_iter()
            .filter(|&i| self.nodes[i].is_master == node.is_master)
            .collect();
        if node.is_master || orientation != MasterOrientation::Center {
            return peers;
        }
        let Some(pos) = peers.iter().position(|&i| i == idx) else {
            return peers;
        };
        peers.into_iter().enumerate().filter(|(n, _)| n % 2 == pos % 2).map(|(_, i)| i).collect()
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        let wa = self.nodes[a].window;
        self.nodes[a].window = self.nodes[b].window;
        self.nodes[b].window = wa;
    }

    fn neighbour(&self, idx: usize, forward: bool) -> Option<usize> {
        let peers = self.indices_on(self.nodes[idx].workspace);
        let pos = peers.iter().position(|&i| i == idx)?;
        let n = peers.len();
        if n < 2 {
            return None;
        }
        let next = if forward { (pos + 1) % n } else { (pos + n - 1) % n };
        peers.get(next).copied()
    }

    fn first_with_role(&self, ws: WorkspaceId, master: bool) -> Option<usize> {
        self.indices_on(ws).into_iter().find(|&i| self.nodes[i].is_master == master)
    }

    fn smart_resize_column(
        &mut self,
        idx: usize,
        column: &[usize],
        resize_delta: f64,
        resize_prev: bool,
        ws_len: f64,
        vertical: bool,
    ) {
        let n = column.len() as f64;
        let size = ws_len / n;
        let min_size = size * 0.2;
        let Some(pos) = column.iter().position(|&i| i == idx) else {
            return;
        };
        let others: Vec<usize> = if resize_prev {
            column[..pos].iter().rev().copied().collect()
        } else {
            column[pos + 1..].to_vec()
        };
        if others.is_empty() {
            return;
        }
        let len_of = |node: &MasterNode| if vertical { node.rect.size.height } else { node.rect.size.width };
        let size_left: f64 = others.iter().map(|&i| len_of(&self.nodes[i])).sum();
        let nodes_left = others.len() as f64;
        let max_increase = size_left - nodes_left * min_size;
        let max_decrease = min_size - len_of(&self.nodes[idx]);
        let diff = if resize_prev { -resize_delta } else { resize_delta };
        let diff = diff.max(max_decrease).min(max_increase);

        let own = &mut self.nodes[idx];
        own.perc_size = (own.perc_size + (diff / size) as f32).clamp(MIN_PERC_SIZE, MAX_PERC_SIZE);
        for i in others {
            let len = len_of(&self.nodes[i]);
            let each = if max_increase != 0.0 {
                diff * (len - min_size) / max_increase
            } else {
                diff / nodes_left
            };
            let node = &mut self.nodes[i];
            node.perc_size = (node.perc_size - (each / size) as f32).clamp(MIN_PERC_SIZE, MAX_PERC_SIZE);
        }
    }
}

impl LayoutSystem for MasterStackLayout {
    fn name(&self) -> &'static str { "master" }

    fn on_window_created_tiling(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        _direction: Option<Direction>,
    ) {
        let Some(ws) = ctx.workspace_of(window) else {
            warn!(?window, "cannot tile an unknown window");
            return;
        };
        if self.index_of(window).is_some() {
            debug!(?window, "window already has a layout node");
            return;
        }
        let Some(area) = ctx.working_area(ws) else {
            return;
        };

        let cursor = ctx.input.cursor;
        let opening = ctx
            .input
            .focused
            .filter(|&f| f != window)
            .and_then(|f| self.index_of(f))
            .filter(|&i| self.nodes[i].workspace == ws)
            .or_else(|| {
                self.nodes.iter().position(|n| n.workspace == ws && n.rect.contains(cursor))
            });
        if let Some(i) = opening {
            if merge_into_group(ctx, window, self.nodes[i].window) {
                self.nodes[i].window = window;
                let rect = self.nodes[i].rect;
                apply_cell(ctx, window, rect);
                return;
            }
        }

        let settings = master_settings(ctx);
        let record = self.record(ws, settings);
        let existing = self.indices_on(ws).len();
        let masters = self.masters_on(ws);
        let perc_master = self
            .perc_master_on(ws)
            .unwrap_or(settings.mfact)
            .clamp(MIN_PERC_MASTER, MAX_PERC_MASTER);
        let mut is_master = existing == 0 || settings.new_is_master || masters < record.masters;

        if existing > 0 {
            let mfact = f64::from(perc_master);
            let predict = |as_master: bool| {
                let masters_after =
                    if as_master { (masters + 1).min(record.masters) } else { masters.max(1) };
                let slaves_after = existing + 1 - masters_after;
                let orientation =
                    effective_orientation(record.orientation, slaves_after, settings.always_center_master);
                Self::predicted_cell(area, orientation, mfact, as_master, masters_after, slaves_after)
            };
            let Some(win) = ctx.windows.get(window) else {
                return;
            };
            if is_master && over_constrained(win, predict(true)) {
                debug!(?window, "window cannot fill the master area, stacking it");
                is_master = false;
            }
            if !is_master && over_constrained(win, predict(false)) {
                float_instead(ctx, window);
                return;
            }
        }

        let node = MasterNode {
            window,
            workspace: ws,
            is_master,
            perc_master,
            perc_size: 1.0,
            rect: Rect::default(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        if settings.new_on_top {
            self.nodes.insert(0, node);
        } else {
            self.nodes.push(node);
        }
        if is_master {
            self.demote_excess(ws, window, record.masters);
        }
        self.recalculate_workspace(ctx, ws);
    }

    fn on_window_removed_tiling(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        let Some(idx) = self.index_of(window) else {
            warn!(?window, "no layout node for removed window");
            return;
        };
        let removed = self.nodes.remove(idx);
        let ws = removed.workspace;
        if removed.is_master && self.masters_on(ws) == 0 {
            let promoted = self
                .nodes
                .iter_mut()
                .filter(|n| n.workspace == ws)
                .max_by_key(|n| n.seq);
            if let Some(node) = promoted {
                debug!(window = ?node.window, "promoting newest stack window to master");
                node.is_master = true;
                node.perc_master = removed.perc_master;
            }
        }
        self.recalculate_workspace(ctx, ws);
    }

    fn is_window_tiled(&self, window: WindowId) -> bool { self.index_of(window).is_some() }

    fn tiled_windows(&self, ws: WorkspaceId) -> Vec<WindowId> {
        self.nodes.iter().filter(|n| n.workspace == ws).map(|n| n.window).collect()
    }

    fn recalculate_workspace(&mut self, ctx: &mut LayoutContext<'_>, ws: WorkspaceId) {
        let indices = self.indices_on(ws);
        if indices.is_empty() {
            return;
        }
        let Some(area) = ctx.working_area(ws) else {
            return;
        };
        let settings = master_settings(ctx);
        let record = self.record(ws, settings);

        let mut masters: Vec<usize> =
            indices.iter().copied().filter(|&i| self.nodes[i].is_master).collect();
        if masters.is_empty() {
            warn!(?ws, "workspace lost its master, promoting the first window");
            self.nodes[indices[0]].is_master = true;
            masters.push(indices[0]);
        }
        let slaves: Vec<usize> =
            indices.iter().copied().filter(|&i| !self.nodes[i].is_master).collect();
        let orientation =
            effective_orientation(record.orientation, slaves.len(), settings.always_center_master);
        let mfact = f64::from(self.nodes[masters[0]].perc_master);

        let (x, y, w, h) = (area.origin.x, area.origin.y, area.size.width, area.size.height);
        let mut cells = Vec::with_capacity(indices.len());
        if slaves.is_empty() {
            cells.extend(self.stack(&masters, area, stacks_vertically(orientation)));
        } else {
            match orientation {
                MasterOrientation::Left => {
                    let mw = w * mfact;
                    cells.extend(self.stack(&masters, Rect::new(x, y, mw, h), true));
                    cells.extend(self.stack(&slaves, Rect::new(x + mw, y, w - mw, h), true));
                }
                MasterOrientation::Right => {
                    let mw = w * mfact;
                    cells.extend(self.stack(&masters, Rect::new(x + w - mw, y, mw, h), true));
                    cells.extend(self.stack(&slaves, Rect::new(x, y, w - mw, h), true));
                }
                MasterOrientation::Top => {
                    let mh = h * mfact;
                    cells.extend(self.stack(&masters, Rect::new(x, y, w, mh), false));
                    cells.extend(self.stack(&slaves, Rect::new(x, y + mh, w, h - mh), false));
                }
                MasterOrientation::Bottom => {
                    let mh = h * mfact;
                    cells.extend(self.stack(&masters, Rect::new(x, y + h - mh, w, mh), false));
                    cells.extend(self.stack(&slaves, Rect::new(x, y, w, h - mh), false));
                }
                MasterOrientation::Center => {
                    let mw = w * mfact;
                    let side = (w - mw) / 2.0;
                    cells.extend(self.stack(&masters, Rect::new(x + side, y, mw, h), true));
                    let right: Vec<usize> = slaves.iter().copied().step_by(2).collect();
                    let left: Vec<usize> = slaves.iter().copied().skip(1).step_by(2).collect();
                    cells.extend(self.stack(&right, Rect::new(x + side + mw, y, side, h), true));
                    cells.extend(self.stack(&left, Rect::new(x, y, side, h), true));
                }
            }
        }

        for (idx, cell) in cells {
            self.nodes[idx].rect = cell;
            let window = self.nodes[idx].window;
            apply_cell(ctx, window, cell);
        }
    }

    fn recalculate_window(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        let Some(idx) = self.index_of(window) else {
            warn!(?window, "no layout node to recalculate");
            return;
        };
        let rect = self.nodes[idx].rect;
        apply_cell(ctx, window, rect);
    }

    fn resize_active_window(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        delta: Point,
        corner: ResizeCorner,
    ) {
        let Some(idx) = self.index_of(window) else {
            warn!(?window, "no layout node to resize");
            return;
        };
        let ws = self.nodes[idx].workspace;
        let Some(area) = ctx.working_area(ws) else {
            return;
        };
        let settings = master_settings(ctx);
        let record = self.record(ws, settings);
        let total = self.indices_on(ws).len();
        let slaves = total - self.masters_on(ws);
        let orientation =
            effective_orientation(record.orientation, slaves, settings.always_center_master);
        if total == 1 && orientation != MasterOrientation::Center {
            return;
        }

        let is_master = self.nodes[idx].is_master;
        let edges = Edges::touching(self.nodes[idx].rect, area);
        let none = corner == ResizeCorner::None;
        let (w, h) = (area.size.width, area.size.height);

        let master_delta = match orientation {
            MasterOrientation::Left => delta.x / w,
            MasterOrientation::Right => -delta.x / w,
            MasterOrientation::Top => delta.y / h,
            MasterOrientation::Bottom => -delta.y / h,
            MasterOrientation::Center => {
                let mut d = delta.x / w;
                if !none || !is_master {
                    d *= 2.0;
                }
                if (!is_master && edges.contains(Edges::LEFT))
                    || (is_master && corner.affects_left() && settings.smart_resizing)
                {
                    d = -d;
                }
                d
            }
        };
        if master_delta != 0.0 {
            if let Some(current) = self.perc_master_on(ws) {
                self.set_perc_master(ws, current + master_delta as f32);
            }
        }

        let vertical = stacks_vertically(orientation);
        let resize_delta = if vertical { delta.y } else { delta.x };
        let column = self.column_of(idx, orientation);
        let ws_len = if vertical { h } else { w };
        if resize_delta != 0.0 && column.len() > 1 {
            if settings.smart_resizing {
                let resize_prev = if vertical {
                    (corner.affects_top() || edges.contains(Edges::BOTTOM))
                        && !edges.contains(Edges::TOP)
                } else {
                    (corner.affects_left() || edges.contains(Edges::RIGHT))
                        && !edges.contains(Edges::LEFT)
                };
                self.smart_resize_column(idx, &column, resize_delta, resize_prev, ws_len, vertical);
            } else {
                let size = ws_len / column.len() as f64;
                let node = &mut self.nodes[idx];
                node.perc_size = (node.perc_size + (resize_delta / size) as f32)
                    .clamp(MIN_PERC_SIZE, MAX_PERC_SIZE);
            }
        }
        self.recalculate_workspace(ctx, ws);
    }

    fn alter_split_ratio(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        change: RatioChange,
    ) {
        let Some(idx) = self.index_of(window) else {
            warn!(?window, "no layout node to adjust");
            return;
        };
        let ws = self.nodes[idx].workspace;
        let current = self.perc_master_on(ws).unwrap_or(self.nodes[idx].perc_master);
        self.set_perc_master(ws, change.apply(current));
        self.recalculate_workspace(ctx, ws);
    }

    fn layout_message(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: Option<WindowId>,
        message: LayoutMessage,
    ) -> Result<Option<WindowId>, LayoutError> {
        if message.is_binary_tree_message() {
            return Err(LayoutError::UnsupportedMessage {
                layout: self.name(),
                message: format!("{message:?}"),
            });
        }
        let Some(idx) = window.and_then(|w| self.index_of(w)) else {
            debug!(?window, ?message, "layout message without a tiled window");
            return Ok(None);
        };
        let ws = self.nodes[idx].workspace;
        let window = self.nodes[idx].window;
        let settings = master_settings(ctx);

        let focus = match message {
            LayoutMessage::SwapWithMaster => {
                let other = if self.nodes[idx].is_master {
                    self.first_with_role(ws, false)
                } else {
                    self.first_with_role(ws, true)
                };
                if let Some(other) = other {
                    self.swap_slots(idx, other);
                }
                Some(window)
            }
            LayoutMessage::FocusMaster => {
                let target = if self.nodes[idx].is_master {
                    self.first_with_role(ws, false)
                } else {
                    self.first_with_role(ws, true)
                };
                return Ok(target.map(|i| self.nodes[i].window));
            }
            LayoutMessage::CycleNext | LayoutMessage::CyclePrev => {
                let forward = message == LayoutMessage::CycleNext;
                return Ok(self.neighbour(idx, forward).map(|i| self.nodes[i].window));
            }
            LayoutMessage::SwapNext | LayoutMessage::SwapPrev => {
                let forward = message == LayoutMessage::SwapNext;
                if let Some(other) = self.neighbour(idx, forward) {
                    self.swap_slots(idx, other);
                }
                Some(window)
            }
            LayoutMessage::AddMaster => {
                let total = self.indices_on(ws).len();
                if self.masters_on(ws) < total {
                    let target = if self.nodes[idx].is_master {
                        self.first_with_role(ws, false)
                    } else {
                        Some(idx)
                    };
                    if let Some(t) = target {
                        self.nodes[t].is_master = true;
                    }
                    let masters = self.masters_on(ws);
                    self.record_mut(ws, settings).masters = masters;
                }
                None
            }
            LayoutMessage::RemoveMaster => {
                let masters = self.masters_on(ws);
                if masters > 1 {
                    let target = if self.nodes[idx].is_master {
                        Some(idx)
                    } else {
                        self.indices_on(ws).into_iter().rev().find(|&i| self.nodes[i].is_master)
                    };
                    if let Some(t) = target {
                        self.nodes[t].is_master = false;
                    }
                    self.record_mut(ws, settings).masters = masters - 1;
                }
                None
            }
            LayoutMessage::Orientation(orientation) => {
                self.record_mut(ws, settings).orientation = orientation;
                None
            }
            LayoutMessage::OrientationNext | LayoutMessage::OrientationPrev => {
                let forward = message == LayoutMessage::OrientationNext;
                let record = self.record_mut(ws, settings);
                let pos =
                    ORIENTATION_CYCLE.iter().position(|&o| o == record.orientation).unwrap_or(0);
                let n = ORIENTATION_CYCLE.len();
                let next = if forward { (pos + 1) % n } else { (pos + n - 1) % n };
                record.orientation = ORIENTATION_CYCLE[next];
                None
            }
            LayoutMessage::Mfact(change) => {
                let current = self.perc_master_on(ws).unwrap_or(settings.mfact);
                self.set_perc_master(ws, change.apply(current));
                None
            }
            LayoutMessage::ToggleSplit
            | LayoutMessage::SwapSplit
            | LayoutMessage::Preselect(_)
            | LayoutMessage::MoveToRoot { .. } => None,
        };
        self.recalculate_workspace(ctx, ws);
        Ok(focus)
    }

    fn switch_windows(&mut self, ctx: &mut LayoutContext<'_>, a: WindowId, b: WindowId) {
        if a == b {
            return;
        }
        let (Some(ia), Some(ib)) = (self.index_of(a), self.index_of(b)) else {
            warn!(?a, ?b, "cannot switch windows without layout nodes");
            return;
        };
        let (ws_a, ws_b) = (self.nodes[ia].workspace, self.nodes[ib].workspace);
        exchange_membership(ctx, a, b);
        self.swap_slots(ia, ib);
        self.recalculate_workspace(ctx, ws_a);
        if ws_b != ws_a {
            self.recalculate_workspace(ctx, ws_b);
        }
    }

    fn move_window_to(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Direction,
    ) {
        let Some(idx) = self.index_of(window) else {
            warn!(?window, "no layout node to move");
            return;
        };
        let node = &self.nodes[idx];
        let focal = focal_point(node.rect, direction);
        let target = self
            .nodes
            .iter()
            .find(|n| n.workspace == node.workspace && n.window != window && n.rect.contains(focal))
            .map(|n| n.window);
        match target {
            Some(other) => self.switch_windows(ctx, window, other),
            None => debug!(?window, ?direction, "no neighbour in that direction"),
        }
    }

    fn replace_window_data(&mut self, ctx: &mut LayoutContext<'_>, from: WindowId, to: WindowId) {
        let Some(idx) = self.index_of(from) else {
            warn!(?from, "no layout node to rebind");
            return;
        };
        self.nodes[idx].window = to;
        let rect = self.nodes[idx].rect;
        apply_cell(ctx, to, rect);
    }

    fn draw_tree(&self, ws: WorkspaceId) -> String {
        let describe = |n: &MasterNode| {
            let r = n.rect;
            format!(
                "{:?} {:.2} {}x{} @ {},{}",
                n.window, n.perc_size, r.size.width, r.size.height, r.origin.x, r.origin.y
            )
        };
        let masters: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.workspace == ws && n.is_master)
            .map(describe)
            .collect();
        let slaves: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.workspace == ws && !n.is_master)
            .map(describe)
            .collect();
        if masters.is_empty() && slaves.is_empty() {
            return String::new();
        }
        let orientation = self.workspaces.get(&ws).map(|r| r.orientation).unwrap_or_default();
        let mfact = self.perc_master_on(ws).unwrap_or_default();
        let tree = ascii_tree::Tree::Node(format!("{orientation:?} {mfact:.2}"), vec![
            ascii_tree::Tree::Node("masters".into(), vec![ascii_tree::Tree::Leaf(masters)]),
            ascii_tree::Tree::Node("stack".into(), vec![ascii_tree::Tree::Leaf(slaves)]),
        ]);
        let mut out = String::new();
        if ascii_tree::write_tree(&mut out, &tree).is_err() {
            warn!(?ws, "failed to render layout tree");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::systems::test_support::Fixture;
    use crate::model::Window;

    fn tiled(fx: &mut Fixture, layout: &mut MasterStackLayout, n: usize) -> Vec<WindowId> {
        (0..n)
            .map(|_| {
                let w = fx.window();
                layout.on_window_created_tiling(&mut fx.ctx(), w, None);
                fx.input.focused = Some(w);
                w
            })
            .collect()
    }

    fn stacking(fx: &mut Fixture) { fx.settings.layout.master.new_is_master = false; }

    #[test]
    fn first_window_fills_the_workspace() {
        let mut fx = Fixture::new();
        let mut layout = MasterStackLayout::default();
        let [a]: [WindowId; 1] = tiled(&mut fx, &mut layout, 1).try_into().unwrap();
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 600.0));
    }

    #[test]
    fn new_master_pushes_old_master_into_the_stack() {
        let mut fx = Fixture::new();
        let mut layout = MasterStackLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(a), Rect::new(550.0, 0.0, 450.0, 600.0));
        assert_eq!(layout.masters_on(fx.ws), 1);
    }

    #[test]
    fn stack_windows_share_the_remaining_column() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(550.0, 0.0, 450.0, 300.0));
        assert_eq!(fx.goal(c), Rect::new(550.0, 300.0, 450.0, 300.0));
    }

    #[test]
    fn new_on_top_prepends_to_the_stack() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        fx.settings.layout.master.new_on_top = true;
        let mut layout = MasterStackLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();
        assert_eq!(layout.tiled_windows(fx.ws), vec![c, b, a]);
        assert_eq!(fx.goal(c), Rect::new(550.0, 0.0, 450.0, 300.0));
    }

    #[test]
    fn removing_sole_master_promotes_newest_stack_window() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();
        layout.on_window_removed_tiling(&mut fx.ctx(), a);

        assert_eq!(fx.goal(c), Rect::new(0.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(550.0, 0.0, 450.0, 600.0));
    }

    #[test]
    fn top_orientation_stacks_horizontally() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        fx.settings.layout.master.orientation = MasterOrientation::Top;
        let mut layout = MasterStackLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 330.0));
        assert_eq!(fx.goal(b), Rect::new(0.0, 330.0, 500.0, 270.0));
        assert_eq!(fx.goal(c), Rect::new(500.0, 330.0, 500.0, 270.0));
    }

    #[test]
    fn centred_master_is_flanked_by_alternating_stack_columns() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        fx.settings.layout.master.orientation = MasterOrientation::Center;
        let mut layout = MasterStackLayout::default();
        let [m, s1, s2, s3]: [WindowId; 4] = tiled(&mut fx, &mut layout, 4).try_into().unwrap();
        assert_eq!(fx.goal(m), Rect::new(225.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(s1), Rect::new(775.0, 0.0, 225.0, 300.0));
        assert_eq!(fx.goal(s3), Rect::new(775.0, 300.0, 225.0, 300.0));
        assert_eq!(fx.goal(s2), Rect::new(0.0, 0.0, 225.0, 600.0));
    }

    #[test]
    fn centre_with_one_stack_window_behaves_like_left_unless_forced() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        fx.settings.layout.master.orientation = MasterOrientation::Center;
        let mut layout = MasterStackLayout::default();
        let [m, s]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        assert_eq!(fx.goal(m), Rect::new(0.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(s), Rect::new(550.0, 0.0, 450.0, 600.0));

        fx.settings.layout.master.always_center_master = true;
        let ws = fx.ws;
        layout.recalculate_workspace(&mut fx.ctx(), ws);
        assert_eq!(fx.goal(m), Rect::new(225.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(s), Rect::new(775.0, 0.0, 225.0, 600.0));
    }

    #[test]
    fn cross_axis_drag_changes_the_master_share() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        layout.resize_active_window(&mut fx.ctx(), a, Point::new(100.0, 0.0), ResizeCorner::BottomRight);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 650.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(650.0, 0.0, 350.0, 600.0));

        layout.resize_active_window(&mut fx.ctx(), a, Point::new(5000.0, 0.0), ResizeCorner::BottomRight);
        assert_eq!(layout.perc_master_on(fx.ws), Some(MAX_PERC_MASTER));
    }

    #[test]
    fn smart_along_axis_drag_takes_space_from_later_peers() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [_m, s1, _s2, s3]: [WindowId; 4] = tiled(&mut fx, &mut layout, 4).try_into().unwrap();
        layout.resize_active_window(&mut fx.ctx(), s1, Point::new(0.0, 60.0), ResizeCorner::BottomRight);

        assert_eq!(fx.goal(s1).size.height, 260.0);
        assert_eq!(fx.goal(s3).max_y(), 600.0);
        assert_eq!(layout.perc_master_on(fx.ws), Some(0.55));
    }

    #[test]
    fn mfact_message_sets_and_clamps() {
        let mut fx = Fixture::new();
        let mut layout = MasterStackLayout::default();
        let [a, _b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        layout
            .layout_message(&mut fx.ctx(), Some(a), LayoutMessage::Mfact(RatioChange::Exact(0.7)))
            .unwrap();
        assert_eq!(layout.perc_master_on(fx.ws), Some(0.7));
        layout
            .layout_message(&mut fx.ctx(), Some(a), LayoutMessage::Mfact(RatioChange::Delta(2.0)))
            .unwrap();
        assert_eq!(layout.perc_master_on(fx.ws), Some(MAX_PERC_MASTER));
    }

    #[test]
    fn add_and_remove_master_adjust_the_master_count() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();

        layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::AddMaster).unwrap();
        assert_eq!(layout.masters_on(fx.ws), 2);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 550.0, 300.0));
        assert_eq!(fx.goal(b), Rect::new(0.0, 300.0, 550.0, 300.0));
        assert_eq!(fx.goal(c), Rect::new(550.0, 0.0, 450.0, 600.0));

        let d = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), d, None);
        assert_eq!(layout.masters_on(fx.ws), 2);

        layout.layout_message(&mut fx.ctx(), Some(c), LayoutMessage::RemoveMaster).unwrap();
        assert_eq!(layout.masters_on(fx.ws), 1);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 550.0, 600.0));
    }

    #[test]
    fn focus_cycle_and_swap_messages() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [a, b, c]: [WindowId; 3] = tiled(&mut fx, &mut layout, 3).try_into().unwrap();

        assert_eq!(layout.layout_message(&mut fx.ctx(), Some(c), LayoutMessage::FocusMaster), Ok(Some(a)));
        assert_eq!(layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::FocusMaster), Ok(Some(b)));
        assert_eq!(layout.layout_message(&mut fx.ctx(), Some(c), LayoutMessage::CycleNext), Ok(Some(a)));
        assert_eq!(layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::CyclePrev), Ok(Some(c)));

        layout.layout_message(&mut fx.ctx(), Some(c), LayoutMessage::SwapWithMaster).unwrap();
        assert_eq!(layout.tiled_windows(fx.ws), vec![c, b, a]);
        assert_eq!(fx.goal(c), Rect::new(0.0, 0.0, 550.0, 600.0));

        layout.layout_message(&mut fx.ctx(), Some(c), LayoutMessage::SwapNext).unwrap();
        assert_eq!(layout.tiled_windows(fx.ws), vec![b, c, a]);
    }

    #[test]
    fn orientation_messages_cycle_and_set() {
        let mut fx = Fixture::new();
        let mut layout = MasterStackLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::OrientationNext).unwrap();
        assert_eq!(layout.workspaces[&fx.ws].orientation, MasterOrientation::Top);
        layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::OrientationPrev).unwrap();
        layout.layout_message(&mut fx.ctx(), Some(a), LayoutMessage::OrientationPrev).unwrap();
        assert_eq!(layout.workspaces[&fx.ws].orientation, MasterOrientation::Center);
        layout
            .layout_message(&mut fx.ctx(), Some(a), LayoutMessage::Orientation(MasterOrientation::Right))
            .unwrap();
        assert_eq!(fx.goal(b), Rect::new(450.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 450.0, 600.0));
    }

    #[test]
    fn tree_verbs_are_unsupported() {
        let mut fx = Fixture::new();
        let mut layout = MasterStackLayout::default();
        let err = layout.layout_message(&mut fx.ctx(), None, LayoutMessage::ToggleSplit);
        assert!(matches!(err, Err(LayoutError::UnsupportedMessage { layout: "master", .. })));
    }

    #[test]
    fn oversized_master_is_stacked_and_impossible_window_floats() {
        let mut fx = Fixture::new();
        let mut layout = MasterStackLayout::default();
        let [a]: [WindowId; 1] = tiled(&mut fx, &mut layout, 1).try_into().unwrap();

        let mut narrow = Window::new(fx.ws, fx.mon);
        narrow.max_size = Some(Size::new(500.0, 700.0));
        let narrow = fx.windows.add(narrow);
        layout.on_window_created_tiling(&mut fx.ctx(), narrow, None);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(narrow), Rect::new(550.0, 0.0, 450.0, 600.0));

        let mut tiny = Window::new(fx.ws, fx.mon);
        tiny.max_size = Some(Size::new(100.0, 100.0));
        let tiny = fx.windows.add(tiny);
        layout.on_window_created_tiling(&mut fx.ctx(), tiny, None);
        assert!(!layout.is_window_tiled(tiny));
        assert!(fx.windows.get(tiny).unwrap().floating);
    }

    #[test]
    fn recalculation_is_idempotent() {
        let mut fx = Fixture::new();
        fx.settings.layout.gaps.inner.vertical = 9.0;
        fx.settings.layout.master.orientation = MasterOrientation::Center;
        let mut layout = MasterStackLayout::default();
        let windows = tiled(&mut fx, &mut layout, 5);
        let ws = fx.ws;
        layout.recalculate_workspace(&mut fx.ctx(), ws);
        let first: Vec<Rect> = windows.iter().map(|&w| fx.goal(w)).collect();
        layout.recalculate_workspace(&mut fx.ctx(), ws);
        let second: Vec<Rect> = windows.iter().map(|&w| fx.goal(w)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn move_in_direction_swaps_with_the_neighbour() {
        let mut fx = Fixture::new();
        stacking(&mut fx);
        let mut layout = MasterStackLayout::default();
        let [a, b]: [WindowId; 2] = tiled(&mut fx, &mut layout, 2).try_into().unwrap();
        layout.move_window_to(&mut fx.ctx(), a, Direction::Right);
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 550.0, 600.0));
        assert_eq!(fx.goal(a), Rect::new(550.0, 0.0, 450.0, 600.0));
    }
}
