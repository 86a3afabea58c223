//! Interactive move and resize. At most one drag is active at a time; the state is a
//! plain value owned by the engine and driven by pointer events.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, trace, warn};

use crate::layout_engine::utils::MIN_WINDOW_SIZE;
use crate::layout_engine::{
    EventResponse, LayoutContext, LayoutError, LayoutNotification, LayoutSystem, ResizeCorner,
};
use crate::model::{Window, WindowId};
use crate::sys::geometry::{Point, Rect, Size};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DragMode {
    Move,
    Resize,
    /// Resize while keeping the aspect ratio the window had when the drag began.
    #[strum(serialize = "resize_keep_ratio", serialize = "keep_ratio")]
    ResizeKeepRatio,
}

impl DragMode {
    pub fn is_resize(self) -> bool { !matches!(self, DragMode::Move) }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveDrag {
    pub window: WindowId,
    pub mode: DragMode,
    pub corner: ResizeCorner,
    pub origin_cursor: Point,
    pub origin_box: Rect,
    /// The window was tiled and floats only until the drag ends.
    pub dragging_tiled: bool,
    /// Tiled resizes consume the cursor movement since the previous applied tick.
    last_cursor: Point,
    last_update: Option<Instant>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

impl DragState {
    pub fn is_active(&self) -> bool { matches!(self, DragState::Dragging(_)) }

    pub fn window(&self) -> Option<WindowId> {
        match self {
            DragState::Idle => None,
            DragState::Dragging(drag) => Some(drag.window),
        }
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match self {
            DragState::Idle => None,
            DragState::Dragging(drag) => Some(drag),
        }
    }

    /// Starts dragging `window` from the current cursor position. A tiled window
    /// dragged in move mode leaves the layout and floats until the drag ends.
    pub fn begin<S: LayoutSystem>(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        system: &mut S,
        window: WindowId,
        mode: DragMode,
    ) -> Result<(), LayoutError> {
        if self.is_active() {
            return Err(LayoutError::DragInProgress);
        }
        let Some(w) = ctx.windows.get(window) else {
            return Err(LayoutError::InvalidDragTarget(window));
        };
        if !drag_allowed(w) {
            debug!(?window, "refusing to drag an unmapped, hidden or fullscreen window");
            return Err(LayoutError::InvalidDragTarget(window));
        }
        let floating = w.floating;
        let workspace = w.workspace;
        let real = w.real;
        if !floating && ctx.monitors.fullscreen_window(workspace).is_some() {
            debug!(?window, "workspace is locked by a fullscreen window");
            return Err(LayoutError::InvalidDragTarget(window));
        }

        let cursor = ctx.input.cursor;
        let corner = match ctx.settings.drag.resize_corner {
            ResizeCorner::None => ResizeCorner::from_cursor_position(cursor, real.mid()),
            configured => configured,
        };

        let dragging_tiled = !floating && mode == DragMode::Move;
        if dragging_tiled {
            system.on_window_removed_tiling(ctx, window);
            if let Some(w) = ctx.windows.get_mut(window) {
                w.floating = true;
            }
            ctx.windows.set_goal_and_real(window, real);
        }

        debug!(?window, ?mode, ?corner, dragging_tiled, "drag started");
        *self = DragState::Dragging(ActiveDrag {
            window,
            mode,
            corner,
            origin_cursor: cursor,
            origin_box: real,
            dragging_tiled,
            last_cursor: cursor,
            last_update: None,
        });
        Ok(())
    }

    /// Applies the cursor movement. Returns whether anything was updated; updates are
    /// limited to one per refresh interval of the window's monitor.
    pub fn mouse_move<S: LayoutSystem>(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        system: &mut S,
        now: Instant,
    ) -> bool {
        let DragState::Dragging(drag) = self else {
            return false;
        };
        let window = drag.window;
        let Some(w) = ctx.windows.get(window) else {
            warn!(?window, "dragged window disappeared");
            *self = DragState::Idle;
            return false;
        };
        if !drag_allowed(w) {
            debug!(?window, "dragged window became invalid, cancelling");
            self.cancel(ctx, system);
            return false;
        }

        let interval = refresh_interval(ctx, w);
        if let Some(last) = drag.last_update {
            if now.saturating_duration_since(last) < interval {
                trace!(?window, "drag update throttled");
                return false;
            }
        }
        drag.last_update = Some(now);

        let cursor = ctx.input.cursor;
        let delta = cursor.delta_from(drag.origin_cursor);
        let floating = w.floating;
        let min = min_drag_size(w);
        let max = w.max_size;

        if !floating {
            let tick = cursor.delta_from(drag.last_cursor);
            drag.last_cursor = cursor;
            if drag.mode.is_resize() {
                system.resize_active_window(ctx, window, tick, drag.corner);
            }
            return true;
        }
        drag.last_cursor = cursor;

        let snap = &ctx.settings.snap;
        let target = match drag.mode {
            DragMode::Move => {
                let moved = drag.origin_box.translate(delta.x, delta.y);
                if snap.enabled {
                    let targets = SnapTargets::collect(ctx, window);
                    targets.snap_move(moved, snap.window_gap, snap.monitor_gap)
                } else {
                    moved
                }
            }
            DragMode::Resize | DragMode::ResizeKeepRatio => {
                let keep_ratio = (drag.mode == DragMode::ResizeKeepRatio)
                    .then(|| aspect_ratio(drag.origin_box))
                    .flatten();
                let mut resized = drag.corner.resize(drag.origin_box, delta, min, max);
                if let Some(ratio) = keep_ratio {
                    resized = with_ratio(resized, ratio, drag.corner, true);
                }
                if snap.enabled {
                    let targets = SnapTargets::collect(ctx, window);
                    targets.snap_resize(
                        resized,
                        drag.corner,
                        keep_ratio,
                        min,
                        snap.window_gap,
                        snap.monitor_gap,
                    )
                } else {
                    resized
                }
            }
        };
        trace!(?window, ?target, "drag update");
        ctx.windows.set_goal_and_real(window, target);
        true
    }

    /// Finishes the drag. A window that was tiled before the drag returns to the
    /// layout, joining the group under the cursor when group rules allow it.
    pub fn end<S: LayoutSystem>(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        system: &mut S,
    ) -> EventResponse {
        let DragState::Dragging(drag) = std::mem::replace(self, DragState::Idle) else {
            return EventResponse::default();
        };
        let window = drag.window;
        if !ctx.windows.contains(window) {
            return EventResponse::default();
        }

        if drag.dragging_tiled {
            retile(ctx, system, window, true);
        } else if let Some(w) = ctx.windows.get_mut(window) {
            if w.floating {
                w.last_floating = Some(w.goal);
            }
        }
        debug!(?window, "drag finished");
        EventResponse::focus(window)
    }

    /// Abandons the drag. A window promoted out of the layout is tiled again.
    pub fn cancel<S: LayoutSystem>(&mut self, ctx: &mut LayoutContext<'_>, system: &mut S) {
        let DragState::Dragging(drag) = std::mem::replace(self, DragState::Idle) else {
            return;
        };
        debug!(window = ?drag.window, "drag cancelled");
        if drag.dragging_tiled && ctx.windows.contains(drag.window) {
            retile(ctx, system, drag.window, false);
        }
    }
}

fn drag_allowed(w: &Window) -> bool { w.mapped && !w.hidden && !w.fullscreen }

fn min_drag_size(w: &Window) -> Size {
    let min = w.min_size.unwrap_or_default();
    Size::new(min.width.max(MIN_WINDOW_SIZE), min.height.max(MIN_WINDOW_SIZE))
}

fn refresh_interval(ctx: &LayoutContext<'_>, w: &Window) -> Duration {
    let rate = ctx
        .monitors
        .monitor(w.monitor)
        .map(|m| m.refresh_rate)
        .filter(|&r| r > 0.0)
        .unwrap_or(ctx.settings.drag.default_refresh_rate);
    if rate > 0.0 {
        Duration::from_secs_f64(1.0 / rate)
    } else {
        Duration::ZERO
    }
}

fn aspect_ratio(rect: Rect) -> Option<f64> {
    (rect.size.width > 0.0 && rect.size.height > 0.0).then(|| rect.size.width / rect.size.height)
}

/// Recomputes one dimension of `rect` from `ratio`, keeping the edges opposite the
/// grabbed corner anchored.
fn with_ratio(rect: Rect, ratio: f64, corner: ResizeCorner, from_width: bool) -> Rect {
    let (width, height) = if from_width {
        (rect.size.width, rect.size.width / ratio)
    } else {
        (rect.size.height * ratio, rect.size.height)
    };
    let x = if corner.affects_left() { rect.max_x() - width } else { rect.min_x() };
    let y = if corner.affects_top() { rect.max_y() - height } else { rect.min_y() };
    Rect::new(x, y, width, height)
}

fn retile<S: LayoutSystem>(
    ctx: &mut LayoutContext<'_>,
    system: &mut S,
    window: WindowId,
    allow_group_merge: bool,
) {
    if let Some(w) = ctx.windows.get_mut(window) {
        w.floating = false;
    }
    let merged = allow_group_merge && merge_into_group_under_cursor(ctx, system, window);
    if !merged {
        system.on_window_created_tiling(ctx, window, None);
    }
    if !ctx.windows.is_floating(window) {
        ctx.notify(LayoutNotification::FloatingChanged { window, floating: false });
    }
}

fn merge_into_group_under_cursor<S: LayoutSystem>(
    ctx: &mut LayoutContext<'_>,
    system: &mut S,
    window: WindowId,
) -> bool {
    if !ctx.settings.groups.merge_on_drag {
        return false;
    }
    let Some(ws) = ctx.workspace_of(window) else {
        return false;
    };
    let cursor = ctx.input.cursor;
    let Some(target) =
        ctx.windows.window_at(cursor, ws, |id, w| id != window && w.group.is_some())
    else {
        return false;
    };
    let Some(gid) = ctx.windows.group_of(target) else {
        return false;
    };
    if !ctx.windows.can_be_grouped_into(window, gid) || !system.is_window_tiled(target) {
        return false;
    }
    let after_current = ctx.settings.groups.insert_after_current;
    let Some(previous) = ctx.windows.insert_into_group(gid, window, after_current) else {
        return false;
    };
    system.replace_window_data(ctx, previous, window);
    debug!(?window, group = ?gid, "dropped window joined group");
    true
}

/// Edges a dragged box may snap to.
struct SnapTargets {
    windows: Vec<Rect>,
    area: Option<Rect>,
}

impl SnapTargets {
    fn collect(ctx: &LayoutContext<'_>, dragged: WindowId) -> Self {
        let Some(ws) = ctx.workspace_of(dragged) else {
            return Self { windows: Vec::new(), area: None };
        };
        let windows = ctx
            .windows
            .on_workspace(ws)
            .filter(|(id, w)| *id != dragged && w.is_visible() && !w.override_redirect)
            .map(|(_, w)| w.real)
            .collect();
        Self { windows, area: ctx.working_area(ws) }
    }

    /// Candidate positions for a leading edge (`start`) and a trailing edge (`end`)
    /// along one axis, each with its tolerance.
    fn edges(
        &self,
        rect: Rect,
        horizontal: bool,
        window_gap: f64,
        monitor_gap: f64,
    ) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for other in &self.windows {
            let overlaps = if horizontal { rect.overlaps_y(other) } else { rect.overlaps_x(other) };
            if !overlaps {
                continue;
            }
            let (lo, hi) = if horizontal {
                (other.min_x(), other.max_x())
            } else {
                (other.min_y(), other.max_y())
            };
            starts.push((hi, window_gap));
            ends.push((lo, window_gap));
        }
        if let Some(area) = self.area {
            let (lo, hi) =
                if horizontal { (area.min_x(), area.max_x()) } else { (area.min_y(), area.max_y()) };
            starts.push((lo, monitor_gap));
            ends.push((hi, monitor_gap));
        }
        (starts, ends)
    }

    fn snap_move(&self, rect: Rect, window_gap: f64, monitor_gap: f64) -> Rect {
        let mut out = rect;
        for horizontal in [true, false] {
            let (start, len) = if horizontal {
                (rect.min_x(), rect.size.width)
            } else {
                (rect.min_y(), rect.size.height)
            };
            let (starts, ends) = self.edges(rect, horizontal, window_gap, monitor_gap);
            let candidates = starts
                .into_iter()
                .chain(ends.into_iter().map(|(edge, tol)| (edge - len, tol)));
            if let Some(snapped) = nearest(start, candidates) {
                if horizontal {
                    out.origin.x = snapped;
                } else {
                    out.origin.y = snapped;
                }
            }
        }
        out
    }

    fn snap_resize(
        &self,
        rect: Rect,
        corner: ResizeCorner,
        keep_ratio: Option<f64>,
        min: Size,
        window_gap: f64,
        monitor_gap: f64,
    ) -> Rect {
        let (mut x0, mut y0, mut x1, mut y1) = (rect.min_x(), rect.min_y(), rect.max_x(), rect.max_y());
        let (starts, ends) = self.edges(rect, true, window_gap, monitor_gap);
        let (edge, candidates) = if corner.affects_left() { (&mut x0, starts) } else { (&mut x1, ends) };
        let hit_x = nearest(*edge, candidates);
        if let Some(v) = hit_x {
            *edge = v;
        }
        let (starts, ends) = self.edges(rect, false, window_gap, monitor_gap);
        let (edge, candidates) = if corner.affects_top() { (&mut y0, starts) } else { (&mut y1, ends) };
        let hit_y = nearest(*edge, candidates);
        if let Some(v) = hit_y {
            *edge = v;
        }

        let mut out = Rect::new(x0, y0, (x1 - x0).max(min.width), (y1 - y0).max(min.height));
        if corner.affects_left() {
            out.origin.x = x1 - out.size.width;
        }
        if corner.affects_top() {
            out.origin.y = y1 - out.size.height;
        }
        if let Some(ratio) = keep_ratio {
            if hit_x.is_some() {
                out = with_ratio(out, ratio, corner, true);
            } else if hit_y.is_some() {
                out = with_ratio(out, ratio, corner, false);
            }
        }
        out
    }
}

/// The candidate closest to `value` within its tolerance.
fn nearest(value: f64, candidates: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
    candidates
        .into_iter()
        .filter(|&(edge, tolerance)| (edge - value).abs() <= tolerance)
        .min_by(|a, b| (a.0 - value).abs().total_cmp(&(b.0 - value).abs()))
        .map(|(edge, _)| edge)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::DwindleLayout;
    use crate::layout_engine::systems::test_support::Fixture;

    fn tiled_pair(fx: &mut Fixture, layout: &mut DwindleLayout) -> (WindowId, WindowId) {
        fx.cursor(999.0, 599.0);
        let a = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), a, None);
        fx.input.focused = Some(a);
        let b = fx.window();
        layout.on_window_created_tiling(&mut fx.ctx(), b, None);
        fx.windows.warp_all();
        (a, b)
    }

    fn floating(fx: &mut Fixture, rect: Rect) -> WindowId {
        let w = fx.windows.add(Window::new(fx.ws, fx.mon).floating());
        fx.windows.set_goal_and_real(w, rect);
        w
    }

    #[test]
    fn second_drag_is_rejected() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let a = floating(&mut fx, Rect::new(10.0, 10.0, 100.0, 100.0));
        let b = floating(&mut fx, Rect::new(200.0, 10.0, 100.0, 100.0));
        let mut drag = DragState::default();

        drag.begin(&mut fx.ctx(), &mut layout, a, DragMode::Move).unwrap();
        assert_eq!(
            drag.begin(&mut fx.ctx(), &mut layout, b, DragMode::Move),
            Err(LayoutError::DragInProgress)
        );
        assert_eq!(drag.window(), Some(a));
    }

    #[test]
    fn hidden_and_fullscreen_locked_windows_cannot_be_dragged() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let (a, b) = tiled_pair(&mut fx, &mut layout);
        let mut drag = DragState::default();

        fx.windows.get_mut(a).unwrap().hidden = true;
        assert_eq!(
            drag.begin(&mut fx.ctx(), &mut layout, a, DragMode::Move),
            Err(LayoutError::InvalidDragTarget(a))
        );

        fx.monitors.workspace_mut(fx.ws).unwrap().fullscreen = Some(a);
        assert_eq!(
            drag.begin(&mut fx.ctx(), &mut layout, b, DragMode::Resize),
            Err(LayoutError::InvalidDragTarget(b))
        );
        assert!(!drag.is_active());
    }

    #[test]
    fn moving_a_tiled_window_floats_it_and_drops_it_back_into_the_layout() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let (a, b) = tiled_pair(&mut fx, &mut layout);
        let mut drag = DragState::default();
        let t0 = Instant::now();

        fx.cursor(250.0, 300.0);
        drag.begin(&mut fx.ctx(), &mut layout, a, DragMode::Move).unwrap();
        assert!(drag.active().unwrap().dragging_tiled);
        assert!(!layout.is_window_tiled(a));
        assert!(fx.windows.is_floating(a));
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));

        fx.cursor(300.0, 320.0);
        assert!(drag.mouse_move(&mut fx.ctx(), &mut layout, t0));
        assert_eq!(fx.goal(a), Rect::new(50.0, 20.0, 500.0, 600.0));

        fx.cursor(900.0, 300.0);
        let response = drag.end(&mut fx.ctx(), &mut layout);
        assert_eq!(response.focus_window, Some(a));
        assert!(!drag.is_active());
        assert!(layout.is_window_tiled(a));
        assert!(!fx.windows.is_floating(a));
        assert_eq!(fx.goal(a), Rect::new(500.0, 0.0, 500.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 500.0, 600.0));
    }

    #[test]
    fn updates_are_limited_to_the_refresh_interval() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let w = floating(&mut fx, Rect::new(100.0, 100.0, 200.0, 200.0));
        let mut drag = DragState::default();
        let t0 = Instant::now();

        fx.cursor(150.0, 150.0);
        drag.begin(&mut fx.ctx(), &mut layout, w, DragMode::Move).unwrap();
        fx.cursor(160.0, 150.0);
        assert!(drag.mouse_move(&mut fx.ctx(), &mut layout, t0));
        fx.cursor(170.0, 150.0);
        assert!(!drag.mouse_move(&mut fx.ctx(), &mut layout, t0 + Duration::from_millis(5)));
        assert_eq!(fx.goal(w).origin.x, 110.0);
        assert!(drag.mouse_move(&mut fx.ctx(), &mut layout, t0 + Duration::from_millis(20)));
        assert_eq!(fx.goal(w).origin.x, 120.0);
    }

    #[test]
    fn floating_move_snaps_to_neighbour_and_monitor_edges() {
        let mut fx = Fixture::new();
        fx.settings.snap.enabled = true;
        fx.settings.snap.window_gap = 10.0;
        fx.settings.snap.monitor_gap = 10.0;
        let mut layout = DwindleLayout::default();
        let _other = floating(&mut fx, Rect::new(400.0, 100.0, 200.0, 200.0));
        let w = floating(&mut fx, Rect::new(100.0, 150.0, 200.0, 100.0));
        let mut drag = DragState::default();

        fx.cursor(200.0, 200.0);
        drag.begin(&mut fx.ctx(), &mut layout, w, DragMode::Move).unwrap();
        // right edge lands 5px short of the neighbour, top edge 7px below the monitor
        fx.cursor(295.0, 57.0);
        drag.mouse_move(&mut fx.ctx(), &mut layout, Instant::now());
        assert_eq!(fx.goal(w), Rect::new(200.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn keep_ratio_resize_follows_the_width() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let w = floating(&mut fx, Rect::new(100.0, 100.0, 200.0, 100.0));
        let mut drag = DragState::default();

        fx.cursor(290.0, 190.0);
        drag.begin(&mut fx.ctx(), &mut layout, w, DragMode::ResizeKeepRatio).unwrap();
        assert_eq!(drag.active().unwrap().corner, ResizeCorner::BottomRight);
        fx.cursor(390.0, 195.0);
        drag.mouse_move(&mut fx.ctx(), &mut layout, Instant::now());
        assert_eq!(fx.goal(w), Rect::new(100.0, 100.0, 300.0, 150.0));

        drag.end(&mut fx.ctx(), &mut layout);
        assert_eq!(
            fx.windows.get(w).unwrap().last_floating,
            Some(Rect::new(100.0, 100.0, 300.0, 150.0))
        );
    }

    #[test]
    fn floating_resize_snaps_the_grabbed_edges_to_the_monitor() {
        let mut fx = Fixture::new();
        fx.settings.snap.enabled = true;
        fx.settings.snap.window_gap = 10.0;
        fx.settings.snap.monitor_gap = 10.0;
        let mut layout = DwindleLayout::default();
        let w = floating(&mut fx, Rect::new(700.0, 400.0, 200.0, 100.0));
        let mut drag = DragState::default();

        fx.cursor(890.0, 490.0);
        drag.begin(&mut fx.ctx(), &mut layout, w, DragMode::Resize).unwrap();
        assert_eq!(drag.active().unwrap().corner, ResizeCorner::BottomRight);
        // grabbed edges stop 6px and 4px short of the monitor
        fx.cursor(984.0, 586.0);
        drag.mouse_move(&mut fx.ctx(), &mut layout, Instant::now());
        assert_eq!(fx.goal(w), Rect::new(700.0, 400.0, 300.0, 200.0));
    }

    #[test]
    fn keep_ratio_resize_snapped_to_a_neighbour_recomputes_the_height() {
        let mut fx = Fixture::new();
        fx.settings.snap.enabled = true;
        fx.settings.snap.window_gap = 10.0;
        fx.settings.snap.monitor_gap = 10.0;
        let mut layout = DwindleLayout::default();
        let _other = floating(&mut fx, Rect::new(400.0, 100.0, 200.0, 200.0));
        let w = floating(&mut fx, Rect::new(100.0, 100.0, 200.0, 100.0));
        let mut drag = DragState::default();

        fx.cursor(290.0, 190.0);
        drag.begin(&mut fx.ctx(), &mut layout, w, DragMode::ResizeKeepRatio).unwrap();
        // 294x147 before snapping, the right edge then lands on the neighbour
        fx.cursor(384.0, 190.0);
        drag.mouse_move(&mut fx.ctx(), &mut layout, Instant::now());
        assert_eq!(fx.goal(w), Rect::new(100.0, 100.0, 300.0, 150.0));
    }

    #[test]
    fn resizing_a_tiled_window_moves_the_shared_boundary() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let (a, b) = tiled_pair(&mut fx, &mut layout);
        let mut drag = DragState::default();
        let t0 = Instant::now();

        fx.cursor(450.0, 500.0);
        drag.begin(&mut fx.ctx(), &mut layout, a, DragMode::Resize).unwrap();
        assert!(!drag.active().unwrap().dragging_tiled);
        fx.cursor(470.0, 500.0);
        drag.mouse_move(&mut fx.ctx(), &mut layout, t0);
        fx.cursor(490.0, 500.0);
        drag.mouse_move(&mut fx.ctx(), &mut layout, t0 + Duration::from_millis(20));

        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 540.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(540.0, 0.0, 460.0, 600.0));
        assert!(layout.is_window_tiled(a));
    }

    #[test]
    fn invalidated_window_cancels_the_drag_and_is_retiled() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let (a, _b) = tiled_pair(&mut fx, &mut layout);
        let mut drag = DragState::default();

        fx.cursor(250.0, 300.0);
        drag.begin(&mut fx.ctx(), &mut layout, a, DragMode::Move).unwrap();
        fx.windows.get_mut(a).unwrap().mapped = false;
        fx.cursor(260.0, 300.0);
        assert!(!drag.mouse_move(&mut fx.ctx(), &mut layout, Instant::now()));
        assert_eq!(drag, DragState::Idle);
        assert!(layout.is_window_tiled(a));
        assert!(!fx.windows.is_floating(a));
    }

    #[test]
    fn dropping_onto_a_group_joins_it() {
        let mut fx = Fixture::new();
        let mut layout = DwindleLayout::default();
        let (a, b) = tiled_pair(&mut fx, &mut layout);
        fx.windows.create_group(b);
        let mut drag = DragState::default();

        fx.cursor(250.0, 300.0);
        drag.begin(&mut fx.ctx(), &mut layout, a, DragMode::Move).unwrap();
        fx.windows.warp_all();
        fx.cursor(700.0, 300.0);
        drag.end(&mut fx.ctx(), &mut layout);

        assert_eq!(fx.windows.group_members(b), vec![b, a]);
        assert_eq!(fx.windows.group_current(b), Some(a));
        assert!(fx.windows.get(b).unwrap().hidden);
        assert!(layout.is_window_tiled(a));
        assert!(!layout.is_window_tiled(b));
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 600.0));
    }
}
