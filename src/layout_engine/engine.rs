use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::common::config::LayoutMode;
use crate::layout_engine::drag::{DragMode, DragState};
use crate::layout_engine::systems::{LayoutSystemKind, floating_geometry, focal_point};
use crate::layout_engine::utils::MIN_WINDOW_SIZE;
use crate::layout_engine::{
    Direction, DwindleLayout, EventResponse, LayoutContext, LayoutError, LayoutMessage,
    LayoutNotification, LayoutSystem, MasterStackLayout, RatioChange, ResizeCorner,
};
use crate::model::{FullscreenMode, MonitorId, WindowId, WorkspaceId};
use crate::sys::geometry::{Point, Rect, Size};

/// Entry point for everything that changes window placement. Routes tiled windows to the
/// active layout and handles floating, fullscreen, grouping and drags itself.
#[derive(Serialize, Deserialize, Debug)]
pub struct LayoutEngine {
    system: LayoutSystemKind,
    #[serde(skip)]
    drag: DragState,
    last_tiled_window: Option<WindowId>,
}

fn make_system(mode: LayoutMode) -> LayoutSystemKind {
    match mode {
        LayoutMode::Dwindle => DwindleLayout::default().into(),
        LayoutMode::Master => MasterStackLayout::default().into(),
    }
}

impl LayoutEngine {
    pub fn new(mode: LayoutMode) -> Self {
        Self {
            system: make_system(mode),
            drag: DragState::Idle,
            last_tiled_window: None,
        }
    }

    pub fn mode(&self) -> LayoutMode {
        match self.system {
            LayoutSystemKind::Dwindle(_) => LayoutMode::Dwindle,
            LayoutSystemKind::MasterStack(_) => LayoutMode::Master,
        }
    }

    pub fn system(&self) -> &LayoutSystemKind { &self.system }

    pub fn drag_state(&self) -> &DragState { &self.drag }

    pub fn is_window_tiled(&self, window: WindowId) -> bool { self.system.is_window_tiled(window) }

    pub fn tiled_windows(&self, ws: WorkspaceId) -> Vec<WindowId> { self.system.tiled_windows(ws) }

    /// The window holding the layout slot for `window`: itself, or the visible member of
    /// its group.
    fn slot_of(&self, ctx: &LayoutContext<'_>, window: WindowId) -> Option<WindowId> {
        if self.system.is_window_tiled(window) {
            return Some(window);
        }
        ctx.windows.group_current(window).filter(|&c| self.system.is_window_tiled(c))
    }

    fn with_groups_locked<R>(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        f: impl FnOnce(&mut Self, &mut LayoutContext<'_>) -> R,
    ) -> R {
        let previous = std::mem::replace(&mut ctx.windows.groups_locked, true);
        let out = f(self, ctx);
        ctx.windows.groups_locked = previous;
        out
    }

    pub fn on_window_created(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Option<Direction>,
    ) -> EventResponse {
        let Some(w) = ctx.windows.get(window) else {
            warn!(?window, "created window is not in the registry");
            return EventResponse::default();
        };
        if w.floating {
            if let Some(rect) = floating_geometry(ctx, window) {
                ctx.windows.set_goal(window, rect);
            }
            return EventResponse::focus(window);
        }
        if self.auto_group(ctx, window) {
            return EventResponse::focus(window);
        }
        self.system.on_window_created_tiling(ctx, window, direction);
        EventResponse::focus(window)
    }

    /// Joins the focused window's group when it has one and policy allows it.
    fn auto_group(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) -> bool {
        if !ctx.settings.groups.auto_group {
            return false;
        }
        let Some(focused) = ctx.input.focused.filter(|&f| f != window) else {
            return false;
        };
        let Some(gid) = ctx.windows.group_of(focused) else {
            return false;
        };
        let same_workspace = ctx.workspace_of(focused) == ctx.workspace_of(window);
        if !same_workspace || !ctx.windows.can_be_grouped_into(window, gid) {
            return false;
        }
        let after_current = ctx.settings.groups.insert_after_current;
        let previous = ctx.windows.insert_into_group(gid, window, after_current);
        if let Some(previous) = previous {
            if self.system.is_window_tiled(previous) {
                self.system.replace_window_data(ctx, previous, window);
            }
        }
        debug!(?window, group = ?gid, "auto-grouped new window");
        true
    }

    /// Must be called while the window is still in the registry.
    pub fn on_window_removed(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
    ) -> EventResponse {
        let Some(w) = ctx.windows.get(window) else {
            warn!(?window, "removed window is not in the registry");
            return EventResponse::default();
        };
        let ws = w.workspace;
        let center = w.goal.mid();
        let floating = w.floating;

        if self.drag.window() == Some(window) {
            debug!(?window, "dragged window removed, dropping drag");
            self.drag = DragState::Idle;
        }
        if w.fullscreen {
            self.clear_fullscreen(ctx, window);
        }

        if ctx.windows.is_grouped(window) {
            self.detach_from_group(ctx, window);
        } else if self.system.is_window_tiled(window) {
            self.system.on_window_removed_tiling(ctx, window);
        }
        if self.last_tiled_window == Some(window) {
            self.last_tiled_window = None;
        }

        if ctx.input.focused != Some(window) {
            return EventResponse::default();
        }
        match self.next_window_candidate(ctx, window, ws, center, floating) {
            Some(next) => EventResponse::focus(next),
            None => EventResponse::default(),
        }
    }

    /// Takes `window` out of its group, handing its layout slot to the member shown next.
    fn detach_from_group(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        let held_slot = self.system.is_window_tiled(window);
        let next = ctx.windows.remove_from_group(window);
        match (held_slot, next) {
            (true, Some(next)) => self.system.replace_window_data(ctx, window, next),
            // last member: the group is gone and so is the slot
            (true, None) => self.system.on_window_removed_tiling(ctx, window),
            (false, _) => {}
        }
    }

    pub fn get_next_window_candidate(
        &self,
        ctx: &LayoutContext<'_>,
        window: WindowId,
    ) -> Option<WindowId> {
        let w = ctx.windows.get(window)?;
        self.next_window_candidate(ctx, window, w.workspace, w.goal.mid(), w.floating)
    }

    fn next_window_candidate(
        &self,
        ctx: &LayoutContext<'_>,
        window: WindowId,
        ws: WorkspaceId,
        center: Point,
        floating: bool,
    ) -> Option<WindowId> {
        if let Some(fs) = ctx.monitors.fullscreen_window(ws).filter(|&f| f != window) {
            return Some(fs);
        }
        if floating {
            let under = ctx
                .windows
                .window_at(center, ws, |id, w| id != window && w.floating);
            if under.is_some() {
                return under;
            }
        }
        let last_tiled = self.last_tiled_window.filter(|&l| {
            l != window && ctx.windows.get(l).is_some_and(|w| w.workspace == ws && w.is_tiled())
        });
        if last_tiled.is_some() {
            return last_tiled;
        }
        let under = ctx.windows.window_at(center, ws, |id, _| id != window);
        if under.is_some() {
            return under;
        }
        ctx.windows
            .on_workspace(ws)
            .find(|(id, w)| *id != window && w.floating && w.is_visible())
            .map(|(id, _)| id)
    }

    pub fn on_window_focused(&mut self, ctx: &LayoutContext<'_>, window: WindowId) {
        if self.slot_of(ctx, window).is_some() {
            self.last_tiled_window = Some(window);
        }
    }

    /// Toggles between tiled and floating.
    pub fn change_window_floating_mode(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
    ) -> EventResponse {
        let Some(w) = ctx.windows.get(window) else {
            warn!(?window, "cannot toggle floating on an unknown window");
            return EventResponse::default();
        };
        if w.fullscreen {
            self.clear_fullscreen(ctx, window);
        }
        let Some(w) = ctx.windows.get(window) else {
            return EventResponse::default();
        };
        let to_floating = !w.floating;
        let goal = w.goal;
        let real = w.real;
        let last_floating = w.last_floating;
        let mut members = ctx.windows.group_members(window);
        if members.is_empty() {
            members.push(window);
        }

        if to_floating {
            if self.system.is_window_tiled(window) {
                self.system.on_window_removed_tiling(ctx, window);
            }
            for &m in &members {
                if let Some(mw) = ctx.windows.get_mut(m) {
                    mw.floating = true;
                }
            }
            let target = last_floating.or_else(|| floating_geometry(ctx, window));
            if let Some(rect) = target {
                for &m in &members {
                    ctx.windows.set_goal(m, rect);
                }
            }
        } else {
            for &m in &members {
                if let Some(mw) = ctx.windows.get_mut(m) {
                    mw.floating = false;
                    mw.last_floating = Some(goal);
                }
            }
            // keep the window out of hit tests while the layout looks for a target
            if let Some(mw) = ctx.windows.get_mut(window) {
                mw.real = Rect::from_parts(Point::new(-1.0e6, -1.0e6), real.size);
            }
            self.system.on_window_created_tiling(ctx, window, None);
            if let Some(mw) = ctx.windows.get_mut(window) {
                mw.real = real;
            }
        }

        let floating = ctx.windows.is_floating(window);
        debug!(?window, floating, "floating mode changed");
        ctx.notify(LayoutNotification::FloatingChanged { window, floating });
        EventResponse::focus(window)
    }

    /// Enters or leaves fullscreen. At most one window per workspace is fullscreen;
    /// requesting it for another window releases the previous one.
    pub fn set_fullscreen(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        on: bool,
        mode: FullscreenMode,
    ) -> EventResponse {
        let Some(w) = ctx.windows.get(window) else {
            warn!(?window, "cannot fullscreen an unknown window");
            return EventResponse::default();
        };
        let (ws, floating, goal, fullscreen) = (w.workspace, w.floating, w.goal, w.fullscreen);
        let current_mode = ctx.monitors.workspace(ws).map(|record| record.fullscreen_mode);
        if fullscreen == on && (!on || current_mode == Some(mode)) {
            return EventResponse::default();
        }

        if !on {
            self.clear_fullscreen(ctx, window);
            self.system.recalculate_workspace(ctx, ws);
            return EventResponse::default();
        }

        if let Some(other) = ctx.monitors.fullscreen_window(ws).filter(|&o| o != window) {
            self.clear_fullscreen(ctx, other);
        }
        if let Some(w) = ctx.windows.get_mut(window) {
            w.fullscreen = true;
            if floating && w.pre_fullscreen.is_none() {
                w.pre_fullscreen = Some(goal);
            }
        }
        if let Some(record) = ctx.monitors.workspace_mut(ws) {
            record.fullscreen = Some(window);
            record.fullscreen_mode = mode;
        }
        if floating || self.slot_of(ctx, window).is_none() {
            if let Some(rect) = ctx.fullscreen_box(window) {
                ctx.windows.set_goal(window, rect);
            }
        }
        self.system.recalculate_workspace(ctx, ws);
        debug!(?window, ?mode, "entered fullscreen");
        ctx.notify(LayoutNotification::FullscreenChanged { window, fullscreen: true });
        EventResponse::focus(window)
    }

    fn clear_fullscreen(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        let Some(w) = ctx.windows.get_mut(window) else {
            return;
        };
        if !w.fullscreen {
            return;
        }
        w.fullscreen = false;
        let ws = w.workspace;
        let restore = if w.floating { w.pre_fullscreen.take().or(w.last_floating) } else { None };
        if let Some(record) = ctx.monitors.workspace_mut(ws) {
            if record.fullscreen == Some(window) {
                record.fullscreen = None;
            }
        }
        if let Some(rect) = restore {
            ctx.windows.set_goal(window, rect);
        }
        if let Some(slot) = self.slot_of(ctx, window) {
            self.system.recalculate_window(ctx, slot);
        }
        debug!(?window, "left fullscreen");
        ctx.notify(LayoutNotification::FullscreenChanged { window, fullscreen: false });
    }

    /// Recalculates the workspaces `monitor` shows, after its geometry or reserved
    /// areas changed.
    pub fn recalculate_monitor(&mut self, ctx: &mut LayoutContext<'_>, monitor: MonitorId) {
        for ws in ctx.monitors.visible_workspaces(monitor) {
            trace!(?monitor, ?ws, "recalculating workspace");
            self.system.recalculate_workspace(ctx, ws);
            let fullscreen = ctx.monitors.fullscreen_window(ws);
            if let Some(fs) = fullscreen.filter(|&f| ctx.windows.is_floating(f)) {
                if let Some(rect) = ctx.fullscreen_box(fs) {
                    ctx.windows.set_goal(fs, rect);
                }
            }
        }
    }

    pub fn recalculate_workspace(&mut self, ctx: &mut LayoutContext<'_>, ws: WorkspaceId) {
        self.system.recalculate_workspace(ctx, ws);
    }

    pub fn recalculate_window(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) {
        if let Some(slot) = self.slot_of(ctx, window) {
            self.system.recalculate_window(ctx, slot);
            return;
        }
        let fullscreen = ctx.windows.get(window).is_some_and(|w| w.fullscreen);
        if fullscreen {
            if let Some(rect) = ctx.fullscreen_box(window) {
                ctx.windows.set_goal(window, rect);
            }
        }
    }

    /// Keyboard or programmatic resize. Floating windows are resized directly.
    pub fn resize_active_window(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        delta: Point,
        corner: ResizeCorner,
    ) {
        if let Some(slot) = self.slot_of(ctx, window) {
            self.system.resize_active_window(ctx, slot, delta, corner);
            return;
        }
        let Some(w) = ctx.windows.get(window) else {
            warn!(?window, "cannot resize an unknown window");
            return;
        };
        if !w.floating {
            debug!(?window, "window has no layout slot to resize");
            return;
        }
        let min = w.min_size.unwrap_or_default();
        let min = Size::new(min.width.max(MIN_WINDOW_SIZE), min.height.max(MIN_WINDOW_SIZE));
        let rect = corner.resize(w.goal, delta, min, w.max_size);
        ctx.windows.set_goal(window, rect);
        if let Some(w) = ctx.windows.get_mut(window) {
            w.last_floating = Some(rect);
        }
    }

    pub fn alter_split_ratio(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        change: RatioChange,
    ) {
        match self.slot_of(ctx, window) {
            Some(slot) => self.system.alter_split_ratio(ctx, slot, change),
            None => debug!(?window, "split ratio change on an untiled window"),
        }
    }

    pub fn move_window_in_direction(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Direction,
    ) {
        match self.slot_of(ctx, window) {
            Some(slot) => self.system.move_window_to(ctx, slot, direction),
            None => debug!(?window, ?direction, "only tiled windows move between slots"),
        }
    }

    pub fn switch_windows(&mut self, ctx: &mut LayoutContext<'_>, a: WindowId, b: WindowId) {
        let (Some(sa), Some(sb)) = (self.slot_of(ctx, a), self.slot_of(ctx, b)) else {
            debug!(?a, ?b, "switch needs two tiled windows");
            return;
        };
        self.system.switch_windows(ctx, sa, sb);
    }

    pub fn replace_window_data(&mut self, ctx: &mut LayoutContext<'_>, from: WindowId, to: WindowId) {
        self.system.replace_window_data(ctx, from, to);
    }

    /// Parses and dispatches a layout verb. `window` defaults to the focused window.
    pub fn layout_message(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: Option<WindowId>,
        message: &str,
    ) -> Result<EventResponse, LayoutError> {
        let message: LayoutMessage = message.parse()?;
        let target = window.or(ctx.input.focused).and_then(|w| self.slot_of(ctx, w));
        let focus = self.system.layout_message(ctx, target, message)?;
        Ok(focus.map(EventResponse::focus).unwrap_or_default())
    }

    /// Moves every tiled window into a fresh layout of the requested kind.
    pub fn set_layout_mode(&mut self, ctx: &mut LayoutContext<'_>, mode: LayoutMode) {
        if self.mode() == mode {
            return;
        }
        let workspaces: Vec<WorkspaceId> = ctx.monitors.workspaces().map(|(id, _)| id).collect();
        let tiled: Vec<WindowId> =
            workspaces.into_iter().flat_map(|ws| self.system.tiled_windows(ws)).collect();
        debug!(?mode, windows = tiled.len(), "switching layout");
        self.system = make_system(mode);
        self.with_groups_locked(ctx, |engine, ctx| {
            for window in tiled {
                engine.system.on_window_created_tiling(ctx, window, None);
            }
        });
    }

    pub fn draw_tree(&self, ws: WorkspaceId) -> String { self.system.draw_tree(ws) }

    /// Creates a group around `window`, or dissolves its group. Members of a dissolved
    /// group are tiled again one by one without merging back.
    pub fn toggle_group(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId) -> EventResponse {
        let Some(gid) = ctx.windows.group_of(window) else {
            if ctx.windows.create_group(window).is_some() {
                ctx.notify(LayoutNotification::GroupToggled { window, grouped: true });
            }
            return EventResponse::focus(window);
        };
        let holder = ctx.windows.group_current(window);
        let holder_tiled = holder.is_some_and(|h| self.system.is_window_tiled(h));
        let holder_goal = holder.and_then(|h| ctx.windows.get(h)).map(|w| w.goal);
        let members = ctx.windows.destroy_group(gid);
        self.with_groups_locked(ctx, |engine, ctx| {
            for m in members.into_iter().filter(|&m| Some(m) != holder) {
                if holder_tiled {
                    if let Some(w) = ctx.windows.get_mut(m) {
                        w.floating = false;
                    }
                    engine.system.on_window_created_tiling(ctx, m, None);
                } else if let Some(rect) = holder_goal {
                    ctx.windows.set_goal(m, rect);
                }
            }
        });
        ctx.notify(LayoutNotification::GroupToggled { window, grouped: false });
        EventResponse::focus(window)
    }

    /// Shows `target` in place of its group's visible member.
    pub fn set_group_current(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        target: WindowId,
    ) -> EventResponse {
        let Some(old) = ctx.windows.group_current(target) else {
            return EventResponse::default();
        };
        if old == target {
            return EventResponse::default();
        }
        let held_slot = self.system.is_window_tiled(old);
        if ctx.windows.set_group_current(target).is_none() {
            return EventResponse::default();
        }
        if held_slot {
            self.system.replace_window_data(ctx, old, target);
        }
        if self.last_tiled_window == Some(old) {
            self.last_tiled_window = Some(target);
        }
        if ctx.input.focused == Some(old) {
            EventResponse::focus(target)
        } else {
            EventResponse::default()
        }
    }

    pub fn change_group_active(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        forward: bool,
    ) -> EventResponse {
        match ctx.windows.rotated_group_member(window, forward) {
            Some(next) => self.set_group_current(ctx, next),
            None => EventResponse::default(),
        }
    }

    /// Window whose box lies just past `window`'s edge in `direction`.
    fn window_in_direction(
        ctx: &LayoutContext<'_>,
        window: WindowId,
        direction: Direction,
    ) -> Option<WindowId> {
        let w = ctx.windows.get(window)?;
        let point = focal_point(w.goal, direction);
        ctx.windows
            .on_workspace(w.workspace)
            .find(|(id, other)| *id != window && other.is_visible() && other.goal.contains(point))
            .map(|(id, _)| id)
    }

    /// Moves `window` into the group next to it in `direction`.
    pub fn move_into_group(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Direction,
    ) -> EventResponse {
        let Some(target) = Self::window_in_direction(ctx, window, direction) else {
            debug!(?window, ?direction, "no window in that direction");
            return EventResponse::default();
        };
        let Some(gid) = ctx.windows.group_of(target) else {
            return EventResponse::default();
        };
        if !ctx.windows.can_be_grouped_into(window, gid) {
            debug!(?window, group = ?gid, "group refuses the window");
            return EventResponse::default();
        }
        if ctx.windows.is_grouped(window) {
            self.detach_from_group(ctx, window);
        } else if self.system.is_window_tiled(window) {
            self.system.on_window_removed_tiling(ctx, window);
        }
        let after_current = ctx.settings.groups.insert_after_current;
        if let Some(previous) = ctx.windows.insert_into_group(gid, window, after_current) {
            if self.system.is_window_tiled(previous) {
                self.system.replace_window_data(ctx, previous, window);
            }
        }
        EventResponse::focus(window)
    }

    /// Takes `window` out of its group and tiles it on its own.
    pub fn move_out_of_group(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
    ) -> EventResponse {
        let Some(gid) = ctx.windows.group_of(window) else {
            return EventResponse::default();
        };
        if ctx.windows.group(gid).is_some_and(|g| g.len() < 2) {
            return self.toggle_group(ctx, window);
        }
        let was_floating = ctx.windows.is_floating(window);
        self.detach_from_group(ctx, window);
        if !was_floating {
            self.with_groups_locked(ctx, |engine, ctx| {
                engine.system.on_window_created_tiling(ctx, window, None);
            });
        }
        EventResponse::focus(window)
    }

    /// Sets or toggles the lock on `window`'s group.
    pub fn lock_group(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId, lock: Option<bool>) {
        let Some(gid) = ctx.windows.group_of(window) else {
            return;
        };
        if let Some(group) = ctx.windows.group_mut(gid) {
            group.locked = lock.unwrap_or(!group.locked);
            debug!(?window, locked = group.locked, "group lock changed");
        }
    }

    pub fn set_groups_locked(&mut self, ctx: &mut LayoutContext<'_>, locked: Option<bool>) {
        let locked = locked.unwrap_or(!ctx.windows.groups_locked);
        ctx.windows.groups_locked = locked;
    }

    pub fn begin_drag(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        mode: DragMode,
    ) -> Result<(), LayoutError> {
        self.drag.begin(ctx, &mut self.system, window, mode)
    }

    pub fn mouse_move(&mut self, ctx: &mut LayoutContext<'_>, now: Instant) -> bool {
        self.drag.mouse_move(ctx, &mut self.system, now)
    }

    pub fn end_drag(&mut self, ctx: &mut LayoutContext<'_>) -> EventResponse {
        self.drag.end(ctx, &mut self.system)
    }

    pub fn cancel_drag(&mut self, ctx: &mut LayoutContext<'_>) {
        self.drag.cancel(ctx, &mut self.system);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::systems::test_support::Fixture;
    use crate::model::Window;
    use crate::sys::geometry::Insets;

    fn open(fx: &mut Fixture, engine: &mut LayoutEngine) -> WindowId {
        fx.cursor(999.0, 599.0);
        let w = fx.window();
        let response = engine.on_window_created(&mut fx.ctx(), w, None);
        fx.input.focused = response.focus_window;
        w
    }

    fn pair(fx: &mut Fixture, engine: &mut LayoutEngine) -> (WindowId, WindowId) {
        let a = open(fx, engine);
        let b = open(fx, engine);
        (a, b)
    }

    #[test]
    fn group_current_swaps_visibility_and_geometry() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);

        let _ = engine.toggle_group(&mut fx.ctx(), a);
        let _ = engine.move_into_group(&mut fx.ctx(), b, Direction::Left);
        assert_eq!(fx.windows.group_members(a), vec![a, b]);
        assert_eq!(engine.tiled_windows(fx.ws), vec![b]);

        let _ = engine.set_group_current(&mut fx.ctx(), a);
        fx.windows.warp_all();
        let _ = engine.set_group_current(&mut fx.ctx(), b);

        let (wa, wb) = (fx.windows.get(a).unwrap(), fx.windows.get(b).unwrap());
        assert!(wa.hidden);
        assert!(!wb.hidden);
        assert_eq!(wb.real, Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert!(fx.windows.is_group_head(a));
        assert_eq!(fx.windows.next_in_group(b), Some(a));
        assert_eq!(fx.windows.next_in_group(a), Some(b));
    }

    #[test]
    fn maximized_fullscreen_round_trip_restores_the_tiled_box() {
        let mut fx = Fixture::new();
        fx.settings.layout.gaps.outer.top = 10.0;
        fx.settings.layout.gaps.outer.left = 10.0;
        fx.settings.layout.gaps.outer.bottom = 10.0;
        fx.settings.layout.gaps.outer.right = 10.0;
        fx.settings.layout.gaps.inner.horizontal = 6.0;
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, _b) = pair(&mut fx, &mut engine);
        let before = fx.goal(a);
        assert_eq!(before, Rect::new(10.0, 10.0, 487.0, 580.0));

        let _ = engine.set_fullscreen(&mut fx.ctx(), a, true, FullscreenMode::Maximized);
        assert_eq!(fx.goal(a), Rect::new(10.0, 10.0, 980.0, 580.0));
        assert_eq!(fx.monitors.fullscreen_window(fx.ws), Some(a));

        let _ = engine.set_fullscreen(&mut fx.ctx(), a, false, FullscreenMode::Maximized);
        assert!(fx.goal(a).approx_eq(&before, 0.5));
        assert_eq!(fx.monitors.fullscreen_window(fx.ws), None);
        assert_eq!(fx.events, vec![
            LayoutNotification::FullscreenChanged { window: a, fullscreen: true },
            LayoutNotification::FullscreenChanged { window: a, fullscreen: false },
        ]);
    }

    #[test]
    fn only_one_fullscreen_window_per_workspace() {
        let mut fx = Fixture::new();
        fx.monitors.monitor_mut(fx.mon).unwrap().reserved = Insets::new(30.0, 0.0, 0.0, 0.0);
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);

        let _ = engine.set_fullscreen(&mut fx.ctx(), a, true, FullscreenMode::Fullscreen);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 600.0));
        let _ = engine.set_fullscreen(&mut fx.ctx(), b, true, FullscreenMode::Fullscreen);

        assert!(!fx.windows.get(a).unwrap().fullscreen);
        assert_eq!(fx.monitors.fullscreen_window(fx.ws), Some(b));
        assert_eq!(fx.goal(a), Rect::new(0.0, 30.0, 500.0, 570.0));
    }

    #[test]
    fn floating_fullscreen_restores_its_previous_box() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let w = fx.windows.add(
            Window::new(fx.ws, fx.mon).floating().with_requested(Rect::new(100.0, 100.0, 300.0, 200.0)),
        );
        let _ = engine.on_window_created(&mut fx.ctx(), w, None);
        assert_eq!(fx.goal(w), Rect::new(100.0, 100.0, 300.0, 200.0));

        let _ = engine.set_fullscreen(&mut fx.ctx(), w, true, FullscreenMode::Fullscreen);
        assert_eq!(fx.goal(w), Rect::new(0.0, 0.0, 1000.0, 600.0));
        let _ = engine.set_fullscreen(&mut fx.ctx(), w, false, FullscreenMode::Fullscreen);
        assert_eq!(fx.goal(w), Rect::new(100.0, 100.0, 300.0, 200.0));
    }

    #[test]
    fn floating_toggle_round_trip() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);

        let _ = engine.change_window_floating_mode(&mut fx.ctx(), a);
        assert!(fx.windows.is_floating(a));
        assert!(!engine.is_window_tiled(a));
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert_eq!(fx.goal(a), Rect::new(250.0, 150.0, 500.0, 300.0));

        fx.windows.warp_all();
        fx.input.focused = Some(b);
        let _ = engine.change_window_floating_mode(&mut fx.ctx(), a);
        let wa = fx.windows.get(a).unwrap();
        assert!(!wa.floating);
        assert_eq!(wa.last_floating, Some(Rect::new(250.0, 150.0, 500.0, 300.0)));
        assert_eq!(wa.real, Rect::new(250.0, 150.0, 500.0, 300.0));
        assert_eq!(fx.goal(a), Rect::new(500.0, 0.0, 500.0, 600.0));
        assert_eq!(fx.events, vec![
            LayoutNotification::FloatingChanged { window: a, floating: true },
            LayoutNotification::FloatingChanged { window: a, floating: false },
        ]);
    }

    #[test]
    fn focus_candidate_prefers_fullscreen_then_last_tiled() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);
        let c = open(&mut fx, &mut engine);
        engine.on_window_focused(&fx.ctx(), a);

        assert_eq!(engine.get_next_window_candidate(&fx.ctx(), c), Some(a));
        let _ = engine.set_fullscreen(&mut fx.ctx(), b, true, FullscreenMode::Fullscreen);
        assert_eq!(engine.get_next_window_candidate(&fx.ctx(), c), Some(b));
    }

    #[test]
    fn focus_candidate_prefers_floating_under_a_closed_floating_window() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let tiled = open(&mut fx, &mut engine);
        let below = fx.windows.add(Window::new(fx.ws, fx.mon).floating());
        fx.windows.set_goal_and_real(below, Rect::new(100.0, 100.0, 400.0, 400.0));
        let above = fx.windows.add(Window::new(fx.ws, fx.mon).floating());
        fx.windows.set_goal_and_real(above, Rect::new(200.0, 200.0, 100.0, 100.0));
        fx.windows.warp_all();
        engine.on_window_focused(&fx.ctx(), tiled);
        fx.input.focused = Some(above);

        let response = engine.on_window_removed(&mut fx.ctx(), above);
        assert_eq!(response.focus_window, Some(below));
    }

    #[test]
    fn removing_the_visible_group_member_hands_over_the_slot() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let a = open(&mut fx, &mut engine);
        let _ = engine.toggle_group(&mut fx.ctx(), a);
        let b = open(&mut fx, &mut engine);
        fx.windows.warp_all();
        assert_eq!(fx.windows.group_members(a), vec![a, b]);
        assert_eq!(engine.tiled_windows(fx.ws), vec![b]);

        let response = engine.on_window_removed(&mut fx.ctx(), b);
        fx.windows.remove(b);
        assert_eq!(engine.tiled_windows(fx.ws), vec![a]);
        assert!(!fx.windows.get(a).unwrap().hidden);
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert_eq!(response.focus_window, Some(a));
    }

    #[test]
    fn removing_the_last_group_member_frees_its_slot() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);
        let _ = engine.toggle_group(&mut fx.ctx(), a);
        assert_eq!(fx.windows.group_members(a), vec![a]);

        let _ = engine.on_window_removed(&mut fx.ctx(), a);
        fx.windows.remove(a);
        assert!(!engine.is_window_tiled(a));
        assert_eq!(engine.tiled_windows(fx.ws), vec![b]);
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));
    }

    #[test]
    fn leaving_a_single_member_group_for_another_group_frees_its_slot() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);
        fx.windows.warp_all();
        let _ = engine.toggle_group(&mut fx.ctx(), a);
        let _ = engine.toggle_group(&mut fx.ctx(), b);

        let _ = engine.move_into_group(&mut fx.ctx(), b, Direction::Left);
        assert_eq!(fx.windows.group_members(a), vec![a, b]);
        assert_eq!(engine.tiled_windows(fx.ws), vec![b]);
        assert!(!engine.is_window_tiled(a));
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));
    }

    #[test]
    fn floating_a_fullscreen_window_leaves_fullscreen_first() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);
        let _ = engine.set_fullscreen(&mut fx.ctx(), a, true, FullscreenMode::Fullscreen);

        let _ = engine.change_window_floating_mode(&mut fx.ctx(), a);
        let wa = fx.windows.get(a).unwrap();
        assert!(!wa.fullscreen);
        assert!(wa.floating);
        assert_eq!(fx.monitors.fullscreen_window(fx.ws), None);
        assert_eq!(fx.goal(a), Rect::new(250.0, 150.0, 500.0, 300.0));
        assert_eq!(fx.goal(b), Rect::new(0.0, 0.0, 1000.0, 600.0));
        assert_eq!(fx.events, vec![
            LayoutNotification::FullscreenChanged { window: a, fullscreen: true },
            LayoutNotification::FullscreenChanged { window: a, fullscreen: false },
            LayoutNotification::FloatingChanged { window: a, floating: true },
        ]);
    }

    #[test]
    fn dissolving_a_group_tiles_every_member() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let a = open(&mut fx, &mut engine);
        let _ = engine.toggle_group(&mut fx.ctx(), a);
        let b = open(&mut fx, &mut engine);
        let c = open(&mut fx, &mut engine);
        assert_eq!(fx.windows.group_members(a).len(), 3);

        let _ = engine.toggle_group(&mut fx.ctx(), a);
        assert!(!fx.windows.is_grouped(a));
        let mut tiled = engine.tiled_windows(fx.ws);
        tiled.sort();
        let mut expected = vec![a, b, c];
        expected.sort();
        assert_eq!(tiled, expected);
        assert!(!fx.windows.groups_locked);
    }

    #[test]
    fn move_out_of_group_tiles_the_window_beside_its_group() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let a = open(&mut fx, &mut engine);
        let _ = engine.toggle_group(&mut fx.ctx(), a);
        let b = open(&mut fx, &mut engine);

        let _ = engine.move_out_of_group(&mut fx.ctx(), b);
        assert!(!fx.windows.is_grouped(b));
        assert_eq!(fx.windows.group_members(a), vec![a]);
        assert!(engine.is_window_tiled(a));
        assert!(engine.is_window_tiled(b));
        assert_eq!(fx.goal(a), Rect::new(0.0, 0.0, 500.0, 600.0));
        assert_eq!(fx.goal(b), Rect::new(500.0, 0.0, 500.0, 600.0));
    }

    #[test]
    fn locked_groups_refuse_new_members() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let a = open(&mut fx, &mut engine);
        let _ = engine.toggle_group(&mut fx.ctx(), a);
        engine.lock_group(&mut fx.ctx(), a, None);
        let b = open(&mut fx, &mut engine);
        assert!(!fx.windows.is_grouped(b));
        assert!(engine.is_window_tiled(b));

        engine.lock_group(&mut fx.ctx(), a, Some(false));
        engine.set_groups_locked(&mut fx.ctx(), Some(true));
        let _ = engine.move_into_group(&mut fx.ctx(), b, Direction::Left);
        assert!(!fx.windows.is_grouped(b));
    }

    #[test]
    fn layout_messages_are_parsed_and_routed() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Master);
        let (a, b) = pair(&mut fx, &mut engine);

        let response = engine.layout_message(&mut fx.ctx(), Some(b), "focusmaster").unwrap();
        assert_eq!(response.focus_window, Some(a));
        assert!(matches!(
            engine.layout_message(&mut fx.ctx(), None, "togglesplit"),
            Err(LayoutError::UnsupportedMessage { .. })
        ));
        assert_eq!(
            engine.layout_message(&mut fx.ctx(), None, "frobnicate"),
            Err(LayoutError::UnknownMessage("frobnicate".into()))
        );
    }

    #[test]
    fn switching_layout_mode_retiles_every_window() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, b) = pair(&mut fx, &mut engine);
        let c = open(&mut fx, &mut engine);

        engine.set_layout_mode(&mut fx.ctx(), LayoutMode::Master);
        assert_eq!(engine.mode(), LayoutMode::Master);
        let mut tiled = engine.tiled_windows(fx.ws);
        tiled.sort();
        let mut expected = vec![a, b, c];
        expected.sort();
        assert_eq!(tiled, expected);
        assert!(engine.draw_tree(fx.ws).contains("masters"));
    }

    #[test]
    fn recalculating_a_monitor_follows_reserved_areas() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let a = open(&mut fx, &mut engine);
        fx.monitors.monitor_mut(fx.mon).unwrap().reserved = Insets::new(40.0, 0.0, 0.0, 0.0);
        let mon = fx.mon;
        engine.recalculate_monitor(&mut fx.ctx(), mon);
        assert_eq!(fx.goal(a), Rect::new(0.0, 40.0, 1000.0, 560.0));
    }

    #[test]
    fn floating_resize_is_clamped() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let mut window = Window::new(fx.ws, fx.mon).floating();
        window.max_size = Some(Size::new(400.0, 400.0));
        let w = fx.windows.add(window);
        fx.windows.set_goal_and_real(w, Rect::new(100.0, 100.0, 200.0, 200.0));

        engine.resize_active_window(&mut fx.ctx(), w, Point::new(500.0, -500.0), ResizeCorner::BottomRight);
        assert_eq!(fx.goal(w), Rect::new(100.0, 100.0, 400.0, 20.0));
    }

    #[test]
    fn drags_run_through_the_engine() {
        let mut fx = Fixture::new();
        let mut engine = LayoutEngine::new(LayoutMode::Dwindle);
        let (a, _b) = pair(&mut fx, &mut engine);
        fx.windows.warp_all();

        fx.cursor(100.0, 100.0);
        engine.begin_drag(&mut fx.ctx(), a, DragMode::Move).unwrap();
        assert_eq!(
            engine.begin_drag(&mut fx.ctx(), a, DragMode::Move),
            Err(LayoutError::DragInProgress)
        );
        let _ = engine.on_window_removed(&mut fx.ctx(), a);
        assert!(!engine.drag_state().is_active());
    }
}
