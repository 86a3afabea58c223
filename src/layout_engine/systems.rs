use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::layout_engine::utils::{MIN_WINDOW_SIZE, compute_box_for_window};
use crate::layout_engine::{
    Direction, LayoutContext, LayoutError, LayoutMessage, LayoutNotification, RatioChange,
    ResizeCorner,
};
use crate::model::{Window, WindowId, WorkspaceId};
use crate::sys::geometry::{Point, Rect, Size};

/// Operations every concrete tiling layout implements. Layouts own their private
/// structure and write goal boxes onto windows through the context.
#[enum_dispatch]
pub trait LayoutSystem: Serialize + for<'de> Deserialize<'de> {
    fn name(&self) -> &'static str;

    /// Tiles `window`. The layout may instead merge it into a group under the opening
    /// target or divert it to floating when it cannot fit.
    fn on_window_created_tiling(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        direction: Option<Direction>,
    );
    fn on_window_removed_tiling(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId);
    fn is_window_tiled(&self, window: WindowId) -> bool;
    /// Windows occupying a layout slot on `ws`, in layout order.
    fn tiled_windows(&self, ws: WorkspaceId) -> Vec<WindowId>;

    fn recalculate_workspace(&mut self, ctx: &mut LayoutContext<'_>, ws: WorkspaceId);
    fn recalculate_window(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId);

    fn resize_active_window(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        delta: Point,
        corner: ResizeCorner,
    );
    fn alter_split_ratio(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: WindowId,
        change: RatioChange,
    );

    /// Handles a layout-specific verb. Returns a window the caller should focus.
    fn layout_message(
        &mut self,
        ctx: &mut LayoutContext<'_>,
        window: Option<WindowId>,
        message: LayoutMessage,
    ) -> Result<Option<WindowId>, LayoutError>;

    fn switch_windows(&mut self, ctx: &mut LayoutContext<'_>, a: WindowId, b: WindowId);
    fn move_window_to(&mut self, ctx: &mut LayoutContext<'_>, window: WindowId, direction: Direction);
    /// Rebinds the slot held by `from` to `to` and applies the slot's box to `to`.
    fn replace_window_data(&mut self, ctx: &mut LayoutContext<'_>, from: WindowId, to: WindowId);

    fn draw_tree(&self, ws: WorkspaceId) -> String;
}

mod dwindle;
pub use dwindle::DwindleLayout;
mod master_stack;
pub use master_stack::MasterStackLayout;

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[enum_dispatch(LayoutSystem)]
pub enum LayoutSystemKind {
    Dwindle(DwindleLayout),
    MasterStack(MasterStackLayout),
}

/// Writes the box for a layout cell onto `window` and its hidden group members.
/// Fullscreen windows get the fullscreen box and keep their cell untouched.
pub(crate) fn apply_cell(ctx: &mut LayoutContext<'_>, window: WindowId, cell: Rect) {
    let Some(fullscreen) = ctx.windows.get(window).map(|w| w.fullscreen) else {
        warn!(?window, "layout slot references an unknown window");
        return;
    };
    let target = if fullscreen {
        ctx.fullscreen_box(window)
    } else {
        ctx.constraints_for(window, cell).map(|c| compute_box_for_window(&c))
    };
    let Some(target) = target else {
        return;
    };
    trace!(?window, ?cell, ?target, "applying cell");
    ctx.windows.set_goal(window, target);
    for member in ctx.windows.group_members(window) {
        if member != window {
            ctx.windows.set_goal(member, target);
        }
    }
}

/// Whether `cell` violates the window's own size constraints.
pub(crate) fn over_constrained(window: &Window, cell: Size) -> bool {
    let too_big = window
        .max_size
        .is_some_and(|max| max.width < cell.width || max.height < cell.height);
    let too_small = window
        .min_size
        .is_some_and(|min| min.width > cell.width || min.height > cell.height);
    too_big || too_small
}

/// Floating box for `window`: its last floating box or requested geometry when it has
/// one, otherwise a box centred in the working area at half its size, clamped to the
/// window's limits.
pub(crate) fn floating_geometry(ctx: &LayoutContext<'_>, window: WindowId) -> Option<Rect> {
    let w = ctx.windows.get(window)?;
    if let Some(rect) = w.last_floating.or(w.requested) {
        return Some(rect);
    }
    let area = ctx.working_area(w.workspace)?;
    let mut size = Size::new(area.size.width / 2.0, area.size.height / 2.0);
    if let Some(max) = w.max_size {
        size.width = size.width.min(max.width);
        size.height = size.height.min(max.height);
    }
    if let Some(min) = w.min_size {
        size.width = size.width.max(min.width);
        size.height = size.height.max(min.height);
    }
    size.width = size.width.max(MIN_WINDOW_SIZE);
    size.height = size.height.max(MIN_WINDOW_SIZE);
    Some(area.centered(size))
}

/// Diverts a window the layout cannot place to floating.
pub(crate) fn float_instead(ctx: &mut LayoutContext<'_>, window: WindowId) {
    debug!(?window, "window does not fit its tiled slot, floating it");
    let geometry = floating_geometry(ctx, window);
    if let Some(w) = ctx.windows.get_mut(window) {
        w.floating = true;
    }
    if let Some(rect) = geometry {
        ctx.windows.set_goal(window, rect);
    }
    ctx.notify(LayoutNotification::FloatingChanged { window, floating: true });
}

/// Merges `window` into the group shown by `opening` when group rules allow it.
/// Returns true when the merge happened; the caller then rebinds the slot.
pub(crate) fn merge_into_group(
    ctx: &mut LayoutContext<'_>,
    window: WindowId,
    opening: WindowId,
) -> bool {
    if !ctx.settings.groups.merge_on_insert {
        return false;
    }
    let Some(gid) = ctx.windows.group_of(opening) else {
        return false;
    };
    if !ctx.windows.can_be_grouped_into(window, gid) {
        return false;
    }
    let after_current = ctx.settings.groups.insert_after_current;
    ctx.windows.insert_into_group(gid, window, after_current);
    debug!(?window, group = ?gid, "merged new window into group");
    true
}

/// Point one pixel past the edge of `rect` in `direction`, level with its centre.
pub(crate) fn focal_point(rect: Rect, direction: Direction) -> Point {
    let mid = rect.mid();
    match direction {
        Direction::Left => Point::new(rect.min_x() - 1.0, mid.y),
        Direction::Right => Point::new(rect.max_x() + 1.0, mid.y),
        Direction::Up => Point::new(mid.x, rect.min_y() - 1.0),
        Direction::Down => Point::new(mid.x, rect.max_y() + 1.0),
    }
}

/// Exchanges workspace and monitor membership of two windows and their group members.
pub(crate) fn exchange_membership(ctx: &mut LayoutContext<'_>, a: WindowId, b: WindowId) {
    let (Some(wa), Some(wb)) = (ctx.windows.get(a), ctx.windows.get(b)) else {
        return;
    };
    let (ws_a, mon_a, ws_b, mon_b) = (wa.workspace, wa.monitor, wb.workspace, wb.monitor);
    if ws_a == ws_b {
        return;
    }
    let mut members_a = ctx.windows.group_members(a);
    if members_a.is_empty() {
        members_a.push(a);
    }
    let mut members_b = ctx.windows.group_members(b);
    if members_b.is_empty() {
        members_b.push(b);
    }
    for m in members_a {
        if let Some(w) = ctx.windows.get_mut(m) {
            w.workspace = ws_b;
            w.monitor = mon_b;
        }
    }
    for m in members_b {
        if let Some(w) = ctx.windows.get_mut(m) {
            w.workspace = ws_a;
            w.monitor = mon_a;
        }
    }
}
