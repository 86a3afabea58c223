use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::model::{Group, GroupId, MonitorId, WorkspaceId};
use crate::sys::geometry::{Insets, Point, Rect, Size};

new_key_type! {
    pub struct WindowId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Window {
    /// Target box written by the layout.
    pub goal: Rect,
    /// Currently rendered box, driven toward `goal` by the animator.
    pub real: Rect,
    pub floating: bool,
    pub fullscreen: bool,
    pub pseudotiled: bool,
    /// Size a pseudotiled window asked for.
    pub pseudo_size: Size,
    pub workspace: WorkspaceId,
    pub monitor: MonitorId,
    pub group: Option<GroupId>,
    pub hidden: bool,
    /// Opts the window out of being grouped.
    pub group_deny: bool,
    pub mapped: bool,
    pub fading_out: bool,
    pub override_redirect: bool,
    pub min_size: Option<Size>,
    pub max_size: Option<Size>,
    /// Floating geometry from protocol hints.
    pub requested: Option<Rect>,
    pub last_floating: Option<Rect>,
    pub pre_fullscreen: Option<Rect>,
    /// Reserved by the decoration positioner (titlebars, tab bars).
    pub decoration: Insets,
    pub pending_configure: bool,
}

impl Window {
    pub fn new(workspace: WorkspaceId, monitor: MonitorId) -> Self {
        Self {
            goal: Rect::default(),
            real: Rect::default(),
            floating: false,
            fullscreen: false,
            pseudotiled: false,
            pseudo_size: Size::default(),
            workspace,
            monitor,
            group: None,
            hidden: false,
            group_deny: false,
            mapped: true,
            fading_out: false,
            override_redirect: false,
            min_size: None,
            max_size: None,
            requested: None,
            last_floating: None,
            pre_fullscreen: None,
            decoration: Insets::default(),
            pending_configure: false,
        }
    }

    pub fn floating(mut self) -> Self {
        self.floating = true;
        self
    }

    pub fn with_requested(mut self, rect: Rect) -> Self {
        self.requested = Some(rect);
        self
    }

    pub fn is_tiled(&self) -> bool { self.mapped && !self.floating && !self.hidden }

    /// Mapped, shown and not on its way out.
    pub fn is_visible(&self) -> bool { self.mapped && !self.hidden && !self.fading_out }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WindowRegistry {
    windows: SlotMap<WindowId, Window>,
    pub(crate) groups: SlotMap<GroupId, Group>,
    /// Global lock that stops anything from joining a group.
    pub groups_locked: bool,
}

impl WindowRegistry {
    pub fn add(&mut self, window: Window) -> WindowId { self.windows.insert(window) }

    pub fn remove(&mut self, id: WindowId) -> Option<Window> {
        if self.windows.get(id).is_some_and(|w| w.group.is_some()) {
            self.remove_from_group(id);
        }
        self.windows.remove(id)
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> { self.windows.get(id) }

    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> { self.windows.get_mut(id) }

    pub fn contains(&self, id: WindowId) -> bool { self.windows.contains_key(id) }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &Window)> { self.windows.iter() }

    pub fn is_floating(&self, id: WindowId) -> bool {
        self.windows.get(id).is_some_and(|w| w.floating)
    }

    pub fn is_tiled(&self, id: WindowId) -> bool { self.windows.get(id).is_some_and(Window::is_tiled) }

    /// Writes the goal box and asks the client to acknowledge the new size.
    pub fn set_goal(&mut self, id: WindowId, rect: Rect) {
        if let Some(w) = self.windows.get_mut(id) {
            if w.goal != rect {
                w.pending_configure = true;
            }
            w.goal = rect;
        }
    }

    /// Moves both goal and rendered box at once, skipping the animation.
    pub fn set_goal_and_real(&mut self, id: WindowId, rect: Rect) {
        self.set_goal(id, rect);
        if let Some(w) = self.windows.get_mut(id) {
            w.real = rect;
        }
    }

    /// Completes any in-flight animation.
    pub fn warp(&mut self, id: WindowId) {
        if let Some(w) = self.windows.get_mut(id) {
            w.real = w.goal;
        }
    }

    pub fn warp_all(&mut self) {
        for (_, w) in self.windows.iter_mut() {
            w.real = w.goal;
        }
    }

    pub fn on_workspace(&self, ws: WorkspaceId) -> impl Iterator<Item = (WindowId, &Window)> {
        self.windows.iter().filter(move |(_, w)| w.workspace == ws)
    }

    /// Topmost visible window on `ws` whose rendered box contains `point`.
    /// Later windows are treated as stacked above earlier ones.
    pub fn window_at(
        &self,
        point: Point,
        ws: WorkspaceId,
        filter: impl Fn(WindowId, &Window) -> bool,
    ) -> Option<WindowId> {
        let candidates: Vec<_> = self
            .on_workspace(ws)
            .filter(|(id, w)| w.is_visible() && filter(*id, w))
            .collect();
        candidates
            .iter()
            .rev()
            .find(|(_, w)| w.real.contains(point))
            .map(|(id, _)| *id)
    }
}
