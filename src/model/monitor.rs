use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use tracing::error;

use crate::model::WindowId;
use crate::sys::geometry::{Insets, Rect};

new_key_type! {
    pub struct MonitorId;
    pub struct WorkspaceId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullscreenMode {
    /// The window covers the whole monitor, ignoring reserved areas and gaps.
    #[default]
    Fullscreen,
    /// The window covers the working area and keeps outer gaps and decorations.
    Maximized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub name: String,
    pub frame: Rect,
    /// Space claimed by bars and panels.
    pub reserved: Insets,
    /// Hz; zero when the output did not report one.
    pub refresh_rate: f64,
    pub active_workspace: Option<WorkspaceId>,
    pub special_workspace: Option<WorkspaceId>,
}

impl Monitor {
    pub fn new(name: impl Into<String>, frame: Rect) -> Self {
        Self {
            name: name.into(),
            frame,
            reserved: Insets::default(),
            refresh_rate: 60.0,
            active_workspace: None,
            special_workspace: None,
        }
    }

    pub fn working_area(&self) -> Rect { self.frame.inset(self.reserved) }

    pub fn is_visible(&self, ws: WorkspaceId) -> bool {
        self.active_workspace == Some(ws) || self.special_workspace == Some(ws)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub monitor: Option<MonitorId>,
    pub special: bool,
    pub fullscreen: Option<WindowId>,
    pub fullscreen_mode: FullscreenMode,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MonitorRegistry {
    monitors: SlotMap<MonitorId, Monitor>,
    workspaces: SlotMap<WorkspaceId, Workspace>,
}

impl MonitorRegistry {
    pub fn add_monitor(&mut self, monitor: Monitor) -> MonitorId { self.monitors.insert(monitor) }

    pub fn remove_monitor(&mut self, id: MonitorId) -> Option<Monitor> {
        let removed = self.monitors.remove(id)?;
        for (_, ws) in self.workspaces.iter_mut() {
            if ws.monitor == Some(id) {
                ws.monitor = None;
            }
        }
        Some(removed)
    }

    /// Creates a workspace on `monitor`, activating it if the monitor shows nothing yet.
    pub fn add_workspace(&mut self, name: impl Into<String>, monitor: MonitorId) -> WorkspaceId {
        let id = self.workspaces.insert(Workspace {
            name: name.into(),
            monitor: Some(monitor),
            special: false,
            fullscreen: None,
            fullscreen_mode: FullscreenMode::default(),
        });
        if let Some(m) = self.monitors.get_mut(monitor) {
            if m.active_workspace.is_none() {
                m.active_workspace = Some(id);
            }
        }
        id
    }

    pub fn add_special_workspace(
        &mut self,
        name: impl Into<String>,
        monitor: MonitorId,
    ) -> WorkspaceId {
        let id = self.workspaces.insert(Workspace {
            name: name.into(),
            monitor: Some(monitor),
            special: true,
            fullscreen: None,
            fullscreen_mode: FullscreenMode::default(),
        });
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.special_workspace = Some(id);
        }
        id
    }

    pub fn monitor(&self, id: MonitorId) -> Option<&Monitor> { self.monitors.get(id) }

    pub fn monitor_mut(&mut self, id: MonitorId) -> Option<&mut Monitor> {
        self.monitors.get_mut(id)
    }

    pub fn monitors(&self) -> impl Iterator<Item = (MonitorId, &Monitor)> { self.monitors.iter() }

    pub fn workspace(&self, id: WorkspaceId) -> Option<&Workspace> { self.workspaces.get(id) }

    pub fn workspace_mut(&mut self, id: WorkspaceId) -> Option<&mut Workspace> {
        self.workspaces.get_mut(id)
    }

    pub fn workspaces(&self) -> impl Iterator<Item = (WorkspaceId, &Workspace)> {
        self.workspaces.iter()
    }

    /// Resolves the monitor showing `ws`. Logs and returns `None` for orphaned workspaces.
    pub fn monitor_for_workspace(&self, ws: WorkspaceId) -> Option<(MonitorId, &Monitor)> {
        let Some(workspace) = self.workspaces.get(ws) else {
            error!(?ws, "unknown workspace");
            return None;
        };
        let Some(monitor_id) = workspace.monitor else {
            error!(?ws, name = %workspace.name, "workspace has no monitor");
            return None;
        };
        match self.monitors.get(monitor_id) {
            Some(m) => Some((monitor_id, m)),
            None => {
                error!(?ws, ?monitor_id, "workspace references a missing monitor");
                None
            }
        }
    }

    pub fn working_area(&self, ws: WorkspaceId) -> Option<Rect> {
        self.monitor_for_workspace(ws).map(|(_, m)| m.working_area())
    }

    pub fn is_special(&self, ws: WorkspaceId) -> bool {
        self.workspaces.get(ws).is_some_and(|w| w.special)
    }

    pub fn fullscreen_window(&self, ws: WorkspaceId) -> Option<WindowId> {
        self.workspaces.get(ws).and_then(|w| w.fullscreen)
    }

    /// Workspaces currently on screen for `monitor` (active first, then special).
    pub fn visible_workspaces(&self, monitor: MonitorId) -> Vec<WorkspaceId> {
        let Some(m) = self.monitors.get(monitor) else {
            return Vec::new();
        };
        m.active_workspace.into_iter().chain(m.special_workspace).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_area_subtracts_reserved_insets() {
        let mut m = Monitor::new("DP-1", Rect::new(0.0, 0.0, 1920.0, 1080.0));
        m.reserved = Insets::new(30.0, 0.0, 0.0, 0.0);
        assert_eq!(m.working_area(), Rect::new(0.0, 30.0, 1920.0, 1050.0));
    }

    #[test]
    fn removing_a_monitor_orphans_its_workspaces() {
        let mut reg = MonitorRegistry::default();
        let mon = reg.add_monitor(Monitor::new("DP-1", Rect::new(0.0, 0.0, 800.0, 600.0)));
        let ws = reg.add_workspace("1", mon);
        assert_eq!(reg.monitor(mon).unwrap().active_workspace, Some(ws));

        reg.remove_monitor(mon);
        assert!(reg.working_area(ws).is_none());
    }

    #[test]
    fn special_workspace_is_visible_next_to_active() {
        let mut reg = MonitorRegistry::default();
        let mon = reg.add_monitor(Monitor::new("DP-1", Rect::new(0.0, 0.0, 800.0, 600.0)));
        let ws = reg.add_workspace("1", mon);
        let special = reg.add_special_workspace("scratch", mon);
        assert_eq!(reg.visible_workspaces(mon), vec![ws, special]);
        assert!(reg.is_special(special));
    }
}
