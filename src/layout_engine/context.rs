use serde::{Deserialize, Serialize};

use crate::common::config::Settings;
use crate::layout_engine::utils::BoxConstraints;
use crate::model::{MonitorRegistry, WindowId, WindowRegistry, WorkspaceId};
use crate::sys::geometry::{Point, Rect};

/// Pointer and focus state owned by the input manager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    pub cursor: Point,
    pub focused: Option<WindowId>,
}

/// Emitted through the event hooks whenever a layout operation changes window state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutNotification {
    FloatingChanged { window: WindowId, floating: bool },
    FullscreenChanged { window: WindowId, fullscreen: bool },
    GroupToggled { window: WindowId, grouped: bool },
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub raise_windows: Vec<WindowId>,
    pub focus_window: Option<WindowId>,
}

impl EventResponse {
    pub fn focus(window: WindowId) -> Self {
        Self {
            raise_windows: vec![window],
            focus_window: Some(window),
        }
    }
}

/// Everything a layout operation may read or mutate. One is built per call by the
/// compositor loop; nothing here is global.
pub struct LayoutContext<'a> {
    pub settings: &'a Settings,
    pub windows: &'a mut WindowRegistry,
    pub monitors: &'a mut MonitorRegistry,
    pub input: &'a InputState,
    pub events: &'a mut Vec<LayoutNotification>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(
        settings: &'a Settings,
        windows: &'a mut WindowRegistry,
        monitors: &'a mut MonitorRegistry,
        input: &'a InputState,
        events: &'a mut Vec<LayoutNotification>,
    ) -> Self {
        Self { settings, windows, monitors, input, events }
    }

    pub fn notify(&mut self, notification: LayoutNotification) { self.events.push(notification); }

    pub fn workspace_of(&self, window: WindowId) -> Option<WorkspaceId> {
        self.windows.get(window).map(|w| w.workspace)
    }

    /// Working area for `ws`; `None` (already logged) when the workspace is orphaned.
    pub fn working_area(&self, ws: WorkspaceId) -> Option<Rect> { self.monitors.working_area(ws) }

    /// Full box for a fullscreen window in its workspace's current mode.
    pub fn fullscreen_box(&self, window: WindowId) -> Option<Rect> {
        let w = self.windows.get(window)?;
        let (_, monitor) = self.monitors.monitor_for_workspace(w.workspace)?;
        let mode = self.monitors.workspace(w.workspace)?.fullscreen_mode;
        Some(match mode {
            crate::model::FullscreenMode::Fullscreen => monitor.frame,
            crate::model::FullscreenMode::Maximized => {
                crate::layout_engine::utils::compute_box_for_window(&BoxConstraints {
                    cell: monitor.working_area(),
                    area: monitor.working_area(),
                    gaps: &self.settings.layout.gaps,
                    decoration: w.decoration,
                    pseudo: None,
                    special_scale: None,
                })
            }
        })
    }

    /// Box constraints for a tiled cell belonging to `window`.
    pub fn constraints_for(&self, window: WindowId, cell: Rect) -> Option<BoxConstraints<'a>> {
        let settings: &'a Settings = self.settings;
        let w = self.windows.get(window)?;
        let area = self.monitors.working_area(w.workspace)?;
        let special_scale = self
            .monitors
            .is_special(w.workspace)
            .then_some(settings.layout.special_scale_factor);
        Some(BoxConstraints {
            cell,
            area,
            gaps: &settings.layout.gaps,
            decoration: w.decoration,
            pseudo: w.pseudotiled.then_some(w.pseudo_size),
            special_scale,
        })
    }
}
