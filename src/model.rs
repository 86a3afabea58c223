pub mod group;
pub mod monitor;
pub mod window;

pub use group::{Group, GroupId};
pub use monitor::{FullscreenMode, Monitor, MonitorId, MonitorRegistry, Workspace, WorkspaceId};
pub use window::{Window, WindowId, WindowRegistry};
