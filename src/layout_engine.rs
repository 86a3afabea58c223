pub mod binary_tree;
pub mod context;
pub mod drag;
pub mod engine;
pub mod error;
pub mod graph;
pub mod message;
pub mod resize;
pub mod systems;
pub mod utils;

pub use context::{EventResponse, InputState, LayoutContext, LayoutNotification};
pub use drag::{DragMode, DragState};
pub use engine::LayoutEngine;
pub use error::LayoutError;
pub use graph::{Direction, Orientation};
pub use message::{LayoutMessage, RatioChange};
pub use resize::ResizeCorner;
pub use systems::{DwindleLayout, LayoutSystem, LayoutSystemKind, MasterStackLayout};
