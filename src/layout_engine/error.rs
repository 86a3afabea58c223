use thiserror::Error;

use crate::model::WindowId;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("Unknown layout message: {0}")]
    UnknownMessage(String),
    #[error("Layout message `{verb}` is missing an argument")]
    MissingArgument { verb: &'static str },
    #[error("Invalid argument for `{verb}`: {value}")]
    InvalidArgument { verb: &'static str, value: String },
    #[error("Layout `{layout}` does not handle `{message}`")]
    UnsupportedMessage { layout: &'static str, message: String },
    #[error("Window {0:?} is not managed by the layout")]
    UnknownWindow(WindowId),
    #[error("A drag is already in progress")]
    DragInProgress,
    #[error("Window {0:?} cannot be dragged")]
    InvalidDragTarget(WindowId),
}
