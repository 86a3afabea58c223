use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect, Size};

/// Corner specification for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeCorner {
    #[default]
    None,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeCorner {
    pub fn affects_left(&self) -> bool { matches!(self, Self::TopLeft | Self::BottomLeft) }

    pub fn affects_right(&self) -> bool {
        matches!(self, Self::TopRight | Self::BottomRight | Self::None)
    }

    pub fn affects_top(&self) -> bool { matches!(self, Self::TopLeft | Self::TopRight) }

    pub fn affects_bottom(&self) -> bool {
        matches!(self, Self::BottomLeft | Self::BottomRight | Self::None)
    }

    pub fn from_cursor_position(cursor: Point, window_center: Point) -> Self {
        let left = cursor.x < window_center.x;
        let top = cursor.y < window_center.y;

        match (left, top) {
            (true, true) => Self::TopLeft,
            (false, true) => Self::TopRight,
            (true, false) => Self::BottomLeft,
            (false, false) => Self::BottomRight,
        }
    }

    /// Applies a pointer delta to `origin` by moving the grabbed edges and keeping the
    /// opposite ones anchored. Sizes are clamped to `[min, max]`.
    pub fn resize(&self, origin: Rect, delta: Point, min: Size, max: Option<Size>) -> Rect {
        let clamp = |v: f64, lo: f64, hi: Option<f64>| {
            let v = v.max(lo);
            match hi {
                Some(hi) if hi >= lo => v.min(hi),
                _ => v,
            }
        };
        let width = if self.affects_left() {
            origin.size.width - delta.x
        } else {
            origin.size.width + delta.x
        };
        let height = if self.affects_top() {
            origin.size.height - delta.y
        } else {
            origin.size.height + delta.y
        };
        let width = clamp(width, min.width, max.map(|m| m.width));
        let height = clamp(height, min.height, max.map(|m| m.height));
        let x = if self.affects_left() { origin.max_x() - width } else { origin.min_x() };
        let y = if self.affects_top() { origin.max_y() - height } else { origin.min_y() };
        Rect::new(x, y, width, height)
    }
}
