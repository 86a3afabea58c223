use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

    pub fn offset(self, dx: f64, dy: f64) -> Self { Self::new(self.x + dx, self.y + dy) }

    pub fn delta_from(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

/// Space reserved along each edge of a box (panels, titlebars, tab bars).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Insets {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

impl Insets {
    pub const fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self { top, left, bottom, right }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.left == 0.0 && self.bottom == 0.0 && self.right == 0.0
    }
}

/// Axis-aligned rectangle in layout coordinates. `y` grows downward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn from_parts(origin: Point, size: Size) -> Self { Self { origin, size } }

    pub fn min_x(&self) -> f64 { self.origin.x }

    pub fn min_y(&self) -> f64 { self.origin.y }

    pub fn max_x(&self) -> f64 { self.origin.x + self.size.width }

    pub fn max_y(&self) -> f64 { self.origin.y + self.size.height }

    pub fn mid(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Half-open containment, so a point on a shared edge belongs to exactly one box.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x() && p.x < self.max_x() && p.y >= self.min_y() && p.y < self.max_y()
    }

    /// Euclidean distance from the box to `p`, zero when `p` is inside.
    pub fn distance_to(&self, p: Point) -> f64 {
        let dx = (self.min_x() - p.x).max(0.0).max(p.x - self.max_x());
        let dy = (self.min_y() - p.y).max(0.0).max(p.y - self.max_y());
        (dx * dx + dy * dy).sqrt()
    }

    pub fn inset(&self, insets: Insets) -> Rect {
        Rect::new(
            self.origin.x + insets.left,
            self.origin.y + insets.top,
            (self.size.width - insets.left - insets.right).max(0.0),
            (self.size.height - insets.top - insets.bottom).max(0.0),
        )
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::from_parts(self.origin.offset(dx, dy), self.size)
    }

    pub fn with_size(&self, size: Size) -> Rect { Rect::from_parts(self.origin, size) }

    /// Same-sized box centred inside `self`.
    pub fn centered(&self, size: Size) -> Rect {
        Rect::new(
            self.origin.x + (self.size.width - size.width) / 2.0,
            self.origin.y + (self.size.height - size.height) / 2.0,
            size.width,
            size.height,
        )
    }

    pub fn overlaps_x(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x() && other.min_x() < self.max_x()
    }

    pub fn overlaps_y(&self, other: &Rect) -> bool {
        self.min_y() < other.max_y() && other.min_y() < self.max_y()
    }

    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.origin.x - other.origin.x).abs() <= tolerance
            && (self.origin.y - other.origin.y).abs() <= tolerance
            && (self.size.width - other.size.width).abs() <= tolerance
            && (self.size.height - other.size.height).abs() <= tolerance
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    fn round(&self) -> Self {
        let min_x = self.min_x().round();
        let min_y = self.min_y().round();
        let max_x = self.max_x().round();
        let max_y = self.max_y().round();
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

impl Round for Point {
    fn round(&self) -> Self { Point::new(self.x.round(), self.y.round()) }
}
