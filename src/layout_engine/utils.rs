use bitflags::bitflags;

use crate::common::config::GapSettings;
use crate::sys::geometry::{Insets, Point, Rect, Round, Size};

/// Smallest size a tiled window is ever handed.
pub const MIN_WINDOW_SIZE: f64 = 20.0;

pub const MIN_SPLIT_RATIO: f32 = 0.1;
pub const MAX_SPLIT_RATIO: f32 = 1.9;

pub fn clamp_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() {
        return 1.0;
    }
    ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

bitflags! {
    /// Edges of a cell that lie on the working area boundary.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Edges: u8 {
        const TOP    = 1 << 0;
        const LEFT   = 1 << 1;
        const BOTTOM = 1 << 2;
        const RIGHT  = 1 << 3;
    }
}

impl Edges {
    pub fn touching(cell: Rect, area: Rect) -> Edges {
        const EPS: f64 = 1.0;
        let mut edges = Edges::empty();
        if (cell.min_y() - area.min_y()).abs() < EPS {
            edges |= Edges::TOP;
        }
        if (cell.min_x() - area.min_x()).abs() < EPS {
            edges |= Edges::LEFT;
        }
        if (cell.max_y() - area.max_y()).abs() < EPS {
            edges |= Edges::BOTTOM;
        }
        if (cell.max_x() - area.max_x()).abs() < EPS {
            edges |= Edges::RIGHT;
        }
        edges
    }
}

/// Everything that shapes a tiled window's box apart from the layout itself.
#[derive(Clone, Copy, Debug)]
pub struct BoxConstraints<'a> {
    /// The layout cell (tree node or master/stack slot).
    pub cell: Rect,
    /// Monitor working area the cell lives in.
    pub area: Rect,
    pub gaps: &'a GapSettings,
    pub decoration: Insets,
    /// Requested size of a pseudotiled window.
    pub pseudo: Option<Size>,
    /// Scale-down applied on special workspaces.
    pub special_scale: Option<f64>,
}

/// Maps a layout cell to the box handed to the window. Pure: the same constraints
/// always produce the same box.
pub fn compute_box_for_window(c: &BoxConstraints<'_>) -> Rect {
    let edges = Edges::touching(c.cell, c.area);
    let gap = |edge: Edges, outer: f64, inner: f64| {
        if edges.contains(edge) { outer } else { inner / 2.0 }
    };
    let gapped = c.cell.inset(Insets::new(
        gap(Edges::TOP, c.gaps.outer.top, c.gaps.inner.vertical),
        gap(Edges::LEFT, c.gaps.outer.left, c.gaps.inner.horizontal),
        gap(Edges::BOTTOM, c.gaps.outer.bottom, c.gaps.inner.vertical),
        gap(Edges::RIGHT, c.gaps.outer.right, c.gaps.inner.horizontal),
    ));
    let mut rect = gapped.inset(c.decoration);

    if let Some(pseudo) = c.pseudo {
        if pseudo.width > 0.0 && pseudo.height > 0.0 {
            let scale = (rect.size.width / pseudo.width)
                .min(rect.size.height / pseudo.height)
                .min(1.0);
            rect = rect.centered(Size::new(pseudo.width * scale, pseudo.height * scale));
        }
    }

    if let Some(scale) = c.special_scale {
        if scale > 0.0 && scale != 1.0 {
            let center = c.area.mid();
            rect = Rect::new(
                center.x + (rect.origin.x - center.x) * scale,
                center.y + (rect.origin.y - center.y) * scale,
                rect.size.width * scale,
                rect.size.height * scale,
            );
        }
    }

    let rect = rect.round();
    Rect::from_parts(
        Point::new(rect.origin.x, rect.origin.y),
        Size::new(
            rect.size.width.max(MIN_WINDOW_SIZE),
            rect.size.height.max(MIN_WINDOW_SIZE),
        ),
    )
}
