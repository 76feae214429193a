//! Coordinate spaces and the client/page transform
//!
//! Four coordinate spaces meet here: device pixels, DPI-scaled client
//! pixels, scrolled/zoomed content pixels, and PDF user space (points,
//! origin bottom-left, Y-up). [`ViewParams`] is the single authoritative
//! conversion between client space and page space; every hit-test and
//! selection operation routes through it.

/// A point in client space (pixels, origin top-left, Y-down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientPoint {
    pub x: i32,
    pub y: i32,
}

impl ClientPoint {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in client space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ClientRect {
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build a normalized rectangle from two arbitrary corner points.
    #[must_use]
    pub fn from_corners(a: ClientPoint, b: ClientPoint) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Intersection with another rectangle, `None` when they do not overlap.
    #[must_use]
    pub fn intersect(&self, other: &ClientRect) -> Option<ClientRect> {
        let rect = ClientRect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if rect.is_empty() { None } else { Some(rect) }
    }

    #[must_use]
    pub const fn top_left(&self) -> ClientPoint {
        ClientPoint::new(self.left, self.top)
    }

    #[must_use]
    pub const fn bottom_right(&self) -> ClientPoint {
        ClientPoint::new(self.right, self.bottom)
    }
}

/// A point in PDF user space (points, origin bottom-left, Y-up).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

impl PagePoint {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in PDF user space.
///
/// `bottom <= top` because Y grows upward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageRect {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl PageRect {
    #[must_use]
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Build a normalized rectangle from two arbitrary corner points.
    #[must_use]
    pub fn from_corners(a: PagePoint, b: PagePoint) -> Self {
        Self {
            left: a.x.min(b.x),
            bottom: a.y.min(b.y),
            right: a.x.max(b.x),
            top: a.y.max(b.y),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        (self.right - self.left).max(0.0)
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        (self.top - self.bottom).max(0.0)
    }

    #[must_use]
    pub fn contains(&self, point: PagePoint) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.bottom && point.y <= self.top
    }

    /// Grow the rectangle by `amount` on every side.
    #[must_use]
    pub fn inflated(&self, amount: f64) -> PageRect {
        PageRect {
            left: self.left - amount,
            bottom: self.bottom - amount,
            right: self.right + amount,
            top: self.top + amount,
        }
    }
}

/// A 2D affine transform with the classic PDF six-value layout.
///
/// Applies as `(x, y) -> (a*x + c*y + e, b*x + d*y + f)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    #[must_use]
    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Compose two transforms; the result applies `inner` first, then `self`.
    #[must_use]
    pub fn multiply(&self, inner: &Transform) -> Transform {
        Transform {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    #[must_use]
    pub fn apply(&self, point: PagePoint) -> PagePoint {
        PagePoint {
            x: self.a * point.x + self.c * point.y + self.e,
            y: self.b * point.x + self.d * point.y + self.f,
        }
    }

    /// Map a rectangle through the transform and take the axis-aligned
    /// bounds of the resulting quad. Handles rotation and mirroring.
    #[must_use]
    pub fn apply_rect(&self, rect: &PageRect) -> PageRect {
        let corners = [
            self.apply(PagePoint::new(rect.left, rect.bottom)),
            self.apply(PagePoint::new(rect.right, rect.bottom)),
            self.apply(PagePoint::new(rect.right, rect.top)),
            self.apply(PagePoint::new(rect.left, rect.top)),
        ];
        let mut out = PageRect::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y);
        for corner in &corners[1..] {
            out.left = out.left.min(corner.x);
            out.right = out.right.max(corner.x);
            out.bottom = out.bottom.min(corner.y);
            out.top = out.top.max(corner.y);
        }
        out
    }
}

/// Presentation parameters for one client/page conversion.
///
/// Snapshot of the viewport state a render pass used; hit-testing against
/// the same snapshot guarantees screen/logic consistency.
#[derive(Clone, Copy, Debug)]
pub struct ViewParams {
    pub zoom: f64,
    pub dpi_x: i32,
    pub dpi_y: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub origin_x: i32,
    pub origin_y: i32,
}

impl ViewParams {
    /// Map a client-space point onto a page of the given height.
    ///
    /// Points above the page top clamp to the top edge (y = height).
    #[must_use]
    pub fn client_to_page(&self, client: ClientPoint, page_height_pts: f64) -> PagePoint {
        let content_x = f64::from(client.x - self.origin_x);
        let content_y = f64::from(client.y - self.origin_y);
        let page_x = (content_x + f64::from(self.scroll_x)) * (72.0 / f64::from(self.dpi_x)) / self.zoom;
        let page_y_top_down =
            (content_y + f64::from(self.scroll_y)) * (72.0 / f64::from(self.dpi_y)) / self.zoom;
        PagePoint {
            x: page_x,
            y: (page_height_pts - page_y_top_down).max(0.0),
        }
    }

    /// Exact algebraic inverse of [`Self::client_to_page`].
    ///
    /// Returns fractional client coordinates; no independent rounding, so
    /// repeated anchor computations do not drift.
    #[must_use]
    pub fn page_to_client(&self, page: PagePoint, page_height_pts: f64) -> (f64, f64) {
        let content_x = page.x * self.zoom * f64::from(self.dpi_x) / 72.0 - f64::from(self.scroll_x);
        let page_y_top_down = page_height_pts - page.y;
        let content_y =
            page_y_top_down * self.zoom * f64::from(self.dpi_y) / 72.0 - f64::from(self.scroll_y);
        (
            content_x + f64::from(self.origin_x),
            content_y + f64::from(self.origin_y),
        )
    }
}
