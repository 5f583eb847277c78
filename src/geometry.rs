//! Geometry primitives for map extents and page placement
//!
//! Two coordinate spaces meet in a composition:
//! - Map space ([`GeoPoint`], [`Extent`]): projection units, y grows upwards
//! - Page space ([`PagePoint`], [`PageRect`]): millimetres, y grows downwards

use serde::{Deserialize, Serialize};

/// A point in map units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
}

impl GeoPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point on the page in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f64,
    pub y: f64,
}

impl PagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in map units.
///
/// A usable extent has `xmax > xmin` and `ymax > ymin` with finite bounds;
/// see [`Extent::is_valid`]. Construction does not normalize or validate so
/// that degenerate input can be reported where it is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Smallest extent covering all points, `None` for an empty slice.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut extent = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            extent.xmin = extent.xmin.min(p.x);
            extent.ymin = extent.ymin.min(p.y);
            extent.xmax = extent.xmax.max(p.x);
            extent.ymax = extent.ymax.max(p.y);
        }
        Some(extent)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    /// True when all bounds are finite and the area is positive.
    pub fn is_valid(&self) -> bool {
        [self.xmin, self.ymin, self.xmax, self.ymax].iter().all(|v| v.is_finite())
            && self.width() > 0.0
            && self.height() > 0.0
    }

    /// True when `other` lies entirely inside this extent (edges inclusive).
    pub fn contains(&self, other: &Extent) -> bool {
        other.xmin >= self.xmin
            && other.xmax <= self.xmax
            && other.ymin >= self.ymin
            && other.ymax <= self.ymax
    }

    pub fn contains_point(&self, p: GeoPoint) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Same size, moved so that its center is `center`.
    pub fn centered_on(&self, center: GeoPoint) -> Self {
        let half_w = self.width() / 2.0;
        let half_h = self.height() / 2.0;
        Self::new(center.x - half_w, center.y - half_h, center.x + half_w, center.y + half_h)
    }

    /// Grow the short side about the center so that `width / height == ratio`.
    ///
    /// Used to match an extent to the shape of its map frame. A non-positive
    /// or non-finite ratio returns the extent unchanged.
    pub fn fit_to_aspect(&self, ratio: f64) -> Self {
        if !(ratio.is_finite() && ratio > 0.0) || self.height() == 0.0 {
            return *self;
        }
        let center = self.center();
        let current = self.width() / self.height();
        let (w, h) = if current < ratio {
            (self.height() * ratio, self.height())
        } else {
            (self.width(), self.width() / ratio)
        };
        Self::new(center.x - w / 2.0, center.y - h / 2.0, center.x + w / 2.0, center.y + h / 2.0)
    }

    /// Corners in ring order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            GeoPoint::new(self.xmin, self.ymax),
            GeoPoint::new(self.xmax, self.ymax),
            GeoPoint::new(self.xmax, self.ymin),
            GeoPoint::new(self.xmin, self.ymin),
        ]
    }
}

/// A rectangle on the page in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> PagePoint {
        PagePoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn contains(&self, p: PagePoint) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Grow by `margin` millimetres on every side.
    pub fn inflate(&self, margin: f64) -> Self {
        Self::new(self.x - margin, self.y - margin, self.width + 2.0 * margin, self.height + 2.0 * margin)
    }
}

/// Clip the segment `p0 -> p1` to `rect` (Liang-Barsky).
///
/// Returns `None` when the segment misses the rectangle.
pub fn clip_segment(p0: PagePoint, p1: PagePoint, rect: &PageRect) -> Option<(PagePoint, PagePoint)> {
    let dx = p1.x - p0.x;
    let dy = p1.y - p0.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let checks = [
        (-dx, p0.x - rect.x),
        (dx, rect.right() - p0.x),
        (-dy, p0.y - rect.y),
        (dy, rect.bottom() - p0.y),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        PagePoint::new(p0.x + t0 * dx, p0.y + t0 * dy),
        PagePoint::new(p0.x + t1 * dx, p0.y + t1 * dy),
    ))
}

/// Even-odd point-in-polygon test on page coordinates.
pub fn polygon_contains(polygon: &[PagePoint], p: PagePoint) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_dimensions() {
        let e = Extent::new(781662.375, 3339523.125, 793062.375, 3345223.125);
        assert_eq!(e.width(), 11400.0);
        assert_eq!(e.height(), 5700.0);
        assert_eq!(e.center(), GeoPoint::new(787362.375, 3342373.125));
        assert!(e.is_valid());
    }

    #[test]
    fn test_degenerate_extent_invalid() {
        assert!(!Extent::new(10.0, 0.0, 10.0, 5.0).is_valid());
        assert!(!Extent::new(0.0, 5.0, 10.0, 5.0).is_valid());
        assert!(!Extent::new(0.0, 0.0, f64::NAN, 5.0).is_valid());
        assert!(!Extent::new(10.0, 0.0, 0.0, 5.0).is_valid());
    }

    #[test]
    fn test_fit_to_aspect_grows_short_side() {
        let e = Extent::new(0.0, 0.0, 100.0, 100.0);
        let wide = e.fit_to_aspect(2.0);
        assert_eq!(wide, Extent::new(-50.0, 0.0, 150.0, 100.0));

        let tall = e.fit_to_aspect(0.5);
        assert_eq!(tall, Extent::new(0.0, -50.0, 100.0, 150.0));

        assert_eq!(e.fit_to_aspect(0.0), e);
    }

    #[test]
    fn test_centered_on_keeps_size() {
        let e = Extent::new(0.0, 0.0, 10.0, 4.0);
        let moved = e.centered_on(GeoPoint::new(100.0, 100.0));
        assert_eq!(moved, Extent::new(95.0, 98.0, 105.0, 102.0));
    }

    #[test]
    fn test_contains() {
        let outer = Extent::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&Extent::new(1.0, 1.0, 9.0, 9.0)));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Extent::new(5.0, 5.0, 11.0, 9.0)));
    }

    #[test]
    fn test_from_points() {
        let pts = [GeoPoint::new(3.0, -1.0), GeoPoint::new(-2.0, 4.0), GeoPoint::new(1.0, 1.0)];
        assert_eq!(Extent::from_points(&pts), Some(Extent::new(-2.0, -1.0, 3.0, 4.0)));
        assert_eq!(Extent::from_points(&[]), None);
    }

    #[test]
    fn test_clip_segment_crossing() {
        let rect = PageRect::new(0.0, 0.0, 10.0, 10.0);
        let (a, b) = clip_segment(PagePoint::new(-5.0, 5.0), PagePoint::new(15.0, 5.0), &rect).unwrap();
        assert_eq!(a, PagePoint::new(0.0, 5.0));
        assert_eq!(b, PagePoint::new(10.0, 5.0));
    }

    #[test]
    fn test_clip_segment_outside() {
        let rect = PageRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(clip_segment(PagePoint::new(-5.0, 20.0), PagePoint::new(15.0, 20.0), &rect).is_none());
        assert!(clip_segment(PagePoint::new(-5.0, -5.0), PagePoint::new(-1.0, 20.0), &rect).is_none());
    }

    #[test]
    fn test_clip_segment_inside_untouched() {
        let rect = PageRect::new(0.0, 0.0, 10.0, 10.0);
        let (a, b) = clip_segment(PagePoint::new(2.0, 2.0), PagePoint::new(8.0, 3.0), &rect).unwrap();
        assert_eq!(a, PagePoint::new(2.0, 2.0));
        assert_eq!(b, PagePoint::new(8.0, 3.0));
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            PagePoint::new(0.0, 0.0),
            PagePoint::new(10.0, 0.0),
            PagePoint::new(10.0, 10.0),
            PagePoint::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&square, PagePoint::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, PagePoint::new(15.0, 5.0)));
        assert!(!polygon_contains(&square[..2], PagePoint::new(5.0, 0.0)));
    }

    #[test]
    fn test_page_rect_edges() {
        let r = PageRect::new(20.0, 20.0, 200.0, 100.0);
        assert_eq!(r.right(), 220.0);
        assert_eq!(r.bottom(), 120.0);
        assert_eq!(r.center(), PagePoint::new(120.0, 70.0));
        assert!(r.contains(PagePoint::new(20.0, 120.0)));
        assert!(!PageRect::new(0.0, 0.0, 0.0, 5.0).is_valid());
    }
}
