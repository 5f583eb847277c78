//! Map grids: coordinate lines, annotations and zebra frames
//!
//! Grid geometry is computed in page millimetres so the renderer only has to
//! scale it to pixels. Lines are laid out over the bounding box of the visible
//! map area and clipped to the map frame, which keeps rotated maps covered.

use image::Rgba;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::{clip_segment, Extent, PagePoint, PageRect};

use super::blend::BlendMode;
use super::map::MapFrame;

/// Upper bound on lines per axis; tiny intervals on large extents stop here.
pub const MAX_GRID_LINES: usize = 10_000;

/// Most decimal places an annotation label carries.
pub const MAX_ANNOTATION_PRECISION: usize = 15;

/// Distance in millimetres within which a line end counts as lying on a frame side.
const SIDE_TOLERANCE_MM: f64 = 1e-6;

/// How grid lines are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridStyle {
    /// Continuous lines across the map
    Solid,
    /// Only crosses of `length_mm` at each intersection
    Cross { length_mm: f64 },
}

/// Whether a line has constant x (eastings) or constant y (northings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    X,
    Y,
}

/// A side of a map frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl FrameSide {
    pub const ALL: [FrameSide; 4] = [FrameSide::Left, FrameSide::Right, FrameSide::Top, FrameSide::Bottom];
}

/// Where annotations on one frame side are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationPosition {
    #[default]
    Disabled,
    #[serde(alias = "insidemapframe")]
    Inside,
    #[serde(alias = "outsidemapframe")]
    Outside,
}

/// Text direction of annotations on one frame side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationDirection {
    #[default]
    Horizontal,
    Vertical,
}

/// Grid frame decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridFrameStyle {
    #[default]
    None,
    Zebra,
}

/// Annotation settings for one frame side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SideAnnotation {
    pub position: AnnotationPosition,
    pub direction: AnnotationDirection,
}

impl SideAnnotation {
    pub fn new(position: AnnotationPosition, direction: AnnotationDirection) -> Self {
        Self { position, direction }
    }
}

/// Coordinate labels written at grid line ends.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAnnotation {
    /// Decimal places in the label text, at most [`MAX_ANNOTATION_PRECISION`]
    pub precision: usize,
    pub font_color: Rgba<u8>,
    pub font_size_mm: f64,
    /// Gap between the frame side and the label
    pub frame_distance_mm: f64,
    pub left: SideAnnotation,
    pub right: SideAnnotation,
    pub top: SideAnnotation,
    pub bottom: SideAnnotation,
}

impl Default for GridAnnotation {
    fn default() -> Self {
        let outside = SideAnnotation::new(AnnotationPosition::Outside, AnnotationDirection::Horizontal);
        Self {
            precision: 3,
            font_color: Rgba([0, 0, 0, 255]),
            font_size_mm: 3.0,
            frame_distance_mm: 1.0,
            left: outside,
            right: outside,
            top: outside,
            bottom: outside,
        }
    }
}

impl GridAnnotation {
    pub fn side(&self, side: FrameSide) -> &SideAnnotation {
        match side {
            FrameSide::Left => &self.left,
            FrameSide::Right => &self.right,
            FrameSide::Top => &self.top,
            FrameSide::Bottom => &self.bottom,
        }
    }

    pub fn side_mut(&mut self, side: FrameSide) -> &mut SideAnnotation {
        match side {
            FrameSide::Left => &mut self.left,
            FrameSide::Right => &mut self.right,
            FrameSide::Top => &mut self.top,
            FrameSide::Bottom => &mut self.bottom,
        }
    }

    /// Label text for a coordinate value.
    pub fn format_value(&self, value: f64) -> String {
        let text = format!("{:.*}", self.precision.min(MAX_ANNOTATION_PRECISION), value);
        // "-0" reads badly on a map
        if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
            text[1..].to_string()
        } else {
            text
        }
    }
}

/// Frame drawn around the map outside the map frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridFrame {
    pub style: GridFrameStyle,
    pub width_mm: f64,
    pub pen_size_mm: f64,
    pub pen_color: Rgba<u8>,
    pub fill_color1: Rgba<u8>,
    pub fill_color2: Rgba<u8>,
}

impl Default for GridFrame {
    fn default() -> Self {
        Self {
            style: GridFrameStyle::None,
            width_mm: 2.0,
            pen_size_mm: 0.5,
            pen_color: Rgba([0, 0, 0, 255]),
            fill_color1: Rgba([255, 255, 255, 255]),
            fill_color2: Rgba([0, 0, 0, 255]),
        }
    }
}

impl GridFrame {
    /// Width the frame occupies outside the map, zero when not drawn.
    pub fn outer_width(&self) -> f64 {
        match self.style {
            GridFrameStyle::Zebra => self.width_mm.max(0.0),
            GridFrameStyle::None => 0.0,
        }
    }
}

/// A grid line clipped to the map frame, in page millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub axis: GridAxis,
    /// Coordinate value in map units
    pub value: f64,
    pub start: PagePoint,
    pub end: PagePoint,
}

/// A positioned annotation label.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationLabel {
    pub text: String,
    pub side: FrameSide,
    pub position: AnnotationPosition,
    pub direction: AnnotationDirection,
    /// Point on the label's edge nearest the frame side, centered along the side
    pub anchor: PagePoint,
}

/// One filled block of a zebra frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZebraBlock {
    pub side: FrameSide,
    pub rect: PageRect,
    pub color: Rgba<u8>,
}

/// Grid configuration for a map frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub interval_x: f64,
    pub interval_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub style: GridStyle,
    pub pen_width_mm: f64,
    pub pen_color: Rgba<u8>,
    pub blend_mode: BlendMode,
    pub annotation: Option<GridAnnotation>,
    pub frame: GridFrame,
}

impl Grid {
    pub fn new(interval_x: f64, interval_y: f64) -> Self {
        Self {
            interval_x,
            interval_y,
            offset_x: 0.0,
            offset_y: 0.0,
            style: GridStyle::Solid,
            pen_width_mm: 0.3,
            pen_color: Rgba([0, 0, 0, 255]),
            blend_mode: BlendMode::Normal,
            annotation: None,
            frame: GridFrame::default(),
        }
    }

    /// Easting values of the grid lines between `min` and `max`.
    pub fn x_levels(&self, min: f64, max: f64) -> Vec<f64> {
        levels(min, max, self.interval_x, self.offset_x)
    }

    /// Northing values of the grid lines between `min` and `max`.
    pub fn y_levels(&self, min: f64, max: f64) -> Vec<f64> {
        levels(min, max, self.interval_y, self.offset_y)
    }

    /// Grid lines of `map`, clipped to its frame.
    pub fn grid_lines(&self, map: &MapFrame) -> Vec<GridLine> {
        let Some(to_page) = map.geo_to_page() else {
            return Vec::new();
        };
        let Some(bounds) = Extent::from_points(&map.visible_polygon()) else {
            return Vec::new();
        };

        let project = |x: f64, y: f64| {
            let (px, py) = to_page.apply(x, y);
            PagePoint::new(px, py)
        };

        let mut lines = Vec::new();
        for x in self.x_levels(bounds.xmin, bounds.xmax) {
            let p0 = project(x, bounds.ymin);
            let p1 = project(x, bounds.ymax);
            if let Some((start, end)) = clip_segment(p0, p1, &map.rect) {
                lines.push(GridLine { axis: GridAxis::X, value: x, start, end });
            }
        }
        for y in self.y_levels(bounds.ymin, bounds.ymax) {
            let p0 = project(bounds.xmin, y);
            let p1 = project(bounds.xmax, y);
            if let Some((start, end)) = clip_segment(p0, p1, &map.rect) {
                lines.push(GridLine { axis: GridAxis::Y, value: y, start, end });
            }
        }
        lines
    }

    /// Intersections of x and y lines inside the frame, for cross-style grids.
    pub fn intersections(&self, map: &MapFrame) -> Vec<PagePoint> {
        let Some(to_page) = map.geo_to_page() else {
            return Vec::new();
        };
        let Some(bounds) = Extent::from_points(&map.visible_polygon()) else {
            return Vec::new();
        };
        let ys = self.y_levels(bounds.ymin, bounds.ymax);
        let mut points = Vec::new();
        for x in self.x_levels(bounds.xmin, bounds.xmax) {
            for &y in &ys {
                let (px, py) = to_page.apply(x, y);
                let p = PagePoint::new(px, py);
                if map.rect.contains(p) {
                    points.push(p);
                }
            }
        }
        points
    }

    /// Arms of the crosses drawn at each intersection, along the grid directions.
    pub fn cross_segments(&self, map: &MapFrame, length_mm: f64) -> Vec<(PagePoint, PagePoint)> {
        let Some(to_page) = map.geo_to_page() else {
            return Vec::new();
        };
        let half = length_mm / 2.0;
        let unit = |dx: f64, dy: f64| {
            // linear part only
            let (x, y) = (to_page.a * dx + to_page.b * dy, to_page.d * dx + to_page.e * dy);
            let len = x.hypot(y);
            (x / len * half, y / len * half)
        };
        let along_x = unit(1.0, 0.0);
        let along_y = unit(0.0, 1.0);

        let mut segments = Vec::new();
        for p in self.intersections(map) {
            for (ux, uy) in [along_x, along_y] {
                let a = PagePoint::new(p.x - ux, p.y - uy);
                let b = PagePoint::new(p.x + ux, p.y + uy);
                if let Some(clipped) = clip_segment(a, b, &map.rect) {
                    segments.push(clipped);
                }
            }
        }
        segments
    }

    /// Annotation labels for every line end lying on an annotated frame side.
    pub fn annotations(&self, map: &MapFrame) -> Vec<AnnotationLabel> {
        let Some(annotation) = &self.annotation else {
            return Vec::new();
        };

        let mut labels = Vec::new();
        for line in self.grid_lines(map) {
            for end in [line.start, line.end] {
                let Some(side) = side_of(&map.rect, end) else {
                    continue;
                };
                let settings = annotation.side(side);
                let distance = match settings.position {
                    AnnotationPosition::Disabled => continue,
                    AnnotationPosition::Outside => annotation.frame_distance_mm + self.frame.outer_width(),
                    AnnotationPosition::Inside => -annotation.frame_distance_mm,
                };
                labels.push(AnnotationLabel {
                    text: annotation.format_value(line.value),
                    side,
                    position: settings.position,
                    direction: settings.direction,
                    anchor: offset_outward(end, side, distance),
                });
            }
        }
        labels
    }

    /// Alternating zebra blocks along each frame side, split at grid line ends.
    pub fn zebra_blocks(&self, map: &MapFrame) -> Vec<ZebraBlock> {
        if self.frame.style != GridFrameStyle::Zebra || self.frame.width_mm <= 0.0 {
            return Vec::new();
        }
        let rect = map.rect;
        let lines = self.grid_lines(map);
        let width = self.frame.width_mm;

        let mut blocks = Vec::new();
        for side in FrameSide::ALL {
            let (lo, hi) = match side {
                FrameSide::Left | FrameSide::Right => (rect.y, rect.bottom()),
                FrameSide::Top | FrameSide::Bottom => (rect.x, rect.right()),
            };
            let mut cuts: Vec<f64> = lines
                .iter()
                .flat_map(|l| [l.start, l.end])
                .filter(|p| side_of(&rect, *p) == Some(side))
                .map(|p| match side {
                    FrameSide::Left | FrameSide::Right => p.y,
                    FrameSide::Top | FrameSide::Bottom => p.x,
                })
                .filter(|v| *v > lo && *v < hi)
                .collect();
            cuts.push(lo);
            cuts.push(hi);
            cuts.sort_by(f64::total_cmp);
            cuts.dedup_by(|a, b| (*a - *b).abs() < SIDE_TOLERANCE_MM);

            for (i, pair) in cuts.windows(2).enumerate() {
                let (a, b) = (pair[0], pair[1]);
                let block = match side {
                    FrameSide::Left => PageRect::new(rect.x - width, a, width, b - a),
                    FrameSide::Right => PageRect::new(rect.right(), a, width, b - a),
                    FrameSide::Top => PageRect::new(a, rect.y - width, b - a, width),
                    FrameSide::Bottom => PageRect::new(a, rect.bottom(), b - a, width),
                };
                let color = if i % 2 == 0 { self.frame.fill_color1 } else { self.frame.fill_color2 };
                blocks.push(ZebraBlock { side, rect: block, color });
            }
        }
        blocks
    }
}

fn levels(min: f64, max: f64, interval: f64, offset: f64) -> Vec<f64> {
    if !(interval.is_finite() && interval > 0.0 && min.is_finite() && max.is_finite()) {
        return Vec::new();
    }
    let first = (((min - offset) / interval).floor() + 1.0) * interval + offset;
    let mut values = Vec::new();
    let mut i = 0.0;
    loop {
        let v = first + i * interval;
        if v > max {
            break;
        }
        if values.len() == MAX_GRID_LINES {
            warn!(interval, min, max, "grid interval too small, truncating lines");
            break;
        }
        values.push(v);
        i += 1.0;
    }
    values
}

/// The frame side a point lies on, if any.
pub(crate) fn side_of(rect: &PageRect, p: PagePoint) -> Option<FrameSide> {
    let near = |a: f64, b: f64| (a - b).abs() <= SIDE_TOLERANCE_MM;
    if near(p.y, rect.y) {
        Some(FrameSide::Top)
    } else if near(p.y, rect.bottom()) {
        Some(FrameSide::Bottom)
    } else if near(p.x, rect.x) {
        Some(FrameSide::Left)
    } else if near(p.x, rect.right()) {
        Some(FrameSide::Right)
    } else {
        None
    }
}

fn offset_outward(p: PagePoint, side: FrameSide, distance: f64) -> PagePoint {
    match side {
        FrameSide::Left => PagePoint::new(p.x - distance, p.y),
        FrameSide::Right => PagePoint::new(p.x + distance, p.y),
        FrameSide::Top => PagePoint::new(p.x, p.y - distance),
        FrameSide::Bottom => PagePoint::new(p.x, p.y + distance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn landsat_map() -> MapFrame {
        MapFrame::new(
            "map",
            PageRect::new(20.0, 20.0, 200.0, 100.0),
            Extent::new(781662.375, 3339523.125, 793062.375, 3345223.125),
        )
    }

    #[test]
    fn test_levels_start_above_minimum() {
        let grid = Grid::new(2000.0, 2000.0);
        assert_eq!(
            grid.x_levels(781662.375, 793062.375),
            vec![782000.0, 784000.0, 786000.0, 788000.0, 790000.0, 792000.0]
        );
        assert_eq!(grid.y_levels(3339523.125, 3345223.125), vec![3340000.0, 3342000.0, 3344000.0]);
    }

    #[test]
    fn test_levels_skip_exact_minimum() {
        let grid = Grid::new(10.0, 10.0);
        assert_eq!(grid.x_levels(0.0, 30.0), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_levels_with_offset_and_negative_range() {
        let mut grid = Grid::new(10.0, 10.0);
        grid.offset_x = 5.0;
        assert_eq!(grid.x_levels(-20.0, 10.0), vec![-15.0, -5.0, 5.0]);
    }

    #[test]
    fn test_levels_invalid_interval() {
        let grid = Grid::new(0.0, -5.0);
        assert!(grid.x_levels(0.0, 100.0).is_empty());
        assert!(grid.y_levels(0.0, 100.0).is_empty());
    }

    #[test]
    fn test_levels_are_capped() {
        let grid = Grid::new(1e-6, 1.0);
        assert_eq!(grid.x_levels(0.0, 1.0).len(), MAX_GRID_LINES);
    }

    #[test]
    fn test_unrotated_lines_span_the_frame() {
        let grid = Grid::new(2000.0, 2000.0);
        let map = landsat_map();
        let lines = grid.grid_lines(&map);
        assert_eq!(lines.len(), 9);

        let first = lines[0];
        assert_eq!(first.axis, GridAxis::X);
        assert_eq!(first.value, 782000.0);
        // (782000 - 781662.375) / 57 mm from the left frame edge
        assert_abs_diff_eq!(first.start.x, 20.0 + 337.625 / 57.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.start.y, 120.0, epsilon = 1e-9);
        assert_abs_diff_eq!(first.end.y, 20.0, epsilon = 1e-9);

        let northing = lines.iter().find(|l| l.axis == GridAxis::Y).unwrap();
        assert_abs_diff_eq!(northing.start.x, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(northing.end.x, 220.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_lines_stay_inside_frame() {
        let grid = Grid::new(2000.0, 2000.0);
        let map = landsat_map().with_rotation(30.0);
        let lines = grid.grid_lines(&map);
        assert!(!lines.is_empty());
        let frame = map.rect.inflate(1e-9);
        for line in lines {
            assert!(frame.contains(line.start), "{:?}", line);
            assert!(frame.contains(line.end), "{:?}", line);
        }
    }

    #[test]
    fn test_intersections() {
        let grid = Grid::new(2000.0, 2000.0);
        assert_eq!(grid.intersections(&landsat_map()).len(), 6 * 3);
    }

    #[test]
    fn test_cross_arms_follow_grid_directions() {
        let grid = Grid::new(2000.0, 2000.0);
        let segments = grid.cross_segments(&landsat_map(), 4.0);
        assert_eq!(segments.len(), 2 * 18);

        let (a, b) = segments[0];
        // unrotated: first arm is horizontal and 4 mm long
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
        assert_abs_diff_eq!(b.x - a.x, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_annotations_only_on_enabled_sides() {
        let mut grid = Grid::new(2000.0, 2000.0);
        let mut annotation = GridAnnotation { precision: 0, ..Default::default() };
        annotation.left.position = AnnotationPosition::Disabled;
        annotation.top.position = AnnotationPosition::Disabled;
        grid.annotation = Some(annotation);

        let labels = grid.annotations(&landsat_map());
        assert_eq!(labels.iter().filter(|l| l.side == FrameSide::Bottom).count(), 6);
        assert_eq!(labels.iter().filter(|l| l.side == FrameSide::Right).count(), 3);
        assert!(labels.iter().all(|l| l.side == FrameSide::Bottom || l.side == FrameSide::Right));

        let bottom = labels.iter().find(|l| l.side == FrameSide::Bottom).unwrap();
        assert_eq!(bottom.text, "782000");
        assert_abs_diff_eq!(bottom.anchor.y, 121.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inside_annotations_move_into_the_map() {
        let mut grid = Grid::new(2000.0, 2000.0);
        let mut annotation = GridAnnotation::default();
        for side in FrameSide::ALL {
            annotation.side_mut(side).position = AnnotationPosition::Inside;
        }
        grid.annotation = Some(annotation);
        let map = landsat_map();
        for label in grid.annotations(&map) {
            assert!(map.rect.contains(label.anchor), "{:?}", label);
        }
    }

    #[test]
    fn test_outside_annotations_clear_the_zebra_frame() {
        let mut grid = Grid::new(2000.0, 2000.0);
        grid.frame.style = GridFrameStyle::Zebra;
        grid.frame.width_mm = 10.0;
        grid.annotation = Some(GridAnnotation::default());
        let labels = grid.annotations(&landsat_map());
        let top = labels.iter().find(|l| l.side == FrameSide::Top).unwrap();
        assert_abs_diff_eq!(top.anchor.y, 20.0 - 11.0, epsilon = 1e-9);
    }

    #[test]
    fn test_format_value() {
        let annotation = GridAnnotation { precision: 2, ..Default::default() };
        assert_eq!(annotation.format_value(3342000.0), "3342000.00");
        assert_eq!(annotation.format_value(-0.001), "0.00");
        assert_eq!(annotation.format_value(-12.5), "-12.50");
    }

    #[test]
    fn test_format_value_precision_is_capped() {
        let annotation = GridAnnotation { precision: usize::MAX, ..Default::default() };
        assert_eq!(annotation.format_value(0.5), format!("0.5{}", "0".repeat(MAX_ANNOTATION_PRECISION - 1)));
    }

    #[test]
    fn test_zebra_blocks_alternate() {
        let mut grid = Grid::new(2000.0, 2000.0);
        grid.frame.style = GridFrameStyle::Zebra;
        grid.frame.width_mm = 10.0;
        let blocks = grid.zebra_blocks(&landsat_map());

        // 6 eastings split top and bottom into 7 blocks, 3 northings split the sides into 4
        let top: Vec<_> = blocks.iter().filter(|b| b.side == FrameSide::Top).collect();
        let left: Vec<_> = blocks.iter().filter(|b| b.side == FrameSide::Left).collect();
        assert_eq!(top.len(), 7);
        assert_eq!(left.len(), 4);
        assert_eq!(blocks.len(), 7 + 7 + 4 + 4);

        assert_eq!(top[0].color, grid.frame.fill_color1);
        assert_eq!(top[1].color, grid.frame.fill_color2);
        assert_eq!(top[0].rect.y, 10.0);
        assert_eq!(top[0].rect.x, 20.0);
        assert_eq!(left[0].rect.x, 10.0);

        let covered: f64 = top.iter().map(|b| b.rect.width).sum();
        assert_abs_diff_eq!(covered, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_zebra_without_style() {
        let grid = Grid::new(2000.0, 2000.0);
        assert!(grid.zebra_blocks(&landsat_map()).is_empty());
    }
}
