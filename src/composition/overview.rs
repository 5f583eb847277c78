//! Overview frames: the footprint of one map drawn inside another

use image::Rgba;

use crate::geometry::{Extent, PagePoint};

use super::blend::BlendMode;
use super::map::MapFrame;

/// Draws the visible area of `frame_map` onto the map that owns this overview.
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    /// Id of the map whose extent is shown
    pub frame_map: String,
    pub fill_color: Rgba<u8>,
    pub blend_mode: BlendMode,
    /// Fill everything except the footprint
    pub inverted: bool,
    /// Keep the footprint in view by moving the overview extent
    pub centered: bool,
}

impl Overview {
    pub fn new(frame_map: impl Into<String>) -> Self {
        Self {
            frame_map: frame_map.into(),
            fill_color: Rgba([255, 0, 0, 75]),
            blend_mode: BlendMode::Normal,
            inverted: false,
            centered: false,
        }
    }

    /// The extent the overview map shows.
    ///
    /// A centered overview that does not fully contain the source extent is
    /// moved, keeping its size, onto the source extent's center.
    pub fn overview_extent(&self, overview_extent: &Extent, source_extent: &Extent) -> Extent {
        if self.centered && !overview_extent.contains(source_extent) {
            overview_extent.centered_on(source_extent.center())
        } else {
            *overview_extent
        }
    }

    /// The source map's visible area in page millimetres of the overview map.
    ///
    /// `None` when the overview map's transform is degenerate.
    pub fn footprint(overview_map: &MapFrame, source_map: &MapFrame) -> Option<Vec<PagePoint>> {
        let to_page = overview_map.geo_to_page()?;
        Some(
            source_map
                .visible_polygon()
                .iter()
                .map(|p| {
                    let (x, y) = to_page.apply(p.x, p.y);
                    PagePoint::new(x, y)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PageRect;
    use approx::assert_abs_diff_eq;

    fn overview_map() -> MapFrame {
        MapFrame::new(
            "overview",
            PageRect::new(20.0, 130.0, 70.0, 70.0),
            Extent::new(781662.375, 3339523.125, 793062.375, 3350923.125),
        )
    }

    fn zoomed_map() -> MapFrame {
        MapFrame::new(
            "map",
            PageRect::new(20.0, 20.0, 200.0, 100.0),
            Extent::new(785462.375, 3341423.125, 789262.375, 3343323.125),
        )
    }

    #[test]
    fn test_footprint_of_zoomed_map() {
        let footprint = Overview::footprint(&overview_map(), &zoomed_map()).unwrap();
        assert_eq!(footprint.len(), 4);

        // 11400 units across 70 mm
        let k = 11400.0 / 70.0;
        assert_abs_diff_eq!(footprint[0].x, 20.0 + 3800.0 / k, epsilon = 1e-9);
        assert_abs_diff_eq!(footprint[0].y, 130.0 + (3350923.125 - 3343323.125) / k, epsilon = 1e-9);
        assert_abs_diff_eq!(footprint[2].x, 20.0 + 7600.0 / k, epsilon = 1e-9);
    }

    #[test]
    fn test_centered_moves_only_when_source_leaves_view() {
        let mut overview = Overview::new("map");
        overview.centered = true;
        let own = overview_map().extent;

        // fully visible: unchanged
        assert_eq!(overview.overview_extent(&own, &zoomed_map().extent), own);

        // shifted east past the overview edge: recentered
        let shifted = Extent::new(790462.375, 3341423.125, 794262.375, 3343323.125);
        let moved = overview.overview_extent(&own, &shifted);
        assert_eq!(moved.center(), shifted.center());
        assert_abs_diff_eq!(moved.width(), own.width(), epsilon = 1e-9);
    }

    #[test]
    fn test_not_centered_never_moves() {
        let overview = Overview::new("map");
        let own = overview_map().extent;
        let far = Extent::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(overview.overview_extent(&own, &far), own);
    }
}
