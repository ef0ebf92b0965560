//! Adaptive detail level selection.
//!
//! Decides which [`DetailLevel`] should govern the next fetch, given the
//! previous decision and the features currently on screen.
//!
//! # Algorithm
//!
//! ```text
//! same zoom as last decision      → keep last level
//! no baseline or no features      → default table[zoom]
//! all features degenerate         → default table[zoom]
//! zooming in,  mean area > T      → one step finer  (max L5)
//! zooming out, mean area < T      → one step coarser (min L0)
//! otherwise                       → keep last level
//! ```
//!
//! `T` is the area threshold ([`AREA_THRESHOLD`] by default). The level moves
//! at most one step per view change, so a single gesture never causes a large
//! jump in request granularity. The mean on-screen area of the visible
//! features acts as the hysteresis signal: large features on screen mean the
//! user must zoom in further before the level is refined.

use std::fmt;

use crate::area::estimate_pixel_area;
use crate::level::DetailLevel;
use crate::table::{ZoomLevelTable, DEFAULT_LEVEL_TABLE};
use crate::view::Feature;

/// Default mean on-screen area threshold in pixels².
pub const AREA_THRESHOLD: f64 = 500_000.0;

/// The zoom and level of the previous decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    /// Zoom level at the previous decision.
    pub zoom: u8,
    /// Level chosen at the previous decision.
    pub level: DetailLevel,
}

impl Baseline {
    /// Create a baseline.
    pub fn new(zoom: u8, level: DetailLevel) -> Self {
        Self { zoom, level }
    }
}

/// Direction of a zoom change relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    /// `new_zoom > baseline.zoom`.
    In,
    /// `new_zoom <= baseline.zoom`.
    Out,
}

impl ZoomDirection {
    /// Classify a zoom change. Equal zoom counts as zooming out.
    pub fn between(from: u8, to: u8) -> Self {
        if to > from {
            ZoomDirection::In
        } else {
            ZoomDirection::Out
        }
    }
}

impl fmt::Display for ZoomDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoomDirection::In => write!(f, "in"),
            ZoomDirection::Out => write!(f, "out"),
        }
    }
}

/// How a level was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionBasis {
    /// Zoom unchanged; previous level reused.
    Cached,
    /// Looked up in the default table.
    Table,
    /// Refined from the baseline using the mean on-screen feature area.
    Refined {
        /// Zoom direction relative to the baseline.
        direction: ZoomDirection,
        /// Mean pixel area of the non-degenerate features.
        mean_area: f64,
        /// Number of features excluded as degenerate.
        excluded: usize,
    },
}

/// Result of a level selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelSelection {
    /// Selected level.
    pub level: DetailLevel,
    /// How it was selected.
    pub basis: SelectionBasis,
}

impl LevelSelection {
    /// Mean pixel area used for refinement, if any.
    pub fn mean_area(&self) -> Option<f64> {
        match self.basis {
            SelectionBasis::Refined { mean_area, .. } => Some(mean_area),
            _ => None,
        }
    }
}

/// Mean on-screen area of a feature set at a zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaStats {
    /// Mean pixel area over the counted features.
    pub mean: f64,
    /// Features that produced an estimate.
    pub counted: usize,
    /// Features excluded as degenerate.
    pub excluded: usize,
}

impl AreaStats {
    /// Compute the mean pixel area, or `None` when no feature has an estimate.
    pub fn compute(features: &[Feature], zoom: u8) -> Option<Self> {
        let mut total = 0.0;
        let mut counted = 0;
        let mut excluded = 0;

        for feature in features {
            match estimate_pixel_area(&feature.geometry, zoom) {
                Some(pixels) => {
                    total += pixels;
                    counted += 1;
                }
                None => excluded += 1,
            }
        }

        if counted == 0 {
            return None;
        }

        Some(Self {
            mean: total / counted as f64,
            counted,
            excluded,
        })
    }
}

/// Selects detail levels from the default table and on-screen feature areas.
#[derive(Debug, Clone)]
pub struct LevelSelector {
    table: ZoomLevelTable,
    area_threshold: f64,
}

impl LevelSelector {
    /// Create a selector with an explicit table and threshold.
    pub fn new(table: ZoomLevelTable, area_threshold: f64) -> Self {
        Self {
            table,
            area_threshold,
        }
    }

    /// Create a selector with the default table and threshold.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_LEVEL_TABLE, AREA_THRESHOLD)
    }

    /// The table used as the no-introspection fallback.
    pub fn table(&self) -> &ZoomLevelTable {
        &self.table
    }

    /// The mean pixel area threshold.
    pub fn area_threshold(&self) -> f64 {
        self.area_threshold
    }

    /// Select the level for `new_zoom`.
    ///
    /// Reuses the baseline level when the zoom has not changed.
    pub fn select(
        &self,
        baseline: Option<Baseline>,
        new_zoom: u8,
        features: &[Feature],
    ) -> LevelSelection {
        match baseline {
            Some(b) if b.zoom == new_zoom => LevelSelection {
                level: b.level,
                basis: SelectionBasis::Cached,
            },
            _ => self.refine(baseline, new_zoom, features),
        }
    }

    /// Select the level for `new_zoom` without the unchanged-zoom shortcut.
    ///
    /// An unchanged zoom takes the zoom-out branch.
    pub fn refine(
        &self,
        baseline: Option<Baseline>,
        new_zoom: u8,
        features: &[Feature],
    ) -> LevelSelection {
        let Some(baseline) = baseline else {
            return self.table_selection(new_zoom);
        };
        if features.is_empty() {
            return self.table_selection(new_zoom);
        }
        let Some(stats) = AreaStats::compute(features, new_zoom) else {
            tracing::debug!(
                features = features.len(),
                zoom = new_zoom,
                "No feature has an area estimate, using default table"
            );
            return self.table_selection(new_zoom);
        };

        let direction = ZoomDirection::between(baseline.zoom, new_zoom);
        let level = match direction {
            ZoomDirection::In if stats.mean > self.area_threshold => baseline.level.finer(),
            ZoomDirection::Out if stats.mean < self.area_threshold => baseline.level.coarser(),
            _ => baseline.level,
        };

        tracing::debug!(
            mean_area = stats.mean,
            counted = stats.counted,
            excluded = stats.excluded,
            from_zoom = baseline.zoom,
            to_zoom = new_zoom,
            %direction,
            from_level = %baseline.level,
            to_level = %level,
            "Refined detail level"
        );

        LevelSelection {
            level,
            basis: SelectionBasis::Refined {
                direction,
                mean_area: stats.mean,
                excluded: stats.excluded,
            },
        }
    }

    fn table_selection(&self, zoom: u8) -> LevelSelection {
        LevelSelection {
            level: self.table.level_for(zoom),
            basis: SelectionBasis::Table,
        }
    }
}

impl Default for LevelSelector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::EARTH_RADIUS_M;
    use geo::{point, Geometry, Polygon, Rect};
    use proptest::prelude::*;

    /// Square centred on the equator (centroid y = 0, so cos(lat) = 1).
    fn centred_square(side: f64) -> Feature {
        let half = side / 2.0;
        let poly: Polygon<f64> = Rect::new((-half, -half), (half, half)).to_polygon();
        Feature::new(poly)
    }

    /// Feature whose estimated area at `zoom` is `pixels`.
    fn feature_with_pixels(pixels: f64, zoom: u8) -> Feature {
        let mpp = EARTH_RADIUS_M / 2.0_f64.powi(zoom as i32 + 8);
        centred_square(pixels.sqrt() * mpp)
    }

    fn point_feature() -> Feature {
        Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0)))
    }

    fn level(v: u8) -> DetailLevel {
        DetailLevel::new(v).unwrap()
    }

    #[test]
    fn test_same_zoom_returns_cached_level() {
        let selector = LevelSelector::with_defaults();
        let features = vec![centred_square(1.0e6)];

        let selection = selector.select(Some(Baseline::new(5, level(3))), 5, &features);
        assert_eq!(selection.level, level(3));
        assert_eq!(selection.basis, SelectionBasis::Cached);
    }

    #[test]
    fn test_empty_features_use_table() {
        let selector = LevelSelector::with_defaults();
        let selection = selector.select(Some(Baseline::new(4, level(5))), 9, &[]);
        assert_eq!(selection.level, level(3));
        assert_eq!(selection.basis, SelectionBasis::Table);
    }

    #[test]
    fn test_no_baseline_uses_table() {
        let selector = LevelSelector::with_defaults();
        let features = vec![centred_square(1.0e6)];
        let selection = selector.select(None, 14, &features);
        assert_eq!(selection.level, level(4));
        assert_eq!(selection.basis, SelectionBasis::Table);
    }

    #[test]
    fn test_all_degenerate_features_use_table() {
        let selector = LevelSelector::with_defaults();
        let features = vec![point_feature(), point_feature()];
        let selection = selector.select(Some(Baseline::new(4, level(0))), 7, &features);
        assert_eq!(selection.level, level(2));
        assert_eq!(selection.basis, SelectionBasis::Table);
    }

    #[test]
    fn test_zoom_in_large_features_refines() {
        // Zoom 4 → 6, mean area 600000 px² at zoom 6.
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(600_000.0, 6)];

        let selection = selector.select(Some(Baseline::new(4, level(1))), 6, &features);
        assert_eq!(selection.level, level(2));
        let mean = selection.mean_area().unwrap();
        assert!((mean - 600_000.0).abs() / 600_000.0 < 1e-6, "mean {}", mean);
    }

    #[test]
    fn test_zoom_in_small_features_keeps_level() {
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(400_000.0, 6)];
        let selection = selector.select(Some(Baseline::new(4, level(1))), 6, &features);
        assert_eq!(selection.level, level(1));
    }

    #[test]
    fn test_zoom_in_clamps_at_max() {
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(5_000_000.0, 17)];
        let selection = selector.select(Some(Baseline::new(16, level(5))), 17, &features);
        assert_eq!(selection.level, DetailLevel::MAX);
    }

    #[test]
    fn test_zoom_out_small_features_coarsens() {
        // Zoom 10 → 8, mean area 100000 px² at zoom 8.
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(100_000.0, 8)];

        let selection = selector.select(Some(Baseline::new(10, level(3))), 8, &features);
        assert_eq!(selection.level, level(2));
        assert!(matches!(
            selection.basis,
            SelectionBasis::Refined {
                direction: ZoomDirection::Out,
                ..
            }
        ));
    }

    #[test]
    fn test_zoom_out_large_features_keeps_level() {
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(900_000.0, 8)];
        let selection = selector.select(Some(Baseline::new(10, level(3))), 8, &features);
        assert_eq!(selection.level, level(3));
    }

    #[test]
    fn test_zoom_out_clamps_at_min() {
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(10.0, 2)];
        let selection = selector.select(Some(Baseline::new(3, level(0))), 2, &features);
        assert_eq!(selection.level, DetailLevel::MIN);
    }

    #[test]
    fn test_degenerate_features_excluded_from_mean() {
        // One 600000 px² polygon plus points: mean must stay 600000, not drop.
        let selector = LevelSelector::with_defaults();
        let features = vec![
            feature_with_pixels(600_000.0, 6),
            point_feature(),
            point_feature(),
        ];
        let selection = selector.select(Some(Baseline::new(4, level(1))), 6, &features);
        assert_eq!(selection.level, level(2));
        match selection.basis {
            SelectionBasis::Refined { excluded, .. } => assert_eq!(excluded, 2),
            other => panic!("unexpected basis {:?}", other),
        }
    }

    #[test]
    fn test_refine_same_zoom_takes_zoom_out_branch() {
        let selector = LevelSelector::with_defaults();
        let features = vec![feature_with_pixels(1_000.0, 9)];
        let selection = selector.refine(Some(Baseline::new(9, level(3))), 9, &features);
        assert_eq!(selection.level, level(2));
    }

    #[test]
    fn test_custom_threshold() {
        let selector = LevelSelector::new(DEFAULT_LEVEL_TABLE, 100.0);
        let features = vec![feature_with_pixels(200.0, 6)];
        let selection = selector.select(Some(Baseline::new(5, level(1))), 6, &features);
        assert_eq!(selection.level, level(2));
    }

    #[test]
    fn test_area_stats_counts() {
        let features = vec![feature_with_pixels(1_000.0, 5), point_feature()];
        let stats = AreaStats::compute(&features, 5).unwrap();
        assert_eq!(stats.counted, 1);
        assert_eq!(stats.excluded, 1);
        assert!(AreaStats::compute(&[point_feature()], 5).is_none());
    }

    proptest! {
        #[test]
        fn prop_empty_features_match_table(zoom in 0u8..=18, prev_zoom in 0u8..=18, prev in 0u8..=5) {
            prop_assume!(zoom != prev_zoom);
            let selector = LevelSelector::with_defaults();
            let selection = selector.select(Some(Baseline::new(prev_zoom, level(prev))), zoom, &[]);
            prop_assert_eq!(selection.level, DEFAULT_LEVEL_TABLE.level_for(zoom));
        }

        #[test]
        fn prop_same_zoom_keeps_level(zoom in 0u8..=18, prev in 0u8..=5, side in 1.0f64..1.0e7) {
            let selector = LevelSelector::with_defaults();
            let features = vec![centred_square(side), point_feature()];
            let selection = selector.select(Some(Baseline::new(zoom, level(prev))), zoom, &features);
            prop_assert_eq!(selection.level, level(prev));
        }

        #[test]
        fn prop_level_moves_at_most_one_step(
            prev_zoom in 0u8..=18,
            zoom in 0u8..=18,
            prev in 0u8..=5,
            sides in proptest::collection::vec(1.0f64..1.0e7, 1..8),
        ) {
            let selector = LevelSelector::with_defaults();
            let features: Vec<Feature> = sides.into_iter().map(centred_square).collect();
            let selection = selector.select(Some(Baseline::new(prev_zoom, level(prev))), zoom, &features);
            let got = selection.level.value() as i16;
            prop_assert!((got - prev as i16).abs() <= 1);
            prop_assert!(selection.level <= DetailLevel::MAX);
        }
    }
}
