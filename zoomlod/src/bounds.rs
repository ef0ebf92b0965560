//! Bounding-box invalidation.
//!
//! Tracks the spatial extent (and resolution) of the last fetch and answers
//! whether the current map bounds are still covered by it.
//!
//! # BBOX semantics
//!
//! ```text
//! commit(map_bounds):  data bounds = map_bounds scaled ×ratio about its center
//! is_invalidated:      no data bounds
//!                      OR data bounds do not cover map_bounds
//!                      OR resolution changed by ≥ res_factor (when set)
//! ```
//!
//! Fetching a larger area than is visible (`ratio > 1`) lets small pans stay
//! inside the fetched extent without another request.

use geo::{Coord, Rect};

use crate::error::LodError;
use crate::view::MapView;

/// Default ratio of data bounds to map bounds.
pub const DEFAULT_BBOX_RATIO: f64 = 2.0;

/// Bounds bookkeeping used by the viewport controller.
///
/// The controller only decides; this collaborator owns the last-fetched
/// extent and resolution.
pub trait BoundsInvalidation: Send {
    /// Current map bounds in layer units, or `None` if the map has no extent.
    fn compute_map_bounds(&self, view: &dyn MapView) -> Result<Option<Rect<f64>>, LodError>;

    /// Whether `map_bounds` at `resolution` is no longer covered by the last fetch.
    fn is_invalidated(&self, map_bounds: &Rect<f64>, resolution: f64) -> bool;

    /// Record `map_bounds` and `resolution` as the extent of a new fetch.
    fn commit(&mut self, map_bounds: &Rect<f64>, resolution: f64);

    /// Forget the tracked extent so the next check invalidates.
    fn reset(&mut self);

    /// Extent of the last fetch, if any.
    fn bounds(&self) -> Option<Rect<f64>>;

    /// Resolution of the last fetch, if any.
    fn resolution(&self) -> Option<f64>;
}

/// Ratio-expanded bounding box invalidation.
#[derive(Debug, Clone)]
pub struct BboxInvalidation {
    ratio: f64,
    res_factor: Option<f64>,
    bounds: Option<Rect<f64>>,
    resolution: Option<f64>,
}

impl BboxInvalidation {
    /// Create with an explicit ratio and optional resolution factor.
    ///
    /// Ratios below 1 are raised to 1 so the data bounds always cover the
    /// map bounds they were computed from.
    pub fn new(ratio: f64, res_factor: Option<f64>) -> Self {
        Self {
            ratio: ratio.max(1.0),
            res_factor,
            bounds: None,
            resolution: None,
        }
    }

    /// Create with [`DEFAULT_BBOX_RATIO`] and no resolution factor.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_BBOX_RATIO, None)
    }

    /// Ratio of data bounds to map bounds.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Data bounds for `map_bounds`: same center, each side scaled by the ratio.
    pub fn data_bounds(&self, map_bounds: &Rect<f64>) -> Rect<f64> {
        let center = map_bounds.center();
        let half_width = map_bounds.width() * self.ratio / 2.0;
        let half_height = map_bounds.height() * self.ratio / 2.0;
        Rect::new(
            Coord {
                x: center.x - half_width,
                y: center.y - half_height,
            },
            Coord {
                x: center.x + half_width,
                y: center.y + half_height,
            },
        )
    }

    fn resolution_changed(&self, resolution: f64) -> bool {
        let (Some(factor), Some(last)) = (self.res_factor, self.resolution) else {
            return false;
        };
        if resolution <= 0.0 {
            return true;
        }
        let ratio = last / resolution;
        ratio >= factor || ratio <= 1.0 / factor
    }
}

impl Default for BboxInvalidation {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BoundsInvalidation for BboxInvalidation {
    fn compute_map_bounds(&self, view: &dyn MapView) -> Result<Option<Rect<f64>>, LodError> {
        Ok(view.extent())
    }

    fn is_invalidated(&self, map_bounds: &Rect<f64>, resolution: f64) -> bool {
        match &self.bounds {
            None => true,
            Some(bounds) => !covers(bounds, map_bounds) || self.resolution_changed(resolution),
        }
    }

    fn commit(&mut self, map_bounds: &Rect<f64>, resolution: f64) {
        self.bounds = Some(self.data_bounds(map_bounds));
        self.resolution = Some(resolution);
    }

    fn reset(&mut self) {
        self.bounds = None;
    }

    fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    fn resolution(&self) -> Option<f64> {
        self.resolution
    }
}

/// Whether `outer` contains `inner`, edges included.
pub fn covers(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new((x0, y0), (x1, y1))
    }

    #[test]
    fn test_invalidated_without_bounds() {
        let bbox = BboxInvalidation::with_defaults();
        assert!(bbox.is_invalidated(&rect(0.0, 0.0, 10.0, 10.0), 1.0));
    }

    #[test]
    fn test_commit_expands_by_ratio() {
        let mut bbox = BboxInvalidation::with_defaults();
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 1.0);

        assert_eq!(bbox.bounds(), Some(rect(-5.0, -5.0, 15.0, 15.0)));
        assert_eq!(bbox.resolution(), Some(1.0));
    }

    #[test]
    fn test_small_pan_stays_valid() {
        let mut bbox = BboxInvalidation::with_defaults();
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 1.0);
        assert!(!bbox.is_invalidated(&rect(3.0, 3.0, 13.0, 13.0), 1.0));
    }

    #[test]
    fn test_edge_touching_bounds_are_covered() {
        let mut bbox = BboxInvalidation::with_defaults();
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 1.0);
        assert!(!bbox.is_invalidated(&rect(-5.0, -5.0, 15.0, 15.0), 1.0));
    }

    #[test]
    fn test_large_pan_invalidates() {
        let mut bbox = BboxInvalidation::with_defaults();
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 1.0);
        assert!(bbox.is_invalidated(&rect(8.0, 0.0, 18.0, 10.0), 1.0));
    }

    #[test]
    fn test_resolution_factor() {
        let mut bbox = BboxInvalidation::new(2.0, Some(3.0));
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 9.0);

        assert!(!bbox.is_invalidated(&rect(0.0, 0.0, 10.0, 10.0), 6.0));
        assert!(bbox.is_invalidated(&rect(0.0, 0.0, 10.0, 10.0), 3.0));
        assert!(bbox.is_invalidated(&rect(0.0, 0.0, 10.0, 10.0), 27.0));
    }

    #[test]
    fn test_resolution_ignored_without_factor() {
        let mut bbox = BboxInvalidation::with_defaults();
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 9.0);
        assert!(!bbox.is_invalidated(&rect(0.0, 0.0, 10.0, 10.0), 0.001));
    }

    #[test]
    fn test_reset_forgets_bounds() {
        let mut bbox = BboxInvalidation::with_defaults();
        bbox.commit(&rect(0.0, 0.0, 10.0, 10.0), 1.0);
        bbox.reset();
        assert!(bbox.bounds().is_none());
        assert!(bbox.is_invalidated(&rect(0.0, 0.0, 10.0, 10.0), 1.0));
    }

    #[test]
    fn test_ratio_below_one_is_raised() {
        let bbox = BboxInvalidation::new(0.5, None);
        assert_eq!(bbox.ratio(), 1.0);
    }

    #[test]
    fn test_covers() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        assert!(covers(&outer, &rect(1.0, 1.0, 9.0, 9.0)));
        assert!(covers(&outer, &outer));
        assert!(!covers(&outer, &rect(-1.0, 1.0, 9.0, 9.0)));
    }
}
