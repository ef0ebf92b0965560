//! Map surface abstraction and view state.
//!
//! The map surface (rendering, interaction, layer bookkeeping) lives outside
//! this crate. The strategy only needs to read a handful of values from it,
//! captured by the [`MapView`] trait.

use geo::{Geometry, Point, Rect};

/// A rendered feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier assigned by the data source, if any.
    pub id: Option<String>,
    /// Geometry in map units.
    pub geometry: Geometry<f64>,
}

impl Feature {
    /// Create a feature without an identifier.
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: None,
            geometry: geometry.into(),
        }
    }

    /// Create a feature with an identifier.
    pub fn with_id(id: impl Into<String>, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: Some(id.into()),
            geometry: geometry.into(),
        }
    }
}

/// Read-only view of the live map and the layer being fed.
///
/// Implemented by the hosting map client. All methods are cheap queries of
/// current state; none of them may block.
pub trait MapView {
    /// Current map center.
    fn center(&self) -> Point<f64>;

    /// Current integer zoom level.
    fn zoom(&self) -> u8;

    /// Current resolution (map units per pixel).
    fn resolution(&self) -> f64;

    /// Visible extent in map units, or `None` if the map has no extent yet.
    fn extent(&self) -> Option<Rect<f64>>;

    /// Features currently rendered by the layer.
    fn features(&self) -> Vec<Feature>;

    /// Whether the layer is visible.
    fn is_visible(&self) -> bool;

    /// Whether the current resolution is within the layer's scale range.
    fn in_scale_range(&self) -> bool;
}

/// Snapshot of the view a fetch decision was made for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Map center.
    pub center: Point<f64>,
    /// Zoom level.
    pub zoom: u8,
    /// Map bounds in map units.
    pub bounds: Rect<f64>,
    /// Resolution (map units per pixel).
    pub resolution: f64,
}
