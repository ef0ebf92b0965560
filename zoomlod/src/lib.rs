//! ZoomLOD - viewport-driven level-of-detail fetching for map clients
//!
//! On every pan or zoom the [`ViewportController`] decides whether the data
//! already fetched for a layer still covers the view, picks a detail level
//! (0 coarsest to 5 finest) from the zoom and the on-screen size of the
//! features currently drawn, and hands the read to a
//! [`FetchLifecycleManager`], which supersedes any read still in flight.
//!
//! The map surface, the transport, and the feature store are supplied by
//! the host through the [`MapView`], [`Protocol`], and [`FeatureSink`]
//! traits.
//!
//! ```text
//! MapView ──► ViewportController ──► LevelSelector ──► area estimate
//!                    │
//!                    ├──► BoundsInvalidation
//!                    └──► FetchLifecycleManager ──► Protocol
//!                                   └── on_complete ──► FeatureSink
//! ```

pub mod area;
pub mod bounds;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod level;
pub mod logging;
pub mod selector;
pub mod store;
pub mod table;
pub mod view;

pub use area::{estimate_pixel_area, meters_per_pixel, EARTH_RADIUS_M};
pub use bounds::{BboxInvalidation, BoundsInvalidation};
pub use config::{ConfigError, LodConfig};
pub use controller::{FetchTrigger, SkipReason, UpdateOptions, UpdateOutcome, ViewportController};
pub use error::LodError;
pub use fetch::{
    FetchLifecycleManager, Filter, LoadEvent, LoadOutcome, Protocol, ReadOptions, ReadRequest,
    ReadResponse, ReadStatus, RequestHandle, RequestId,
};
pub use level::DetailLevel;
pub use selector::{LevelSelection, LevelSelector, SelectionBasis, AREA_THRESHOLD};
pub use store::{FeatureSink, FeatureStore};
pub use table::{ExceptionRegion, ExceptionRegions, ZoomLevelTable, DEFAULT_LEVEL_TABLE};
pub use view::{Feature, MapView, ViewState};

/// Geometry types used throughout the public API.
pub use geo;
