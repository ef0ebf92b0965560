//! Viewport invalidation controller.
//!
//! Runs one decision cycle per view change: recompute the detail level,
//! recompute the map bounds, decide whether the previously fetched data is
//! still good enough, and if not hand off to the fetch layer.
//!
//! # Decision
//!
//! ```text
//! map bounds unavailable                         → skip (nothing cached)
//! force                                          → fetch
//! visible && in range && bounds invalidated      → fetch
//! new level != previous level                    → fetch
//! otherwise                                      → skip
//! ```
//!
//! Level, center and zoom are cached on every cycle that produced map
//! bounds, whether or not it fetched, so the next cycle compares against
//! the most recently observed view.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bounds::{BboxInvalidation, BoundsInvalidation};
use crate::config::LodConfig;
use crate::error::LodError;
use crate::fetch::{FetchLifecycleManager, LoadEvent, Protocol, ReadOptions, RequestId};
use crate::level::DetailLevel;
use crate::selector::{Baseline, LevelSelection, LevelSelector};
use crate::store::FeatureSink;
use crate::table::ExceptionRegions;
use crate::view::{MapView, ViewState};

/// Options for a single update cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Fetch unconditionally.
    pub force: bool,
    /// Options forwarded to the read.
    pub read: ReadOptions,
}

impl UpdateOptions {
    /// Options for an unconditional fetch.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Default::default()
        }
    }

    /// Leave any in-flight read running.
    pub fn no_abort(mut self) -> Self {
        self.read.no_abort = true;
        self
    }

    /// Add an extra request parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.read.params.insert(key.into(), value.into());
        self
    }

    /// Extra request parameters.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.read.params
    }
}

/// Why a cycle fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    /// The caller forced the fetch.
    Forced,
    /// The fetched extent no longer covers the view.
    BoundsInvalidated,
    /// The detail level changed.
    LevelChanged,
}

impl fmt::Display for FetchTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTrigger::Forced => write!(f, "forced"),
            FetchTrigger::BoundsInvalidated => write!(f, "bounds invalidated"),
            FetchTrigger::LevelChanged => write!(f, "level changed"),
        }
    }
}

/// Why a cycle did not fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The map has no bounds yet.
    NoMapBounds,
    /// The fetched data still covers the view at the same level.
    StillValid,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMapBounds => write!(f, "no map bounds"),
            SkipReason::StillValid => write!(f, "still valid"),
        }
    }
}

/// Result of an update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A read was issued.
    Fetched {
        request: RequestId,
        level: DetailLevel,
        trigger: FetchTrigger,
    },
    /// No read was issued.
    Skipped {
        level: DetailLevel,
        reason: SkipReason,
    },
}

impl UpdateOutcome {
    /// Whether a read was issued.
    pub fn fetched(&self) -> bool {
        matches!(self, UpdateOutcome::Fetched { .. })
    }

    /// Level selected during the cycle.
    pub fn level(&self) -> DetailLevel {
        match self {
            UpdateOutcome::Fetched { level, .. } | UpdateOutcome::Skipped { level, .. } => *level,
        }
    }
}

/// View and level of the most recent decision.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Decision {
    view: ViewState,
    level: DetailLevel,
}

/// Decides, per view change, whether and at what level to re-fetch.
pub struct ViewportController<B, P> {
    selector: LevelSelector,
    exceptions: ExceptionRegions,
    bounds: B,
    fetch: FetchLifecycleManager<P>,
    last: Option<Decision>,
    last_selection: Option<LevelSelection>,
}

impl<B: fmt::Debug, P> fmt::Debug for ViewportController<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewportController")
            .field("selector", &self.selector)
            .field("exceptions", &self.exceptions.len())
            .field("bounds", &self.bounds)
            .field("fetch", &self.fetch)
            .field("last", &self.last)
            .finish()
    }
}

impl<P: Protocol> ViewportController<BboxInvalidation, P> {
    /// Build a controller with ratio-expanded bbox invalidation from `config`.
    pub fn from_config(config: LodConfig, protocol: P, sink: Arc<dyn FeatureSink>) -> Self {
        let bounds = BboxInvalidation::new(config.bbox_ratio, config.res_factor);
        let fetch = FetchLifecycleManager::new(protocol, sink)
            .with_attribute_filter(config.attribute_filter);
        let selector = LevelSelector::new(config.levels, config.area_threshold);

        Self::new(selector, bounds, fetch).with_exceptions(config.exceptions)
    }
}

impl<B: BoundsInvalidation, P: Protocol> ViewportController<B, P> {
    /// Create a controller from its collaborators.
    pub fn new(selector: LevelSelector, bounds: B, fetch: FetchLifecycleManager<P>) -> Self {
        Self {
            selector,
            exceptions: ExceptionRegions::default(),
            bounds,
            fetch,
            last: None,
            last_selection: None,
        }
    }

    /// Attach exception regions. They are stored but not yet consulted.
    pub fn with_exceptions(mut self, exceptions: ExceptionRegions) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Exception regions owned by this controller.
    pub fn exceptions(&self) -> &ExceptionRegions {
        &self.exceptions
    }

    /// Level of the most recent decision.
    pub fn level(&self) -> Option<DetailLevel> {
        self.last.map(|d| d.level)
    }

    /// View of the most recent decision.
    pub fn last_view(&self) -> Option<&ViewState> {
        self.last.as_ref().map(|d| &d.view)
    }

    /// How the most recent level was selected.
    pub fn last_selection(&self) -> Option<&LevelSelection> {
        self.last_selection.as_ref()
    }

    /// The bounds collaborator.
    pub fn bounds(&self) -> &B {
        &self.bounds
    }

    /// The fetch layer.
    pub fn fetch(&self) -> &FetchLifecycleManager<P> {
        &self.fetch
    }

    /// The fetch layer, mutably.
    pub fn fetch_mut(&mut self) -> &mut FetchLifecycleManager<P> {
        &mut self.fetch
    }

    /// Subscribe to load events.
    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.fetch.subscribe()
    }

    /// Run one decision cycle for the current state of `view`.
    ///
    /// A bounds computation error aborts the cycle before any cached state
    /// changes.
    pub fn update(
        &mut self,
        view: &dyn MapView,
        options: &UpdateOptions,
    ) -> Result<UpdateOutcome, LodError> {
        let old_level = self.level();
        let baseline = self.last.map(|d| Baseline::new(d.view.zoom, d.level));

        let center = view.center();
        let zoom = view.zoom();
        let features = view.features();
        let selection = self.selector.select(baseline, zoom, &features);
        let new_level = selection.level;

        let Some(map_bounds) = self.bounds.compute_map_bounds(view)? else {
            tracing::trace!(zoom, level = %new_level, "No map bounds, skipping");
            return Ok(UpdateOutcome::Skipped {
                level: new_level,
                reason: SkipReason::NoMapBounds,
            });
        };
        let resolution = view.resolution();

        self.last = Some(Decision {
            view: ViewState {
                center,
                zoom,
                bounds: map_bounds,
                resolution,
            },
            level: new_level,
        });
        self.last_selection = Some(selection);

        if self.fetch.take_bounds_stale() {
            tracing::debug!("Previous read failed, discarding fetched bounds");
            self.bounds.reset();
        }

        let trigger = if options.force {
            Some(FetchTrigger::Forced)
        } else if view.is_visible()
            && view.in_scale_range()
            && self.bounds.is_invalidated(&map_bounds, resolution)
        {
            Some(FetchTrigger::BoundsInvalidated)
        } else if old_level != Some(new_level) {
            Some(FetchTrigger::LevelChanged)
        } else {
            None
        };

        let Some(trigger) = trigger else {
            tracing::trace!(zoom, level = %new_level, "Fetched data still valid");
            return Ok(UpdateOutcome::Skipped {
                level: new_level,
                reason: SkipReason::StillValid,
            });
        };

        self.bounds.commit(&map_bounds, resolution);
        let data_bounds = self.bounds.bounds().unwrap_or(map_bounds);

        tracing::debug!(
            zoom,
            old_level = ?old_level,
            new_level = %new_level,
            %trigger,
            "Viewport fetch triggered"
        );

        let request = self
            .fetch
            .trigger_read(new_level, data_bounds, resolution, &options.read);

        Ok(UpdateOutcome::Fetched {
            request,
            level: new_level,
            trigger,
        })
    }
}
