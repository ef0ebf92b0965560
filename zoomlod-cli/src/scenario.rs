//! Scenario files for `zoomlod replay`.
//!
//! ```json
//! {
//!   "features": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]],
//!   "steps": [
//!     { "zoom": 5, "extent": [0, 0, 100, 100] },
//!     { "zoom": 6, "response": { "status": "success", "features": [] } },
//!     { "zoom": 6, "force": true, "no_abort": true, "params": { "format": "json" } }
//!   ]
//! }
//! ```
//!
//! A step without `extent` keeps the previous step's extent. A `response`
//! completes the most recent read still in flight after the step ran.

use std::collections::BTreeMap;
use std::path::Path;

use geo::{LineString, Point, Polygon, Rect};
use serde::Deserialize;
use zoomlod::{Feature, FeatureStore, MapView, ReadResponse, UpdateOptions};

use crate::error::CliError;

/// Closed ring of `[x, y]` coordinates.
pub type Ring = Vec<[f64; 2]>;

/// A sequence of view changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Features rendered before the first step.
    #[serde(default)]
    pub features: Vec<Ring>,
    /// View changes, in order.
    pub steps: Vec<Step>,
}

/// One view change.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub zoom: u8,
    /// `[min_x, min_y, max_x, max_y]` in map units.
    #[serde(default)]
    pub extent: Option<[f64; 4]>,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub in_range: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub no_abort: bool,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub response: Option<StepResponse>,
}

fn default_resolution() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Simulated transport response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResponse {
    Success {
        #[serde(default)]
        features: Vec<Ring>,
    },
    Failure {
        reason: String,
    },
}

impl StepResponse {
    /// Convert to the response handed to a completion handler.
    pub fn to_response(&self) -> ReadResponse {
        match self {
            StepResponse::Success { features } => ReadResponse::success(to_features(features)),
            StepResponse::Failure { reason } => ReadResponse::failure(reason.clone()),
        }
    }
}

impl Step {
    /// Update options requested by this step.
    pub fn options(&self) -> UpdateOptions {
        let mut options = UpdateOptions {
            force: self.force,
            ..Default::default()
        };
        options.read.no_abort = self.no_abort;
        options.read.params = self.params.clone();
        options
    }
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|error| CliError::ScenarioRead {
            path: path.display().to_string(),
            error,
        })?;
        serde_json::from_str(&text).map_err(|error| CliError::ScenarioParse {
            path: path.display().to_string(),
            error,
        })
    }
}

/// Convert rings to polygon features.
pub fn to_features(rings: &[Ring]) -> Vec<Feature> {
    rings
        .iter()
        .map(|ring| {
            let exterior: LineString<f64> = ring.iter().map(|[x, y]| (*x, *y)).collect();
            Feature::new(Polygon::new(exterior, vec![]))
        })
        .collect()
}

/// Map view for a scenario step, reading features from the replay store.
pub struct StepView<'a> {
    step: &'a Step,
    extent: Option<Rect<f64>>,
    store: &'a FeatureStore,
}

impl<'a> StepView<'a> {
    pub fn new(step: &'a Step, extent: Option<Rect<f64>>, store: &'a FeatureStore) -> Self {
        Self {
            step,
            extent,
            store,
        }
    }
}

impl MapView for StepView<'_> {
    fn center(&self) -> Point<f64> {
        self.extent
            .map(|r| Point::from(r.center()))
            .unwrap_or_else(|| Point::new(0.0, 0.0))
    }

    fn zoom(&self) -> u8 {
        self.step.zoom
    }

    fn resolution(&self) -> f64 {
        self.step.resolution
    }

    fn extent(&self) -> Option<Rect<f64>> {
        self.extent
    }

    fn features(&self) -> Vec<Feature> {
        self.store.snapshot()
    }

    fn is_visible(&self) -> bool {
        self.step.visible
    }

    fn in_scale_range(&self) -> bool {
        self.step.in_range
    }
}

/// Rectangle for an `[min_x, min_y, max_x, max_y]` extent.
pub fn to_rect(extent: [f64; 4]) -> Rect<f64> {
    let [min_x, min_y, max_x, max_y] = extent;
    Rect::new((min_x, min_y), (max_x, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults() {
        let scenario: Scenario = serde_json::from_str(r#"{"steps": [{"zoom": 4}]}"#).unwrap();
        let step = &scenario.steps[0];
        assert_eq!(step.zoom, 4);
        assert!(step.extent.is_none());
        assert_eq!(step.resolution, 1.0);
        assert!(step.visible && step.in_range);
        assert!(!step.force && !step.no_abort);
        assert!(step.response.is_none());
        assert!(scenario.features.is_empty());
    }

    #[test]
    fn test_response_variants() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"steps": [
                {"zoom": 1, "response": {"status": "failure", "reason": "timeout"}},
                {"zoom": 2, "response": {"status": "success", "features": [[[0,0],[1,0],[1,1],[0,0]]]}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            scenario.steps[0].response,
            Some(StepResponse::Failure {
                reason: "timeout".to_string()
            })
        );
        let response = scenario.steps[1].response.as_ref().unwrap().to_response();
        assert!(response.is_success());
        assert_eq!(response.features.len(), 1);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<Scenario, _> = serde_json::from_str(r#"{"steps": [{"zom": 4}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_step_options() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"steps": [{"zoom": 3, "force": true, "no_abort": true, "params": {"srs": "EPSG:4326"}}]}"#,
        )
        .unwrap();
        let options = scenario.steps[0].options();
        assert!(options.force);
        assert!(options.read.no_abort);
        assert_eq!(
            options.params().get("srs").map(String::as_str),
            Some("EPSG:4326")
        );
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Scenario::load(&path),
            Err(CliError::ScenarioParse { .. })
        ));
        assert!(matches!(
            Scenario::load(&dir.path().join("missing.json")),
            Err(CliError::ScenarioRead { .. })
        ));
    }
}
