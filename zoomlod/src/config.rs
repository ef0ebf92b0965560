//! Strategy configuration and INI loading.
//!
//! # Example Configuration (INI)
//!
//! ```ini
//! [lod]
//! area_threshold = 500000
//! levels = 0,0,0,0,1,1,1,2,2,3,3,3,3,4,4,5,5,5,5
//!
//! [bbox]
//! ratio = 2.0
//! res_factor = 3.0
//! filter = status = active
//! ```
//!
//! Every key is optional; missing keys keep their defaults. Exception
//! regions are configured programmatically.

use std::path::Path;

use ini::Ini;
use thiserror::Error;

use crate::bounds::DEFAULT_BBOX_RATIO;
use crate::level::DetailLevel;
use crate::selector::AREA_THRESHOLD;
use crate::table::{ExceptionRegions, ZoomLevelTable, DEFAULT_LEVEL_TABLE, MAX_TABLE_ZOOM};

const SECTION_LOD: &str = "lod";
const SECTION_BBOX: &str = "bbox";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the config file.
    #[error("Failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Failed to write the config file.
    #[error("Failed to write config file: {0}")]
    Write(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Tuning for level selection, bounds invalidation, and reads.
#[derive(Debug, Clone, PartialEq)]
pub struct LodConfig {
    /// Mean on-screen feature area (pixels²) that triggers a level step.
    pub area_threshold: f64,

    /// Default zoom → level table.
    pub levels: ZoomLevelTable,

    /// Ratio of fetched extent to visible extent.
    pub bbox_ratio: f64,

    /// Resolution change factor that invalidates the fetched extent.
    ///
    /// `None` disables resolution-based invalidation.
    pub res_factor: Option<f64>,

    /// Attribute filter expression sent with every read.
    pub attribute_filter: Option<String>,

    /// Regional table overrides (not consulted by the selector).
    pub exceptions: ExceptionRegions,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            area_threshold: AREA_THRESHOLD,
            levels: DEFAULT_LEVEL_TABLE,
            bbox_ratio: DEFAULT_BBOX_RATIO,
            res_factor: None,
            attribute_filter: None,
            exceptions: ExceptionRegions::default(),
        }
    }
}

impl LodConfig {
    /// Load configuration from a file.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(ini::Error::Parse)?;
        Self::from_ini(&ini)
    }

    /// Build configuration from a parsed INI document.
    ///
    /// Starts from `LodConfig::default()` and overlays any values found.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SECTION_LOD)) {
            if let Some(v) = section.get("area_threshold") {
                config.area_threshold = parse_positive(SECTION_LOD, "area_threshold", v)?;
            }
            if let Some(v) = section.get("levels") {
                config.levels = parse_levels(v)?;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_BBOX)) {
            if let Some(v) = section.get("ratio") {
                let ratio = parse_positive(SECTION_BBOX, "ratio", v)?;
                if ratio < 1.0 {
                    return Err(ConfigError::invalid(
                        SECTION_BBOX,
                        "ratio",
                        v,
                        "must be at least 1.0",
                    ));
                }
                config.bbox_ratio = ratio;
            }
            if let Some(v) = section.get("res_factor") {
                let v = v.trim();
                config.res_factor = if v.is_empty() || v.eq_ignore_ascii_case("none") {
                    None
                } else {
                    let factor = parse_positive(SECTION_BBOX, "res_factor", v)?;
                    if factor <= 1.0 {
                        return Err(ConfigError::invalid(
                            SECTION_BBOX,
                            "res_factor",
                            v,
                            "must be greater than 1.0",
                        ));
                    }
                    Some(factor)
                };
            }
            if let Some(v) = section.get("filter") {
                let v = v.trim();
                config.attribute_filter = (!v.is_empty()).then(|| v.to_string());
            }
        }

        Ok(config)
    }

    /// Serialize to an INI document.
    pub fn to_ini(&self) -> Ini {
        let levels = self
            .levels
            .levels()
            .iter()
            .map(|l| l.value().to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_LOD))
            .set("area_threshold", self.area_threshold.to_string())
            .set("levels", levels);
        ini.with_section(Some(SECTION_BBOX))
            .set("ratio", self.bbox_ratio.to_string())
            .set(
                "res_factor",
                self.res_factor
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            )
            .set("filter", self.attribute_filter.clone().unwrap_or_default());
        ini
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<f64, ConfigError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(section, key, value, "expected a number"))?;
    if !(parsed.is_finite() && parsed > 0.0) {
        return Err(ConfigError::invalid(
            section,
            key,
            value,
            "must be a positive number",
        ));
    }
    Ok(parsed)
}

fn parse_levels(value: &str) -> Result<ZoomLevelTable, ConfigError> {
    let expected = MAX_TABLE_ZOOM as usize + 1;
    let invalid = |reason: String| ConfigError::invalid(SECTION_LOD, "levels", value, reason);

    let levels = value
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u8>()
                .ok()
                .and_then(|v| DetailLevel::new(v).ok())
                .ok_or_else(|| invalid(format!("'{}' is not a level between 0 and 5", part)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ZoomLevelTable::from_levels(&levels).ok_or_else(|| {
        invalid(format!(
            "expected {} comma-separated levels, got {}",
            expected,
            levels.len()
        ))
    })
}
