//! Zoom → detail level policy tables.
//!
//! The default table maps map zoom levels 0-18 onto the location hierarchy:
//!
//! | Zoom  | Level |
//! |-------|-------|
//! | 0-3   | L0    |
//! | 4-6   | L1    |
//! | 7-8   | L2    |
//! | 9-12  | L3    |
//! | 13-14 | L4    |
//! | 15-18 | L5    |
//!
//! Different countries vary a lot in how their hierarchy lines up with zoom,
//! so [`ExceptionRegions`] can attach alternate tables to polygons. The
//! selector does not consult them yet; hosts can look them up explicitly.

use geo::{Contains, Point, Polygon};

use crate::level::DetailLevel;

/// Highest zoom level with its own table entry.
pub const MAX_TABLE_ZOOM: u8 = 18;

const ENTRIES: usize = MAX_TABLE_ZOOM as usize + 1;

/// Immutable mapping from zoom level to default detail level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevelTable {
    levels: [DetailLevel; ENTRIES],
}

/// The built-in zoom → level table.
pub const DEFAULT_LEVEL_TABLE: ZoomLevelTable = ZoomLevelTable::from_values([
    0, 0, 0, 0, // 0-3
    1, 1, 1, // 4-6
    2, 2, // 7-8
    3, 3, 3, 3, // 9-12
    4, 4, // 13-14
    5, 5, 5, 5, // 15-18
]);

impl ZoomLevelTable {
    /// Build a table from raw values, clamping each to the valid level range.
    pub const fn from_values(values: [u8; ENTRIES]) -> Self {
        let mut levels = [DetailLevel::MIN; ENTRIES];
        let mut i = 0;
        while i < ENTRIES {
            levels[i] = DetailLevel::saturating(values[i]);
            i += 1;
        }
        Self { levels }
    }

    /// Build a table from a slice of levels, one per zoom starting at 0.
    ///
    /// Returns `None` unless exactly [`MAX_TABLE_ZOOM`]` + 1` entries are given.
    pub fn from_levels(levels: &[DetailLevel]) -> Option<Self> {
        let levels: [DetailLevel; ENTRIES] = levels.try_into().ok()?;
        Some(Self { levels })
    }

    /// Default level for a zoom. Zooms beyond the table use the last entry.
    pub fn level_for(&self, zoom: u8) -> DetailLevel {
        let index = zoom.min(MAX_TABLE_ZOOM) as usize;
        self.levels[index]
    }

    /// All entries in zoom order.
    pub fn levels(&self) -> &[DetailLevel] {
        &self.levels
    }
}

impl Default for ZoomLevelTable {
    fn default() -> Self {
        DEFAULT_LEVEL_TABLE
    }
}

/// A geographic area with its own zoom → level table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRegion {
    /// Area the override applies to, in map units.
    pub area: Polygon<f64>,
    /// Table used inside the area.
    pub table: ZoomLevelTable,
}

/// Ordered set of exception regions; the first containing region wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionRegions {
    regions: Vec<ExceptionRegion>,
}

impl ExceptionRegions {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region after the existing ones.
    pub fn push(&mut self, area: Polygon<f64>, table: ZoomLevelTable) {
        self.regions.push(ExceptionRegion { area, table });
    }

    /// Table of the first region containing `point`, if any.
    pub fn table_for(&self, point: &Point<f64>) -> Option<&ZoomLevelTable> {
        self.regions
            .iter()
            .find(|region| region.area.contains(point))
            .map(|region| &region.table)
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the set has no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
