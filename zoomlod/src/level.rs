//! Detail levels and their request parameter encoding.
//!
//! A detail level is an integer in `0..=5` describing how fine-grained the
//! next data request should be:
//!
//! ```text
//! L0  coarsest administrative / geographic level
//! ...
//! L5  finest, close to individual features
//! ```
//!
//! The remote data source receives the level as the `level` request
//! parameter, encoded as `"L"` followed by the integer. That encoding is
//! shared with the server-side mapping and must not change.

use std::fmt;
use std::str::FromStr;

use crate::error::LodError;

/// Name of the request parameter carrying the detail level.
pub const LEVEL_PARAM: &str = "level";

/// Prefix of the encoded level parameter value.
const LEVEL_PREFIX: char = 'L';

/// Detail level, always within [`DetailLevel::MIN`]..=[`DetailLevel::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DetailLevel(u8);

impl DetailLevel {
    /// Coarsest level.
    pub const MIN: DetailLevel = DetailLevel(0);

    /// Finest level.
    pub const MAX: DetailLevel = DetailLevel(5);

    /// Create a level, rejecting values above [`DetailLevel::MAX`].
    pub fn new(value: u8) -> Result<Self, LodError> {
        if value > Self::MAX.0 {
            return Err(LodError::InvalidLevel(value));
        }
        Ok(Self(value))
    }

    /// Create a level, clamping values above [`DetailLevel::MAX`].
    pub const fn saturating(value: u8) -> Self {
        if value > Self::MAX.0 {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Numeric value of the level.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// One step finer, clamped at [`DetailLevel::MAX`].
    pub fn finer(self) -> Self {
        Self::saturating(self.0 + 1)
    }

    /// One step coarser, clamped at [`DetailLevel::MIN`].
    pub fn coarser(self) -> Self {
        Self(self.0.saturating_sub(1))
    }

    /// Encode as the `level` request parameter value (e.g. `"L3"`).
    pub fn to_param(self) -> String {
        format!("{}{}", LEVEL_PREFIX, self.0)
    }

    /// Decode a `level` request parameter value.
    pub fn from_param(param: &str) -> Result<Self, LodError> {
        let invalid = || LodError::InvalidLevelParam(param.to_string());

        let digits = param.strip_prefix(LEVEL_PREFIX).ok_or_else(invalid)?;
        if digits.len() != 1 {
            return Err(invalid());
        }
        let value: u8 = digits.parse().map_err(|_| invalid())?;
        Self::new(value).map_err(|_| invalid())
    }

    /// Iterate over every level from coarsest to finest.
    pub fn all() -> impl Iterator<Item = DetailLevel> {
        (Self::MIN.0..=Self::MAX.0).map(DetailLevel)
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", LEVEL_PREFIX, self.0)
    }
}

impl FromStr for DetailLevel {
    type Err = LodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_param(s)
    }
}

impl TryFrom<u8> for DetailLevel {
    type Error = LodError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DetailLevel> for u8 {
    fn from(level: DetailLevel) -> Self {
        level.0
    }
}
