//! Error types for level-of-detail selection and fetch decisions.

use thiserror::Error;

/// Errors that can occur while deciding what to fetch.
///
/// The decision logic itself is pure; these errors come from building
/// levels out of untrusted input and from the bounds collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LodError {
    /// Detail level outside `0..=5`.
    #[error("Invalid detail level {0} (must be 0-5)")]
    InvalidLevel(u8),

    /// Level request parameter not of the form `L<digit>`.
    #[error("Invalid level parameter '{0}' (expected L0-L5)")]
    InvalidLevelParam(String),

    /// The bounds collaborator failed to compute the current map bounds.
    #[error("Failed to compute map bounds: {reason}")]
    Bounds { reason: String },
}

impl LodError {
    /// Bounds failure, keeping the underlying error's message.
    pub fn bounds(cause: impl std::fmt::Display) -> Self {
        LodError::Bounds {
            reason: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lod_error_display_invalid_level() {
        let err = LodError::InvalidLevel(9);
        assert_eq!(err.to_string(), "Invalid detail level 9 (must be 0-5)");
    }

    #[test]
    fn test_lod_error_display_invalid_param() {
        let err = LodError::InvalidLevelParam("3".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid level parameter '3' (expected L0-L5)"
        );
    }

    #[test]
    fn test_lod_error_display_bounds() {
        let err = LodError::bounds("projection unavailable");
        assert_eq!(
            err.to_string(),
            "Failed to compute map bounds: projection unavailable"
        );
    }

    #[test]
    fn test_lod_error_bounds_keeps_cause() {
        let cause = std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no projection for EPSG:9999",
        );
        let err = LodError::bounds(&cause);
        assert_eq!(
            err,
            LodError::Bounds {
                reason: "no projection for EPSG:9999".to_string()
            }
        );
    }
}
