//! CLI command implementations.
//!
//! - [`estimate`] - Pixel area estimate for a square feature
//! - [`levels`] - Zoom → level table
//! - [`replay`] - Scenario replay against a recording transport

pub mod estimate;
pub mod levels;
pub mod replay;
