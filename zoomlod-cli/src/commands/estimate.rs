//! `zoomlod estimate`: on-screen pixel area of a square feature.

use clap::Args;
use geo::{Geometry, Rect};
use zoomlod::{estimate_pixel_area, meters_per_pixel, LevelSelector, LodConfig};

use crate::error::CliError;

/// Arguments for `zoomlod estimate`.
#[derive(Debug, Args)]
pub struct EstimateArgs {
    /// Zoom level
    #[arg(long)]
    zoom: u8,

    /// Centroid y-coordinate, used as latitude in radians
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    lat: f64,

    /// Feature area in square map units
    #[arg(long, conflicts_with = "side")]
    area: Option<f64>,

    /// Side length of the square in map units
    #[arg(long)]
    side: Option<f64>,
}

/// Result of an estimate.
#[derive(Debug, Clone, PartialEq)]
struct Estimate {
    meters_per_pixel: f64,
    pixel_area: Option<f64>,
}

/// Run the estimate command.
pub fn run(config: &LodConfig, args: EstimateArgs) -> Result<(), CliError> {
    let side = resolve_side(args.area, args.side)?;
    let selector = LevelSelector::new(config.levels, config.area_threshold);
    let estimate = estimate_square(side, args.lat, args.zoom);

    println!("meters per pixel: {:.6}", estimate.meters_per_pixel);
    match estimate.pixel_area {
        Some(pixels) => {
            let relation = if pixels > selector.area_threshold() {
                "above"
            } else {
                "below"
            };
            println!("pixel area:       {:.1} px²", pixels);
            println!(
                "threshold:        {:.1} px² ({})",
                selector.area_threshold(),
                relation
            );
        }
        None => println!("pixel area:       n/a (degenerate geometry)"),
    }
    println!(
        "table level:      {}",
        selector.table().level_for(args.zoom).to_param()
    );
    Ok(())
}

/// Side length of the square from `--area` or `--side`.
fn resolve_side(area: Option<f64>, side: Option<f64>) -> Result<f64, CliError> {
    match (area, side) {
        (Some(area), None) if area >= 0.0 => Ok(area.sqrt()),
        (None, Some(side)) if side >= 0.0 => Ok(side),
        (None, None) => Err(CliError::InvalidArgument(
            "one of --area or --side is required".to_string(),
        )),
        _ => Err(CliError::InvalidArgument(
            "area and side must not be negative".to_string(),
        )),
    }
}

fn estimate_square(side: f64, lat: f64, zoom: u8) -> Estimate {
    let half = side / 2.0;
    let square = Geometry::Polygon(Rect::new((-half, lat - half), (half, lat + half)).to_polygon());
    Estimate {
        meters_per_pixel: meters_per_pixel(lat, zoom),
        pixel_area: estimate_pixel_area(&square, zoom),
    }
}
