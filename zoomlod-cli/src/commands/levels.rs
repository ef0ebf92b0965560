//! `zoomlod levels`: print the configured zoom → level table.

use clap::Args;
use zoomlod::table::MAX_TABLE_ZOOM;
use zoomlod::{LevelSelector, LodConfig};

use crate::error::CliError;

/// Arguments for `zoomlod levels`.
#[derive(Debug, Args)]
pub struct LevelsArgs {
    /// Only show this zoom (zooms above 18 use the zoom 18 entry)
    #[arg(long)]
    zoom: Option<u8>,
}

/// Run the levels command.
pub fn run(config: &LodConfig, args: LevelsArgs) -> Result<(), CliError> {
    let selector = LevelSelector::new(config.levels, config.area_threshold);

    if let Some(zoom) = args.zoom {
        let level = selector.table().level_for(zoom);
        println!(
            "zoom {:>2} → level {} ({})",
            zoom,
            level.value(),
            level.to_param()
        );
        return Ok(());
    }

    for line in table_lines(&selector) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per zoom, 0 through 18.
fn table_lines(selector: &LevelSelector) -> Vec<String> {
    let header = format!("{:>4}  {:>5}  {}", "zoom", "level", "param");
    let mut lines = vec![header];
    for zoom in 0..=MAX_TABLE_ZOOM {
        let level = selector.table().level_for(zoom);
        let line = format!("{:>4}  {:>5}  {}", zoom, level.value(), level.to_param());
        lines.push(line);
    }
    lines.push(format!("area threshold: {} px²", selector.area_threshold()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lines_cover_every_zoom() {
        let lines = table_lines(&LevelSelector::with_defaults());
        assert_eq!(lines.len(), 21);
        assert!(lines[1].ends_with("L0"));
        assert!(lines[10].ends_with("L3"));
        assert!(lines[19].ends_with("L5"));
        assert_eq!(lines[20], "area threshold: 500000 px²");
    }

    #[test]
    fn test_table_lines_follow_configured_levels() {
        let config = LodConfig::parse(
            "[lod]\nlevels = 5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5,5\narea_threshold = 1000\n",
        )
        .unwrap();
        let selector = LevelSelector::new(config.levels, config.area_threshold);
        let lines = table_lines(&selector);
        assert!(lines[1].ends_with("L5"));
        assert_eq!(lines[20], "area threshold: 1000 px²");
    }
}
