//! Crossing line and region of interest
//!
//! A world config is stored as plain text, one line segment per row as four
//! whitespace separated floats `ax ay bx by`. The first row is the crossing
//! line, every following row is a bound. Blank rows are ignored.

use crate::error::ConfigError;
use crate::geom::{Line, Point};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Regions derived from the crossing line and the bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub crossing: Line,
    pub bounds: Vec<Line>,
}

impl WorldConfig {
    pub fn new(crossing: Line, bounds: Vec<Line>) -> Self {
        Self { crossing, bounds }
    }

    /// True when `p` is behind the start of the crossing line
    pub fn inside(&self, p: Point) -> bool {
        self.crossing.normal(self.crossing.a).side(p)
    }

    /// True when `p` is at or past the end of the crossing line
    pub fn outside(&self, p: Point) -> bool {
        !self.crossing.normal(self.crossing.b).side(p)
    }

    /// True when `p` is on the `side == true` half of every bound.
    /// With no bounds every point is in bounds.
    pub fn in_bounds(&self, p: Point) -> bool {
        self.bounds.iter().all(|line| line.side(p))
    }

    /// Load a config from a text file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: WorldConfig = text.parse()?;
        log::info!(
            "Loaded world config from {}: crossing {}, {} bounds",
            path.display(),
            config.crossing,
            config.bounds.len()
        );
        Ok(config)
    }

    /// Write the config in the same format [`WorldConfig::from_file`] reads
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_config_string())?;
        Ok(())
    }

    pub fn to_config_string(&self) -> String {
        let mut out = String::new();
        for line in std::iter::once(&self.crossing).chain(self.bounds.iter()) {
            // Writing to a String cannot fail
            let _ = writeln!(out, "{} {} {} {}", line.a.x, line.a.y, line.b.x, line.b.y);
        }
        out
    }
}

fn parse_line(row: &str, line_no: usize) -> Result<Line, ConfigError> {
    let values = row
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    ConfigError::malformed(line_no, format!("'{}' is not a number", token))
                })
        })
        .collect::<Result<Vec<f32>, ConfigError>>()?;

    match values.as_slice() {
        [ax, ay, bx, by] => Ok(Line::from_coords(*ax, *ay, *bx, *by)),
        other => Err(ConfigError::malformed(
            line_no,
            format!("expected 4 values, found {}", other.len()),
        )),
    }
}

impl FromStr for WorldConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s
            .lines()
            .enumerate()
            .filter(|(_, row)| !row.trim().is_empty())
            .map(|(i, row)| parse_line(row, i + 1));

        let crossing = lines.next().ok_or(ConfigError::MissingCrossing)??;
        let bounds = lines.collect::<Result<Vec<Line>, ConfigError>>()?;

        Ok(WorldConfig::new(crossing, bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    #[test]
    fn test_inside_outside() {
        let world = WorldConfig::new(Line::from_coords(0.0, 0.0, 0.0, 1.0), vec![]);

        assert!(world.inside(Point::new(0.0, -1.0)));
        assert!(!world.outside(Point::new(0.0, -1.0)));

        // Between the ends of the crossing line counts as neither
        assert!(!world.inside(Point::new(0.0, 0.5)));
        assert!(!world.outside(Point::new(0.0, 0.5)));

        assert!(world.outside(Point::new(0.0, 2.0)));
        assert!(!world.inside(Point::new(0.0, 2.0)));
    }

    #[test]
    fn test_vertical_line_regions_follow_direction() {
        // Direction is +y, so the regions split on y and x plays no part
        let world = WorldConfig::new(Line::from_coords(0.0, 0.0, 0.0, 1.0), vec![]);

        assert!(world.inside(Point::new(-0.5, -0.1)));
        assert!(!world.outside(Point::new(-0.5, -0.1)));
        assert!(world.outside(Point::new(0.5, 1.1)));
        assert!(!world.inside(Point::new(0.5, 1.1)));

        // Left and right of the segment are both between its ends
        for p in [Point::new(-0.1, 0.5), Point::new(0.1, 0.5)] {
            assert!(!world.inside(p));
            assert!(!world.outside(p));
        }
        assert!(world.inside(Point::new(0.5, -0.1)));
        assert!(world.outside(Point::new(-0.5, 1.0)));
    }

    #[test]
    fn test_no_bounds_is_always_in_bounds() {
        let world = WorldConfig::new(Line::from_coords(0.0, 0.0, 0.0, 1.0), vec![]);
        assert!(world.in_bounds(Point::new(-5.0, 3.0)));
        assert!(world.in_bounds(Point::new(0.5, 0.5)));
    }

    #[test]
    fn test_in_bounds() {
        let world = WorldConfig::new(
            Line::from_coords(0.0, 0.0, 0.0, 1.0),
            vec![
                Line::from_coords(0.0, 1.0, 0.0, 0.0),
                Line::from_coords(1.0, 0.0, 1.0, 1.0),
            ],
        );
        assert!(world.in_bounds(Point::new(0.5, 0.0)));
        assert!(!world.in_bounds(Point::new(-0.5, 0.0)));
        assert!(!world.in_bounds(Point::new(1.5, 0.0)));
    }

    #[test]
    fn test_file_round_trip() {
        let world = WorldConfig::new(
            Line::from_coords(0.1234, 0.5, 0.8765, 0.55),
            vec![
                Line::from_coords(0.0, 1.0, 0.0, 0.0),
                Line::from_coords(1.0, 0.0, 1.0, 1.0),
                Line::from_coords(0.333, 0.666, 0.999, 0.001),
            ],
        );
        let file = tempfile::NamedTempFile::new().unwrap();
        world.write_file(file.path()).unwrap();

        let loaded = WorldConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.bounds.len(), world.bounds.len());

        let expected = std::iter::once(&world.crossing).chain(world.bounds.iter());
        let actual = std::iter::once(&loaded.crossing).chain(loaded.bounds.iter());
        for (e, a) in expected.zip(actual) {
            assert_abs_diff_eq!(e.a.x, a.a.x, epsilon = 1e-4);
            assert_abs_diff_eq!(e.a.y, a.a.y, epsilon = 1e-4);
            assert_abs_diff_eq!(e.b.x, a.b.x, epsilon = 1e-4);
            assert_abs_diff_eq!(e.b.y, a.b.y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_crossing_only() {
        let world: WorldConfig = "0.5 0 0.5 1\n\n".parse().unwrap();
        assert_eq!(world.crossing, Line::from_coords(0.5, 0.0, 0.5, 1.0));
        assert!(world.bounds.is_empty());
    }

    #[test]
    fn test_empty_file_is_missing_crossing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"  \n").unwrap();
        let err = WorldConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCrossing));
    }

    #[test]
    fn test_malformed_rows() {
        let err = "0.1 0.2 0.3\n".parse::<WorldConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 1, .. }));

        let err = "0 0 0 1\n0 1 zero 0\n".parse::<WorldConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line: 2, .. }));

        let err = "0 0 0 NaN\n".parse::<WorldConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = WorldConfig::from_file(dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
