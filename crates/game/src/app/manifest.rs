use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use questy_engine::{Direction, Point, Size};
use serde::Deserialize;
use thiserror::Error;

pub(crate) const MANIFEST_FILE: &str = "game.json";

const MAX_PLACE_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GameManifest {
    pub(crate) name: String,
    pub(crate) shortname: String,
    pub(crate) size: Size,
    #[serde(default = "default_datadir")]
    pub(crate) datadir: PathBuf,
    #[serde(default)]
    pub(crate) start: StartSpec,
    /// Directory under `datadir` holding the leading character's frames.
    #[serde(default = "default_character")]
    pub(crate) character: String,
    #[serde(default = "default_frame_duration_ms")]
    pub(crate) frame_duration_ms: u64,
    #[serde(default)]
    pub(crate) depth_power: Option<f32>,
    #[serde(default = "default_place_digits")]
    pub(crate) place_digits: usize,
    #[serde(default = "default_stride")]
    pub(crate) stride: f32,
    #[serde(default = "default_enforce_screen_bounds")]
    pub(crate) enforce_screen_bounds: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StartSpec {
    #[serde(default)]
    pub(crate) place: usize,
    #[serde(default)]
    pub(crate) position: Option<Point>,
    #[serde(default)]
    pub(crate) direction: Option<Direction>,
}

impl GameManifest {
    pub(crate) fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }
}

fn default_datadir() -> PathBuf {
    PathBuf::from("data")
}

fn default_character() -> String {
    "character".to_string()
}

fn default_frame_duration_ms() -> u64 {
    200
}

fn default_place_digits() -> usize {
    3
}

fn default_stride() -> f32 {
    3.0
}

fn default_enforce_screen_bounds() -> bool {
    true
}

#[derive(Debug, Error)]
pub(crate) enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse manifest {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid manifest {path}: {field} {message}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

pub(crate) fn load_manifest(game_dir: &Path) -> Result<GameManifest, ManifestError> {
    let path = game_dir.join(MANIFEST_FILE);
    let raw = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    parse_manifest(&raw, &path)
}

pub(crate) fn parse_manifest(raw: &str, path: &Path) -> Result<GameManifest, ManifestError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let manifest: GameManifest = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|error| {
            let field = error.path().to_string();
            ManifestError::Parse {
                path: path.to_path_buf(),
                field,
                source: error.into_inner(),
            }
        })?;
    validate(&manifest, path)?;
    Ok(manifest)
}

fn validate(manifest: &GameManifest, path: &Path) -> Result<(), ManifestError> {
    let invalid = |field: &'static str, message: String| ManifestError::Invalid {
        path: path.to_path_buf(),
        field,
        message,
    };

    if manifest.shortname.trim().is_empty() {
        return Err(invalid("shortname", "must not be empty".to_string()));
    }
    if manifest.size.is_empty() {
        return Err(invalid(
            "size",
            format!(
                "must have a non-zero area, got {}x{}",
                manifest.size.width, manifest.size.height
            ),
        ));
    }
    if manifest.frame_duration_ms == 0 {
        return Err(invalid("frame_duration_ms", "must be positive".to_string()));
    }
    if !(1..=MAX_PLACE_DIGITS).contains(&manifest.place_digits) {
        return Err(invalid(
            "place_digits",
            format!("must be between 1 and {MAX_PLACE_DIGITS}, got {}", manifest.place_digits),
        ));
    }
    if !(manifest.stride.is_finite() && manifest.stride > 0.0) {
        return Err(invalid(
            "stride",
            format!("must be a positive number, got {}", manifest.stride),
        ));
    }
    if let Some(power) = manifest.depth_power {
        if !(power.is_finite() && power >= 0.0) {
            return Err(invalid(
                "depth_power",
                format!("must be a non-negative number, got {power}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<GameManifest, ManifestError> {
        parse_manifest(raw, Path::new("game.json"))
    }

    #[test]
    fn minimal_manifest_takes_defaults() {
        let manifest = parse(
            r#"{"name": "Demo Quest", "shortname": "demo", "size": {"width": 320, "height": 200}}"#,
        )
        .expect("manifest");

        assert_eq!(manifest.size, Size::new(320, 200));
        assert_eq!(manifest.datadir, PathBuf::from("data"));
        assert_eq!(manifest.start, StartSpec::default());
        assert_eq!(manifest.character, "character");
        assert_eq!(manifest.frame_duration(), Duration::from_millis(200));
        assert_eq!(manifest.place_digits, 3);
        assert!(manifest.enforce_screen_bounds);
        assert_eq!(manifest.depth_power, None);
    }

    #[test]
    fn start_spec_reads_direction_codes() {
        let manifest = parse(
            r#"{
                "name": "Demo Quest",
                "shortname": "demo",
                "size": {"width": 320, "height": 200},
                "start": {"place": 2, "position": {"x": 40, "y": 180}, "direction": "lm"},
                "depth_power": 1.5
            }"#,
        )
        .expect("manifest");

        assert_eq!(manifest.start.place, 2);
        assert_eq!(manifest.start.position, Some(Point::new(40, 180)));
        assert_eq!(manifest.start.direction, Some(Direction::MidLeft));
        assert_eq!(manifest.depth_power, Some(1.5));
    }

    #[test]
    fn parse_error_reports_field_path() {
        let error = parse(
            r#"{"name": "Demo", "shortname": "demo", "size": {"width": 320, "height": 200},
                "start": {"direction": "north"}}"#,
        )
        .expect_err("bad direction");

        match error {
            ManifestError::Parse { field, .. } => assert_eq!(field, "start.direction"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse(
            r#"{"name": "Demo", "shortname": "demo", "size": {"width": 1, "height": 1}, "fps": 60}"#,
        )
        .expect_err("unknown field");
        assert!(matches!(error, ManifestError::Parse { .. }));
    }

    #[test]
    fn zero_size_is_invalid() {
        let error = parse(r#"{"name": "Demo", "shortname": "demo", "size": {"width": 0, "height": 200}}"#)
            .expect_err("zero width");
        assert!(matches!(error, ManifestError::Invalid { field: "size", .. }));
    }

    #[test]
    fn missing_manifest_file_is_a_read_error() {
        let dir = TempDir::new().expect("temp dir");
        let error = load_manifest(dir.path()).expect_err("no manifest");
        assert!(matches!(error, ManifestError::Read { .. }));
    }

    #[test]
    fn loads_manifest_from_game_directory() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"name": "Demo", "shortname": "demo", "size": {"width": 64, "height": 48}, "place_digits": 2}"#,
        )
        .expect("write manifest");

        let manifest = load_manifest(dir.path()).expect("manifest");
        assert_eq!(manifest.place_digits, 2);
    }
}
