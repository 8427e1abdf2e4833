use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::app::{CoordinateMode, Point, Rect, Size};

use super::assets::{AssetError, BACKGROUND_EXTENSIONS};
use super::links::{parse_point, parse_size};

const NO_EXTENT: &str = "_";

/// Trigger extent encoded in an overlay file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayExtent {
    /// Use the image rectangle.
    Image,
    Size(Size),
    Range { from: Point, to: Point },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpec {
    pub place: usize,
    pub position: Point,
    pub coordinates: CoordinateMode,
    pub extent: OverlayExtent,
    pub name: String,
    pub path: PathBuf,
}

impl OverlaySpec {
    pub fn trigger_area(&self) -> Option<Rect> {
        match self.extent {
            OverlayExtent::Image => None,
            OverlayExtent::Size(size) => Some(Rect::new(self.position, size)),
            OverlayExtent::Range { from, to } => Some(Rect::from_corners(from, to)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverlayNameError {
    #[error("overlay file name has no stem")]
    NoStem,
    #[error("expected <place>-<x>,<y>-<rel>-<extent>-<name>, found {0} parts")]
    PartCount(usize),
    #[error("invalid place index '{0}'")]
    Place(String),
    #[error("invalid position '{0}'")]
    Position(String),
    #[error("invalid coordinate flag '{0}', expected 0 or 1")]
    Coordinates(String),
    #[error("invalid extent '{0}', expected WxH, X1,Y1:X2,Y2 or _")]
    Extent(String),
}

pub fn parse_overlay_name(path: &Path) -> Result<OverlaySpec, OverlayNameError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or(OverlayNameError::NoStem)?;
    let parts: Vec<&str> = stem.splitn(5, '-').collect();
    let [place, position, coordinates, extent, name] = parts[..] else {
        return Err(OverlayNameError::PartCount(parts.len()));
    };

    let place = place
        .parse::<usize>()
        .map_err(|_| OverlayNameError::Place(place.to_string()))?;
    let position =
        parse_point(position).ok_or_else(|| OverlayNameError::Position(position.to_string()))?;
    let coordinates = match coordinates {
        "0" => CoordinateMode::Rendered,
        "1" => CoordinateMode::Logical,
        other => return Err(OverlayNameError::Coordinates(other.to_string())),
    };
    let extent = parse_extent(extent).ok_or_else(|| OverlayNameError::Extent(extent.to_string()))?;

    Ok(OverlaySpec {
        place,
        position,
        coordinates,
        extent,
        name: name.to_string(),
        path: path.to_path_buf(),
    })
}

fn parse_extent(text: &str) -> Option<OverlayExtent> {
    if text == NO_EXTENT {
        return Some(OverlayExtent::Image);
    }
    if let Some((from, to)) = text.split_once(':') {
        return Some(OverlayExtent::Range {
            from: parse_point(from)?,
            to: parse_point(to)?,
        });
    }
    parse_size(text).map(OverlayExtent::Size)
}

/// Image files in `dir` whose names decode as overlays, sorted by path.
/// Other files are logged and skipped.
pub fn discover_overlays(dir: &Path) -> Result<Vec<OverlaySpec>, AssetError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| AssetError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| AssetError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                BACKGROUND_EXTENSIONS
                    .iter()
                    .any(|known| extension.eq_ignore_ascii_case(known))
            });
        if is_image && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|path| match parse_overlay_name(&path) {
            Ok(spec) => Some(spec),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "overlay_name_invalid");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn size_extent_becomes_trigger_rect() {
        let spec = parse_overlay_name(Path::new("objects/2-100,150-0-40x30-lamp-post.png"))
            .expect("parse");
        assert_eq!(spec.place, 2);
        assert_eq!(spec.position, Point::new(100, 150));
        assert_eq!(spec.coordinates, CoordinateMode::Rendered);
        assert_eq!(spec.name, "lamp-post");
        assert_eq!(
            spec.trigger_area(),
            Some(Rect::new(Point::new(100, 150), Size::new(40, 30)))
        );
    }

    #[test]
    fn range_and_image_extents() {
        let range = parse_overlay_name(Path::new("0-5,5-1-10,20:30,60-door.png")).expect("parse");
        assert_eq!(range.coordinates, CoordinateMode::Logical);
        assert_eq!(
            range.trigger_area(),
            Some(Rect::new(Point::new(10, 20), Size::new(20, 40)))
        );

        let image = parse_overlay_name(Path::new("0-5,5-0-_-tree.png")).expect("parse");
        assert_eq!(image.extent, OverlayExtent::Image);
        assert_eq!(image.trigger_area(), None);
    }

    #[test]
    fn bad_names_are_rejected() {
        assert_eq!(
            parse_overlay_name(Path::new("0-5,5-tree.png")),
            Err(OverlayNameError::PartCount(3))
        );
        assert_eq!(
            parse_overlay_name(Path::new("0-5,5-2-_-tree.png")),
            Err(OverlayNameError::Coordinates("2".to_string()))
        );
        assert_eq!(
            parse_overlay_name(Path::new("0-5,5-0-big-tree.png")),
            Err(OverlayNameError::Extent("big".to_string()))
        );
    }

    #[test]
    fn discovery_skips_unparseable_files() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("1-0,0-0-_-rock.png"), b"").expect("write");
        fs::write(temp.path().join("0-0,0-0-_-bush.png"), b"").expect("write");
        fs::write(temp.path().join("readme.png"), b"").expect("write");
        fs::write(temp.path().join("0-0,0-0-_-notes.txt"), b"").expect("write");

        let overlays = discover_overlays(temp.path()).expect("discover");
        let names: Vec<&str> = overlays.iter().map(|spec| spec.name.as_str()).collect();
        assert_eq!(names, vec!["bush", "rock"]);
        assert!(discover_overlays(&temp.path().join("missing"))
            .expect("missing dir")
            .is_empty());
    }
}
