use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::warn;

use crate::app::{Direction, Size, Surface};

use super::mask::MASK_EXTENSION;

/// Background extensions, in lookup preference order.
pub const BACKGROUND_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];
pub const FRAME_EXTENSION: &str = "png";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to list directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn load_surface(path: &Path) -> Result<Surface, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = reader.with_guessed_format().map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(Surface::from_rgba(width, height, image.into_raw())
        .unwrap_or_else(|| Surface::solid(Size::new(width, height), [0, 0, 0, 0])))
}

/// An image that may be decoded on first use.
#[derive(Debug, Clone, Default)]
pub enum ImageSlot {
    #[default]
    Empty,
    Deferred(PathBuf),
    Loaded(Surface),
    Failed(PathBuf),
}

impl ImageSlot {
    pub fn deferred(path: impl Into<PathBuf>) -> Self {
        ImageSlot::Deferred(path.into())
    }

    pub fn ensure_loaded(&mut self) -> Option<&Surface> {
        if let ImageSlot::Deferred(path) = self {
            *self = match load_surface(path) {
                Ok(surface) => ImageSlot::Loaded(surface),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "image_load_failed");
                    ImageSlot::Failed(path.clone())
                }
            };
        }
        self.surface()
    }

    pub fn surface(&self) -> Option<&Surface> {
        match self {
            ImageSlot::Loaded(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ImageSlot::Deferred(_))
    }
}

impl From<Surface> for ImageSlot {
    fn from(surface: Surface) -> Self {
        ImageSlot::Loaded(surface)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceFiles {
    pub index: usize,
    pub background: PathBuf,
    pub mask: Option<PathBuf>,
}

pub fn place_stem(index: usize, digits: usize) -> String {
    format!("{index:0digits$}")
}

pub fn find_background(dir: &Path, index: usize, digits: usize) -> Option<PathBuf> {
    let stem = place_stem(index, digits);
    BACKGROUND_EXTENSIONS
        .iter()
        .map(|extension| dir.join(format!("{stem}.{extension}")))
        .find(|candidate| candidate.is_file())
}

/// Numbered places starting at 0; discovery stops at the first index with
/// no background image.
pub fn discover_places(dir: &Path, digits: usize) -> Vec<PlaceFiles> {
    let mut places = Vec::new();
    while let Some(background) = find_background(dir, places.len(), digits) {
        let index = places.len();
        let mask = dir.join(format!("{}.{MASK_EXTENSION}", place_stem(index, digits)));
        places.push(PlaceFiles {
            index,
            background,
            mask: mask.is_file().then_some(mask),
        });
    }
    places
}

/// Frame files per direction from `<dir>/<code>/*.png`, sorted by file name.
/// Directions without a subdirectory are left out.
pub fn discover_character_frames(
    dir: &Path,
) -> Result<HashMap<Direction, Vec<PathBuf>>, AssetError> {
    let mut frames = HashMap::new();
    for direction in Direction::ALL {
        let direction_dir = dir.join(direction.code());
        if !direction_dir.is_dir() {
            continue;
        }
        let entries = fs::read_dir(&direction_dir).map_err(|source| AssetError::ReadDir {
            path: direction_dir.clone(),
            source,
        })?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| AssetError::ReadDir {
                path: direction_dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_frame = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| extension.eq_ignore_ascii_case(FRAME_EXTENSION));
            if is_frame && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        frames.insert(direction, files);
    }
    Ok(frames)
}

/// Decodes every frame; undecodable frames are logged and skipped.
pub fn load_frames(files: &HashMap<Direction, Vec<PathBuf>>) -> HashMap<Direction, Vec<Surface>> {
    files
        .iter()
        .map(|(direction, paths)| {
            let surfaces = paths
                .iter()
                .filter_map(|path| match load_surface(path) {
                    Ok(surface) => Some(surface),
                    Err(error) => {
                        warn!(
                            direction = %direction,
                            error = %error,
                            "character_frame_load_failed"
                        );
                        None
                    }
                })
                .collect();
            (*direction, surfaces)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use super::*;

    fn write_png(path: &Path, width: u32, height: u32) {
        let image = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        image.save(path).expect("write png");
    }

    #[test]
    fn load_surface_decodes_rgba() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("frame.png");
        write_png(&path, 3, 2);

        let surface = load_surface(&path).expect("decode");
        assert_eq!(surface.size(), Size::new(3, 2));
        assert_eq!(surface.pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn deferred_slot_degrades_to_failed_on_missing_file() {
        let temp = TempDir::new().expect("tempdir");
        let mut slot = ImageSlot::deferred(temp.path().join("missing.png"));
        assert!(slot.is_pending());
        assert!(slot.ensure_loaded().is_none());
        assert!(matches!(slot, ImageSlot::Failed(_)));
    }

    #[test]
    fn places_are_discovered_until_the_first_gap() {
        let temp = TempDir::new().expect("tempdir");
        write_png(&temp.path().join("000.png"), 2, 2);
        write_png(&temp.path().join("001.bmp"), 2, 2);
        fs::write(temp.path().join("001.qwlk"), b"ignored").expect("mask");
        write_png(&temp.path().join("003.png"), 2, 2);

        let places = discover_places(temp.path(), 3);
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].mask, None);
        assert_eq!(places[1].background, temp.path().join("001.bmp"));
        assert_eq!(places[1].mask, Some(temp.path().join("001.qwlk")));
    }

    #[test]
    fn png_is_preferred_over_other_extensions() {
        let temp = TempDir::new().expect("tempdir");
        write_png(&temp.path().join("00.png"), 1, 1);
        fs::write(temp.path().join("00.jpg"), b"not really a jpeg").expect("jpg");
        assert_eq!(
            find_background(temp.path(), 0, 2),
            Some(temp.path().join("00.png"))
        );
    }

    #[test]
    fn character_frames_are_sorted_per_direction() {
        let temp = TempDir::new().expect("tempdir");
        let cb = temp.path().join("cb");
        fs::create_dir_all(&cb).expect("dir");
        write_png(&cb.join("02.png"), 1, 1);
        write_png(&cb.join("01.png"), 1, 1);
        fs::write(cb.join("notes.txt"), b"skip me").expect("txt");

        let files = discover_character_frames(temp.path()).expect("discover");
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[&Direction::BottomCenter],
            vec![cb.join("01.png"), cb.join("02.png")]
        );

        let surfaces = load_frames(&files);
        assert_eq!(surfaces[&Direction::BottomCenter].len(), 2);
    }
}
