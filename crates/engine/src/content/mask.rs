use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::app::{Point, Size};

pub const MASK_MAGIC: [u8; 4] = *b"QWLK";
pub const MASK_EXTENSION: &str = "qwlk";
const HEADER_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("walkability data is {len} bytes, shorter than the 12-byte header")]
    TruncatedHeader { len: usize },
    #[error("walkability data does not start with the QWLK magic")]
    BadMagic,
    #[error("walkability grid has zero area ({width}x{height})")]
    EmptyGrid { width: u32, height: u32 },
    #[error("walkability grid {width}x{height} needs {expected} bytes of bits, found {found}")]
    Undersized {
        width: u32,
        height: u32,
        expected: usize,
        found: usize,
    },
    #[error(
        "walkability grid is {}x{} but the world is {}x{}",
        .found.width, .found.height, .expected.width, .expected.height
    )]
    SizeMismatch { expected: Size, found: Size },
    #[error("failed to read walkability file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Bit grid marking where a character may stand. Row-major, LSB first.
#[derive(Clone, PartialEq, Eq)]
pub struct WalkabilityMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl fmt::Debug for WalkabilityMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkabilityMask")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

fn bit_len(width: u32, height: u32) -> usize {
    (width as usize * height as usize).div_ceil(8)
}

impl WalkabilityMask {
    pub fn filled(size: Size, walkable: bool) -> Self {
        let fill = if walkable { 0xFF } else { 0x00 };
        Self {
            width: size.width,
            height: size.height,
            bits: vec![fill; bit_len(size.width, size.height)],
        }
    }

    pub fn from_fn(size: Size, walkable: impl Fn(u32, u32) -> bool) -> Self {
        let mut mask = Self::filled(size, false);
        for y in 0..size.height {
            for x in 0..size.width {
                if walkable(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MaskError> {
        if bytes.len() < HEADER_LEN {
            return Err(MaskError::TruncatedHeader { len: bytes.len() });
        }
        if bytes[0..4] != MASK_MAGIC {
            return Err(MaskError::BadMagic);
        }
        let width = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let height = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if width == 0 || height == 0 {
            return Err(MaskError::EmptyGrid { width, height });
        }

        let expected = bit_len(width, height);
        let body = &bytes[HEADER_LEN..];
        if body.len() < expected {
            return Err(MaskError::Undersized {
                width,
                height,
                expected,
                found: body.len(),
            });
        }

        Ok(Self {
            width,
            height,
            bits: body[..expected].to_vec(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, MaskError> {
        let bytes = fs::read(path).map_err(|source| MaskError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Loads and rejects grids that do not cover exactly `expected`.
    pub fn load_sized(path: &Path, expected: Size) -> Result<Self, MaskError> {
        let mask = Self::load(path)?;
        if mask.size() != expected {
            return Err(MaskError::SizeMismatch {
                expected,
                found: mask.size(),
            });
        }
        Ok(mask)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.bits.len());
        bytes.extend_from_slice(&MASK_MAGIC);
        bytes.extend_from_slice(&self.width.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.bits);
        bytes
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Out-of-range points are never walkable.
    pub fn query(&self, point: Point) -> bool {
        if point.x < 0 || point.y < 0 {
            return false;
        }
        self.bit_index(point.x as u32, point.y as u32)
            .is_some_and(|index| self.bits[index / 8] & (1 << (index % 8)) != 0)
    }

    pub fn set(&mut self, x: u32, y: u32, walkable: bool) {
        let Some(index) = self.bit_index(x, y) else {
            return;
        };
        let mask = 1u8 << (index % 8);
        if walkable {
            self.bits[index / 8] |= mask;
        } else {
            self.bits[index / 8] &= !mask;
        }
    }

    fn bit_index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn marked_square() -> WalkabilityMask {
        WalkabilityMask::from_fn(Size::new(13, 7), |x, y| {
            (3..9).contains(&x) && (2..6).contains(&y)
        })
    }

    #[test]
    fn marked_region_is_walkable_and_everything_else_is_not() {
        let mask = WalkabilityMask::from_bytes(&marked_square().to_bytes()).expect("decode");
        for y in 0..7 {
            for x in 0..13 {
                let inside = (3..9).contains(&x) && (2..6).contains(&y);
                assert_eq!(mask.query(Point::new(x, y)), inside, "x={x} y={y}");
            }
        }
    }

    #[test]
    fn out_of_bounds_points_are_not_walkable() {
        let mask = WalkabilityMask::filled(Size::new(4, 4), true);
        for point in [
            Point::new(-1, 0),
            Point::new(0, -1),
            Point::new(4, 0),
            Point::new(0, 4),
            Point::new(i32::MAX, i32::MAX),
        ] {
            assert!(!mask.query(point), "point={point:?}");
        }
        assert!(mask.query(Point::new(3, 3)));
    }

    #[test]
    fn malformed_data_is_rejected() {
        assert!(matches!(
            WalkabilityMask::from_bytes(b"QWLK"),
            Err(MaskError::TruncatedHeader { len: 4 })
        ));

        let mut bad_magic = marked_square().to_bytes();
        bad_magic[0] = b'X';
        assert!(matches!(
            WalkabilityMask::from_bytes(&bad_magic),
            Err(MaskError::BadMagic)
        ));

        let mut short = marked_square().to_bytes();
        short.truncate(short.len() - 1);
        assert!(matches!(
            WalkabilityMask::from_bytes(&short),
            Err(MaskError::Undersized { expected: 12, found: 11, .. })
        ));

        let mut empty = MASK_MAGIC.to_vec();
        empty.extend_from_slice(&0u32.to_le_bytes());
        empty.extend_from_slice(&5u32.to_le_bytes());
        assert!(matches!(
            WalkabilityMask::from_bytes(&empty),
            Err(MaskError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn set_clears_and_marks_single_bits() {
        let mut mask = WalkabilityMask::filled(Size::new(9, 2), true);
        mask.set(8, 1, false);
        assert!(!mask.query(Point::new(8, 1)));
        assert!(mask.query(Point::new(7, 1)));
        mask.set(8, 1, true);
        assert!(mask.query(Point::new(8, 1)));
        mask.set(100, 100, false);
    }

    #[test]
    fn load_sized_rejects_mismatched_world() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("000.qwlk");
        fs::write(&path, marked_square().to_bytes()).expect("write mask");

        let loaded = WalkabilityMask::load_sized(&path, Size::new(13, 7)).expect("load");
        assert_eq!(loaded, marked_square());
        assert!(matches!(
            WalkabilityMask::load_sized(&path, Size::new(640, 480)),
            Err(MaskError::SizeMismatch { .. })
        ));
        assert!(matches!(
            WalkabilityMask::load(&temp.path().join("missing.qwlk")),
            Err(MaskError::Io { .. })
        ));
    }
}
