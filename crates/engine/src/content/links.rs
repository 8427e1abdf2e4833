use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::app::{Compass, Direction, Point, Size};

pub const LINKS_FILE: &str = "links.txt";
const NONE_MARKER: &str = "-";

/// One exit of a place: the trigger rectangle and where it leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitLink {
    pub compass: Compass,
    pub target: usize,
    pub target_position: Option<Point>,
    pub object_position: Point,
    pub object_size: Size,
    pub target_direction: Option<Direction>,
}

pub type LinkTable = BTreeMap<usize, Vec<ExitLink>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkParseError {
    #[error("expected 5 '|'-separated fields, found {0}")]
    FieldCount(usize),
    #[error("unknown exit symbol '{0}', expected one of ^ > v <")]
    Compass(String),
    #[error("invalid place index '{0}'")]
    PlaceIndex(String),
    #[error("invalid point '{0}', expected X,Y")]
    Point(String),
    #[error("invalid object rectangle '{0}', expected X,Y WxH")]
    Rect(String),
    #[error("invalid direction '{0}'")]
    Direction(String),
}

#[derive(Debug, Error)]
#[error("failed to read link file {path}: {source}")]
pub struct LinkFileError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

pub fn load_links(path: &Path) -> Result<LinkTable, LinkFileError> {
    let text = fs::read_to_string(path).map_err(|source| LinkFileError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_links(&text))
}

/// Blank-line separated blocks: a place index, then one exit per line.
/// Malformed lines and blocks are logged and skipped.
pub fn parse_links(text: &str) -> LinkTable {
    let mut table = LinkTable::new();
    let mut current: Option<usize> = None;
    let mut skipping_block = false;

    for (line_index, raw) in text.lines().enumerate() {
        let line_number = line_index + 1;
        let line = raw.trim();
        if line.is_empty() {
            current = None;
            skipping_block = false;
            continue;
        }
        if line.starts_with('#') || skipping_block {
            continue;
        }

        let Some(place) = current else {
            match line.parse::<usize>() {
                Ok(index) => {
                    current = Some(index);
                    table.entry(index).or_default();
                }
                Err(_) => {
                    warn!(line = line_number, text = line, "link_block_header_invalid");
                    skipping_block = true;
                }
            }
            continue;
        };

        match parse_exit_line(line) {
            Ok(link) => table.entry(place).or_default().push(link),
            Err(error) => {
                warn!(line = line_number, place, error = %error, "link_line_skipped");
            }
        }
    }
    table
}

pub fn parse_exit_line(line: &str) -> Result<ExitLink, LinkParseError> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    let [symbol, target, target_position, object_rect, target_direction] = fields[..] else {
        return Err(LinkParseError::FieldCount(fields.len()));
    };

    let compass =
        Compass::from_symbol(symbol).ok_or_else(|| LinkParseError::Compass(symbol.to_string()))?;
    let target = target
        .parse::<usize>()
        .map_err(|_| LinkParseError::PlaceIndex(target.to_string()))?;
    let target_position = if target_position == NONE_MARKER {
        None
    } else {
        Some(parse_point(target_position).ok_or_else(|| {
            LinkParseError::Point(target_position.to_string())
        })?)
    };
    let (object_position, object_size) = parse_rect(object_rect)
        .ok_or_else(|| LinkParseError::Rect(object_rect.to_string()))?;
    let target_direction = if target_direction == NONE_MARKER {
        None
    } else {
        Some(
            target_direction
                .parse::<Direction>()
                .map_err(|_| LinkParseError::Direction(target_direction.to_string()))?,
        )
    };

    Ok(ExitLink {
        compass,
        target,
        target_position,
        object_position,
        object_size,
        target_direction,
    })
}

pub(crate) fn parse_point(text: &str) -> Option<Point> {
    let (x, y) = text.split_once(',')?;
    Some(Point::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub(crate) fn parse_size(text: &str) -> Option<Size> {
    let (width, height) = text.split_once(['x', 'X'])?;
    Some(Size::new(
        width.trim().parse().ok()?,
        height.trim().parse().ok()?,
    ))
}

fn parse_rect(text: &str) -> Option<(Point, Size)> {
    let (position, size) = text.split_once(char::is_whitespace)?;
    Some((parse_point(position)?, parse_size(size.trim())?))
}
