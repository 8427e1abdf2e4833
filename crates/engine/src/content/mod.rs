mod assets;
mod links;
mod mask;
mod overlays;

pub use assets::{
    discover_character_frames, discover_places, find_background, load_frames, load_surface,
    place_stem, AssetError, ImageSlot, PlaceFiles, BACKGROUND_EXTENSIONS, FRAME_EXTENSION,
};
pub use links::{
    load_links, parse_exit_line, parse_links, ExitLink, LinkFileError, LinkParseError, LinkTable,
    LINKS_FILE,
};
pub use mask::{MaskError, WalkabilityMask, MASK_EXTENSION, MASK_MAGIC};
pub use overlays::{
    discover_overlays, parse_overlay_name, OverlayExtent, OverlayNameError, OverlaySpec,
};
