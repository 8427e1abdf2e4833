use std::collections::HashMap;
use std::path::{Path, PathBuf};

use questy_engine::content::{
    discover_character_frames, discover_overlays, discover_places, load_frames, load_links,
    AssetError, ExitLink, LinkTable, OverlaySpec, PlaceFiles, LINKS_FILE,
};
use questy_engine::{
    run_world, Character, Direction, Game, GameError, GameInfo, ImageSlot, Object, Place, PlaceRef,
    SystemContext, Transition, World, WorldConfig, WorldError,
};
use thiserror::Error;
use tracing::{info, warn};

use super::manifest::{load_manifest, GameManifest, ManifestError};

const PLACES_DIR: &str = "places";
const OBJECTS_DIR: &str = "objects";

#[derive(Debug, Error)]
pub(crate) enum DirectoryGameError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("no places found in {0}")]
    NoPlaces(PathBuf),
    #[error("no character frames found in {0}")]
    NoFrames(PathBuf),
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error(transparent)]
    World(#[from] WorldError),
}

impl From<DirectoryGameError> for GameError {
    fn from(error: DirectoryGameError) -> Self {
        match error {
            DirectoryGameError::World(error) => GameError::World(error),
            other => GameError::other("failed to load game directory", other),
        }
    }
}

/// A game described entirely by files: `game.json` plus the data directory.
#[derive(Debug)]
pub(crate) struct DirectoryGame {
    info: GameInfo,
    manifest: GameManifest,
    world: Option<World>,
}

impl DirectoryGame {
    pub(crate) fn open(game_dir: &Path) -> Result<Self, DirectoryGameError> {
        let manifest = load_manifest(game_dir)?;
        let info = GameInfo {
            name: manifest.name.clone(),
            shortname: manifest.shortname.clone(),
            size: manifest.size,
            datadir: game_dir.join(&manifest.datadir),
        };
        info!(
            name = %info.name,
            datadir = %info.datadir.display(),
            width = info.size.width,
            height = info.size.height,
            "game_manifest_loaded"
        );
        Ok(Self {
            info,
            manifest,
            world: None,
        })
    }

    pub(crate) fn world(&self) -> Option<&World> {
        self.world.as_ref()
    }

    /// Assembles places, exits, overlays and the leading character.
    pub(crate) fn build_world(&self, context: &SystemContext) -> Result<World, DirectoryGameError> {
        let mut config = WorldConfig::new(self.manifest.size);
        config.enforce_screen_bounds = self.manifest.enforce_screen_bounds;
        config.asset_loading = context.config.asset_loading;
        let mut world = World::new(config, context.signals.clone(), context.events.clone());

        let places_dir = self.info.datadir.join(PLACES_DIR);
        let place_files = discover_places(&places_dir, self.manifest.place_digits);
        if place_files.is_empty() {
            return Err(DirectoryGameError::NoPlaces(places_dir));
        }
        let links = read_links(&places_dir);
        let overlays = group_overlays(discover_overlays(&self.info.datadir.join(OBJECTS_DIR))?);

        for files in &place_files {
            let mut place = self.place_from_files(&world, files);
            if let Some(exits) = links.get(&files.index) {
                add_exits(&mut place, files.index, exits, place_files.len());
            }
            for spec in overlays.get(&files.index).into_iter().flatten() {
                place.add_object(overlay_object(spec));
            }
            world.add_place(place);
        }
        for (index, specs) in &overlays {
            if *index >= place_files.len() {
                warn!(place = index, count = specs.len(), "overlays_for_missing_place");
            }
        }

        let character = self.leading_character(&world)?;
        let leading = world.add_character(character);
        world.set_leading(leading)?;

        let start = &self.manifest.start;
        world.set_place(PlaceRef::Index(start.place), start.position, start.direction)?;
        info!(
            places = place_files.len(),
            start_place = start.place,
            "world_built"
        );
        Ok(world)
    }

    fn place_from_files(&self, world: &World, files: &PlaceFiles) -> Place {
        let mut place = world
            .create_place()
            .with_id(questy_engine::content::place_stem(
                files.index,
                self.manifest.place_digits,
            ))
            .with_background(ImageSlot::deferred(&files.background));
        if let Some(mask) = &files.mask {
            place = place.with_deferred_mask(mask);
        }
        if let Some(power) = self.manifest.depth_power {
            place = place.with_depth_power(power);
        }
        place
    }

    fn leading_character(&self, world: &World) -> Result<Character, DirectoryGameError> {
        let frames_dir = self.info.datadir.join(&self.manifest.character);
        let frames = load_frames(&discover_character_frames(&frames_dir)?);
        if frames.values().all(Vec::is_empty) {
            return Err(DirectoryGameError::NoFrames(frames_dir));
        }
        for direction in Direction::ALL {
            if frames.get(&direction).map_or(true, Vec::is_empty) {
                warn!(
                    character = %self.manifest.character,
                    direction = %direction,
                    "character_direction_missing"
                );
            }
        }

        let start = &self.manifest.start;
        let position = start.position.unwrap_or_else(|| world.default_position());
        let direction = start.direction.unwrap_or(Direction::BottomCenter);
        Ok(Character::new(&self.manifest.character, frames, position, direction)
            .with_frame_duration(self.manifest.frame_duration())
            .with_stride(self.manifest.stride))
    }
}

impl Game for DirectoryGame {
    fn info(&self) -> &GameInfo {
        &self.info
    }

    fn start_game(&mut self, context: &SystemContext) -> Result<(), GameError> {
        let mut world = self.build_world(context)?;
        world.start()?;
        self.world = Some(world);
        Ok(())
    }

    fn run_game(&mut self, context: &SystemContext) -> Result<(), GameError> {
        let Some(world) = self.world.as_mut() else {
            return Err(GameError::Message("game was not started".to_string()));
        };
        let mut display = context.config.display.clone();
        display.window_title = self.info.name.clone();
        run_world(world, &display)?;
        Ok(())
    }

    fn end_game(&mut self, _context: &SystemContext) -> Result<(), GameError> {
        if let Some(world) = self.world.as_mut() {
            world.end();
        }
        Ok(())
    }
}

fn read_links(places_dir: &Path) -> LinkTable {
    let path = places_dir.join(LINKS_FILE);
    if !path.is_file() {
        return LinkTable::new();
    }
    match load_links(&path) {
        Ok(table) => table,
        Err(error) => {
            warn!(error = %error, "links_unavailable");
            LinkTable::new()
        }
    }
}

fn add_exits(place: &mut Place, index: usize, exits: &[ExitLink], place_count: usize) {
    for link in exits {
        if link.target >= place_count {
            warn!(place = index, target = link.target, "exit_target_missing");
            continue;
        }
        let mut transition = Transition::to(link.target);
        if let Some(position) = link.target_position {
            transition = transition.at(position);
        }
        if let Some(direction) = link.target_direction {
            transition = transition.facing(direction);
        }
        let name = format!("exit {}", link.compass.symbol());
        let id = place.add_object(
            Object::exit(link.object_position, link.object_size, transition).with_name(name),
        );
        place.set_direction_object(link.compass, id);
    }
}

fn overlay_object(spec: &OverlaySpec) -> Object {
    let mut object = Object::new(spec.position, Default::default())
        .with_name(spec.name.clone())
        .with_coordinates(spec.coordinates)
        .with_image(ImageSlot::deferred(&spec.path));
    if let Some(area) = spec.trigger_area() {
        object = object.with_area(area);
    }
    object
}

fn group_overlays(specs: Vec<OverlaySpec>) -> HashMap<usize, Vec<OverlaySpec>> {
    let mut grouped: HashMap<usize, Vec<OverlaySpec>> = HashMap::new();
    for spec in specs {
        grouped.entry(spec.place).or_default().push(spec);
    }
    grouped
}
