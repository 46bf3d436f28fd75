//! Turning level files into worlds.

use std::collections::HashSet;
use std::path::Path;

use voltrail_core::coord::Coordinate;
use voltrail_world::{BlockSpec, World, WorldBuilder, WorldConfig, WorldError};

use crate::loader::{DataLoadError, deserialize_file};
use crate::schema::{BlockData, LevelData};

/// Load a standalone world config file.
pub fn load_config(path: &Path) -> Result<WorldConfig, DataLoadError> {
    deserialize_file(path)
}

/// Load a level file and build its world.
pub fn load_level(path: &Path) -> Result<World, DataLoadError> {
    let level: LevelData = deserialize_file(path)?;
    let world = build_level(&level, path)?;
    tracing::info!(file = %path.display(), blocks = level.blocks.len(), "level loaded");
    Ok(world)
}

/// Build a world from parsed level data. `file` is only used in errors.
pub fn build_level(level: &LevelData, file: &Path) -> Result<World, DataLoadError> {
    let mut seen = HashSet::new();
    for block in &level.blocks {
        if !seen.insert(block.name.as_str()) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: block.name.clone(),
            });
        }
    }

    let invalid = |source: WorldError| DataLoadError::InvalidLevel {
        file: file.to_path_buf(),
        source,
    };

    let mut builder = WorldBuilder::new(level.config.clone());
    for &rail in &level.rails {
        builder.add_rail(Coordinate::from(rail)).map_err(invalid)?;
    }
    builder
        .register_all(
            level.blocks.iter().map(block_spec),
            level.rail_stops.iter().copied().map(Coordinate::from),
        )
        .map_err(invalid)?;
    builder.build().map_err(invalid)
}

fn block_spec(data: &BlockData) -> BlockSpec {
    let mut spec = BlockSpec::new(data.name.clone(), Coordinate::from(data.position))
        .facing(data.facing)
        .connectors(data.connectors.iter().copied())
        .interactable(data.interactable);
    if data.midpoint {
        spec = spec.midpoint();
    }
    if data.start_powered {
        spec = spec.start_powered();
    }
    if let Some(on) = data.power_source {
        spec = spec.power_source(on);
    }
    spec
}
