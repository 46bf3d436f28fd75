//! On-disk level schema.
//!
//! All coordinates are in world units. Blocks and rail stops sit on multiples
//! of the cell size; rail segments usually sit just off a stop, inside its
//! scan radius, on the side the track leaves from.

use serde::{Deserialize, Serialize};
use voltrail_core::coord::{Direction, Rotation};
use voltrail_world::WorldConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelData {
    pub config: WorldConfig,
    pub rails: Vec<[i32; 3]>,
    pub rail_stops: Vec<[i32; 3]>,
    pub blocks: Vec<BlockData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub name: String,
    pub position: [i32; 3],
    #[serde(default)]
    pub facing: Rotation,
    /// Connector directions in the block's local frame.
    #[serde(default)]
    pub connectors: Vec<Direction>,
    #[serde(default)]
    pub midpoint: bool,
    #[serde(default = "default_interactable")]
    pub interactable: bool,
    #[serde(default)]
    pub start_powered: bool,
    /// Initial state of a switchable source device, if the block has one.
    #[serde(default)]
    pub power_source: Option<bool>,
}

fn default_interactable() -> bool {
    true
}
