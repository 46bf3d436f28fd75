//! Spatial grid for block and rail-stop placement and neighbour queries.
//!
//! The grid keeps two independent occupancy layers keyed by exact
//! [`Coordinate`]: one for blocks and one for rail stops. A coordinate holds
//! at most one entity per layer, but a block and a rail stop routinely share
//! a coordinate (a block resting on its stop).
//!
//! The block layer also records each block's facing, since facing is part of
//! a block's placement and changes only when a rotation completes.

use serde::{Deserialize, Serialize};
use slotmap::{Key, SecondaryMap};
use std::collections::BTreeMap;
use voltrail_core::coord::{Coordinate, Direction, Rotation};
use voltrail_core::id::{BlockId, RailStopId};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which occupancy layer an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Block,
    RailStop,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Block => f.write_str("block"),
            Layer::RailStop => f.write_str("rail stop"),
        }
    }
}

/// Errors from spatial operations.
///
/// All of these indicate malformed level data or a broken invariant in the
/// caller; none occur during correct operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("{coord} already holds a {layer}")]
    DuplicateOccupant { coord: Coordinate, layer: Layer },
    #[error("no matching {layer} registered at {coord}")]
    NotRegistered { coord: Coordinate, layer: Layer },
    #[error("{layer} is already registered on the grid")]
    AlreadyRegistered { layer: Layer },
    #[error("{layer} is not registered on the grid")]
    NotPlaced { layer: Layer },
}

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// Bidirectional coordinate <-> entity map for one layer.
#[derive(Debug)]
struct Occupancy<K: Key> {
    layer: Layer,
    cells: BTreeMap<Coordinate, K>,
    positions: SecondaryMap<K, Coordinate>,
}

impl<K: Key> Occupancy<K> {
    fn new(layer: Layer) -> Self {
        Self {
            layer,
            cells: BTreeMap::new(),
            positions: SecondaryMap::new(),
        }
    }

    fn register(&mut self, coord: Coordinate, entity: K) -> Result<(), SpatialError> {
        if self.cells.contains_key(&coord) {
            return Err(SpatialError::DuplicateOccupant {
                coord,
                layer: self.layer,
            });
        }
        if self.positions.contains_key(entity) {
            return Err(SpatialError::AlreadyRegistered { layer: self.layer });
        }
        self.cells.insert(coord, entity);
        self.positions.insert(entity, coord);
        Ok(())
    }

    fn lookup(&self, coord: Coordinate) -> Option<K> {
        self.cells.get(&coord).copied()
    }

    fn position(&self, entity: K) -> Option<Coordinate> {
        self.positions.get(entity).copied()
    }

    fn relocate(&mut self, old: Coordinate, new: Coordinate, entity: K) -> Result<(), SpatialError> {
        if self.cells.get(&old) != Some(&entity) {
            return Err(SpatialError::NotRegistered {
                coord: old,
                layer: self.layer,
            });
        }
        if old == new {
            return Ok(());
        }
        if self.cells.contains_key(&new) {
            return Err(SpatialError::DuplicateOccupant {
                coord: new,
                layer: self.layer,
            });
        }
        // Both checks passed; the swap below cannot fail halfway.
        self.cells.remove(&old);
        self.cells.insert(new, entity);
        self.positions.insert(entity, new);
        Ok(())
    }

    fn len(&self) -> usize {
        self.cells.len()
    }
}

// ---------------------------------------------------------------------------
// SpatialGrid
// ---------------------------------------------------------------------------

/// Coordinate index for blocks and rail stops.
///
/// Maintains, per layer:
/// - `cells`: coordinate -> entity
/// - `positions`: entity -> coordinate
///
/// plus `facings`: block -> orientation about the vertical axis.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: i32,
    blocks: Occupancy<BlockId>,
    rail_stops: Occupancy<RailStopId>,
    facings: SecondaryMap<BlockId, Rotation>,
}

impl SpatialGrid {
    /// Create an empty grid whose cells are `cell_size` world units wide.
    pub fn new(cell_size: i32) -> Self {
        Self {
            cell_size: cell_size.max(1),
            blocks: Occupancy::new(Layer::Block),
            rail_stops: Occupancy::new(Layer::RailStop),
            facings: SecondaryMap::new(),
        }
    }

    /// World units per grid cell.
    pub fn cell_size(&self) -> i32 {
        self.cell_size
    }

    // -- Registration --

    /// Register a block at `coord` with the given facing.
    pub fn register_block(
        &mut self,
        coord: Coordinate,
        block: BlockId,
        facing: Rotation,
    ) -> Result<(), SpatialError> {
        self.blocks.register(coord, block)?;
        self.facings.insert(block, facing);
        Ok(())
    }

    /// Register a rail stop at `coord`.
    pub fn register_rail_stop(
        &mut self,
        coord: Coordinate,
        stop: RailStopId,
    ) -> Result<(), SpatialError> {
        self.rail_stops.register(coord, stop)
    }

    // -- Point queries --

    /// The block occupying `coord`, if any.
    pub fn block_at(&self, coord: Coordinate) -> Option<BlockId> {
        self.blocks.lookup(coord)
    }

    /// The rail stop at `coord`, if any.
    pub fn rail_stop_at(&self, coord: Coordinate) -> Option<RailStopId> {
        self.rail_stops.lookup(coord)
    }

    pub fn block_position(&self, block: BlockId) -> Option<Coordinate> {
        self.blocks.position(block)
    }

    pub fn rail_stop_position(&self, stop: RailStopId) -> Option<Coordinate> {
        self.rail_stops.position(stop)
    }

    pub fn facing(&self, block: BlockId) -> Option<Rotation> {
        self.facings.get(block).copied()
    }

    // -- Neighbours --

    /// The block at exactly `coord + direction * step`, if any.
    pub fn neighbor_block(
        &self,
        coord: Coordinate,
        direction: Direction,
        step: i32,
    ) -> Option<BlockId> {
        self.blocks.lookup(coord.offset(direction, step))
    }

    /// The rail stop at exactly `coord + direction * step`, if any.
    pub fn neighbor_rail_stop(
        &self,
        coord: Coordinate,
        direction: Direction,
        step: i32,
    ) -> Option<RailStopId> {
        self.rail_stops.lookup(coord.offset(direction, step))
    }

    /// The block one cell away from `block` in `direction`.
    pub fn adjacent_block(&self, block: BlockId, direction: Direction) -> Option<BlockId> {
        let origin = self.blocks.position(block)?;
        self.neighbor_block(origin, direction, self.cell_size)
    }

    // -- Mutation --

    /// Move `block` from `old` to `new` in one step.
    ///
    /// Fails with [`SpatialError::NotRegistered`] if `old` does not hold
    /// `block`, and with [`SpatialError::DuplicateOccupant`] if another block
    /// already sits at `new`. On failure the grid is unchanged.
    pub fn relocate_block(
        &mut self,
        old: Coordinate,
        new: Coordinate,
        block: BlockId,
    ) -> Result<(), SpatialError> {
        self.blocks.relocate(old, new, block)
    }

    /// Replace a block's facing.
    pub fn set_facing(&mut self, block: BlockId, facing: Rotation) -> Result<(), SpatialError> {
        match self.facings.get_mut(block) {
            Some(slot) => {
                *slot = facing;
                Ok(())
            }
            None => Err(SpatialError::NotPlaced { layer: Layer::Block }),
        }
    }

    // -- Iteration & stats --

    /// All registered blocks in coordinate order.
    pub fn blocks(&self) -> impl Iterator<Item = (Coordinate, BlockId)> + '_ {
        self.blocks.cells.iter().map(|(&c, &b)| (c, b))
    }

    /// All registered rail stops in coordinate order.
    pub fn rail_stops(&self) -> impl Iterator<Item = (Coordinate, RailStopId)> + '_ {
        self.rail_stops.cells.iter().map(|(&c, &s)| (c, s))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn rail_stop_count(&self) -> usize {
        self.rail_stops.len()
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(voltrail_core::coord::DEFAULT_CELL_SIZE)
    }
}
