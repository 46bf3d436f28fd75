//! World construction.
//!
//! Rails, rail stops and blocks can be registered in any order. Rail
//! adjacency, home stops and the initial power state are all derived in
//! [`WorldBuilder::build`] once everything is known.

use std::collections::BTreeSet;

use slotmap::SlotMap;
use voltrail_core::coord::Coordinate;
use voltrail_core::id::{BlockId, RailSegmentId, RailStopId};
use voltrail_power::{ConnectorSet, PowerGraph, PowerNode, PowerSource};
use voltrail_rail::RailNetwork;
use voltrail_spatial::{Layer, SpatialError, SpatialGrid};

use crate::block::{Block, BlockSpec, MotionState};
use crate::config::WorldConfig;
use crate::error::WorldError;
use crate::event::EventBus;
use crate::transition::TransitionScheduler;
use crate::world::World;

#[derive(Debug)]
pub struct WorldBuilder {
    config: WorldConfig,
    grid: SpatialGrid,
    rails: RailNetwork,
    power: PowerGraph,
    blocks: SlotMap<BlockId, Block>,
}

impl WorldBuilder {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            grid: SpatialGrid::new(config.cell_size),
            rails: RailNetwork::new(config.rail_scan_radius, config.max_extent),
            power: PowerGraph::with_reciprocal_connectors(config.require_reciprocal_connectors),
            blocks: SlotMap::with_key(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn add_rail(&mut self, at: Coordinate) -> Result<RailSegmentId, WorldError> {
        Ok(self.rails.add_segment(at)?)
    }

    pub fn add_rail_stop(&mut self, at: Coordinate) -> Result<RailStopId, WorldError> {
        if self.grid.rail_stop_at(at).is_some() {
            return Err(duplicate(at, Layer::RailStop));
        }
        let stop = self.rails.add_stop(at);
        self.grid.register_rail_stop(at, stop)?;
        Ok(stop)
    }

    pub fn add_block(&mut self, spec: BlockSpec) -> Result<BlockId, WorldError> {
        if self.grid.block_at(spec.position).is_some() {
            return Err(duplicate(spec.position, Layer::Block));
        }
        let id = self.blocks.insert(Block {
            name: spec.name,
            interactable: spec.interactable,
            motion: MotionState::Idle,
            home_rail_stop: None,
            selected: false,
        });
        self.grid.register_block(spec.position, id, spec.facing)?;

        let mut node = PowerNode::new(ConnectorSet::new(spec.connectors))
            .start_powered(spec.start_powered)
            .with_sinks(spec.sinks);
        if spec.midpoint {
            node = node.with_midpoint();
        }
        if let Some(starts_powered) = spec.power_source {
            node = node.with_source(PowerSource::new(starts_powered));
        }
        self.power.add_block(id, node)?;
        Ok(id)
    }

    /// Register a batch of blocks and rail stops. Returns the block ids in
    /// input order.
    pub fn register_all(
        &mut self,
        blocks: impl IntoIterator<Item = BlockSpec>,
        rail_stops: impl IntoIterator<Item = Coordinate>,
    ) -> Result<Vec<BlockId>, WorldError> {
        for at in rail_stops {
            self.add_rail_stop(at)?;
        }
        blocks.into_iter().map(|spec| self.add_block(spec)).collect()
    }

    /// Scan rail adjacency, seat blocks on their stops and run the first
    /// propagation pass.
    pub fn build(self) -> Result<World, WorldError> {
        let WorldBuilder {
            config,
            grid,
            mut rails,
            mut power,
            mut blocks,
        } = self;

        rails.populate_all()?;

        for (id, block) in blocks.iter_mut() {
            let position = grid.block_position(id).ok_or(WorldError::Unplaced(id))?;
            block.home_rail_stop = grid.rail_stop_at(position);
            match block.home_rail_stop {
                Some(stop) => rails.occupy(stop, id)?,
                None if block.interactable => {
                    tracing::warn!(block = %block.name, %position, "interactable block has no rail stop");
                }
                None => {}
            }
        }

        let pass = power.propagate_all(&grid, &BTreeSet::new());
        tracing::info!(
            blocks = blocks.len(),
            rail_stops = rails.stop_count(),
            rails = rails.segment_count(),
            powered = power.powered_blocks().len(),
            "world built"
        );

        let mut world = World {
            events: EventBus::new(config.event_capacity),
            config,
            grid,
            rails,
            power,
            blocks,
            scheduler: TransitionScheduler::new(),
            tick: 0,
            selected: None,
        };
        world.emit_power(pass.events);
        Ok(world)
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

fn duplicate(coord: Coordinate, layer: Layer) -> WorldError {
    let err = SpatialError::DuplicateOccupant { coord, layer };
    tracing::error!(%err, "world build failed");
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltrail_core::coord::Direction;
    use voltrail_core::test_utils::*;

    #[test]
    fn duplicate_block_is_fatal() {
        let mut builder = WorldBuilder::default();
        builder.add_block(BlockSpec::new("a", cell(0, 0, 0))).unwrap();
        let err = builder.add_block(BlockSpec::new("b", cell(0, 0, 0))).unwrap_err();
        assert_eq!(
            err,
            WorldError::Spatial(SpatialError::DuplicateOccupant {
                coord: cell(0, 0, 0),
                layer: Layer::Block,
            })
        );
    }

    #[test]
    fn duplicate_rail_stop_is_fatal() {
        let mut builder = WorldBuilder::default();
        builder.add_rail_stop(cell(1, 0, 0)).unwrap();
        assert!(builder.add_rail_stop(cell(1, 0, 0)).is_err());
    }

    #[test]
    fn block_and_stop_may_share_a_cell() {
        let mut builder = WorldBuilder::default();
        let stop = builder.add_rail_stop(cell(0, 0, 0)).unwrap();
        let block = builder.add_block(BlockSpec::new("a", cell(0, 0, 0))).unwrap();
        let world = builder.build().unwrap();

        assert_eq!(world.block(block).unwrap().home_rail_stop(), Some(stop));
        assert_eq!(world.rails().occupant(stop), Some(block));
    }

    #[test]
    fn registration_order_is_irrelevant() {
        let build = |stops_first: bool| {
            let mut builder = WorldBuilder::default();
            let block = || {
                BlockSpec::new("a", cell(0, 0, 0))
                    .connectors([Direction::East])
                    .power_source(true)
            };
            if stops_first {
                builder.add_rail_stop(cell(0, 0, 0)).unwrap();
                builder.add_rail(cell(0, 0, 0).offset(Direction::East, 1)).unwrap();
                builder.add_block(block()).unwrap();
            } else {
                builder.add_block(block()).unwrap();
                builder.add_rail(cell(0, 0, 0).offset(Direction::East, 1)).unwrap();
                builder.add_rail_stop(cell(0, 0, 0)).unwrap();
            }
            let world = builder.build().unwrap();
            let id = world.block_at(cell(0, 0, 0)).unwrap();
            (world.movement_options(id), world.is_powered(id))
        };
        assert_eq!(build(true), build(false));
        assert_eq!(build(true), (vec![Direction::East], true));
    }

    #[test]
    fn initial_pass_powers_sources() {
        let mut builder = WorldBuilder::default();
        let ids = builder
            .register_all(
                [
                    BlockSpec::new("src", cell(0, 0, 0))
                        .connectors([Direction::East])
                        .start_powered(),
                    BlockSpec::new("wire", cell(1, 0, 0)).interactable(false),
                ],
                [],
            )
            .unwrap();
        let world = builder.build().unwrap();
        assert!(world.is_powered(ids[0]));
        assert!(world.is_powered(ids[1]));
    }
}
