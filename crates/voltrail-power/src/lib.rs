//! Power propagation for Voltrail.
//!
//! Computes which blocks are energized given the power sources in the world
//! and the directional connectors on every block. A block with a connector
//! pointing at an occupied neighbouring cell forms an edge to that neighbour;
//! power flows along edges from every live source.
//!
//! # Design
//!
//! - Per-block power state lives in the graph, keyed by [`BlockId`]. Positions
//!   and facings are read from the [`SpatialGrid`] on every pass, so the graph
//!   never needs to be told that a block moved or rotated.
//! - Every pass bumps a monotonically increasing [`Epoch`]. A block whose
//!   stamp already equals the current epoch is not visited again, which makes
//!   traversal safe on cyclic wiring.
//! - A full pass computes the new energized set first and commits it second,
//!   so sinks and events only see net transitions.

pub mod connector;
pub mod sink;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use voltrail_core::coord::Direction;
use voltrail_core::id::BlockId;
use voltrail_spatial::SpatialGrid;

pub use connector::{Connector, ConnectorSet, Midpoint};
pub use sink::{PowerLatch, PowerableSink};

// ---------------------------------------------------------------------------
// Epoch
// ---------------------------------------------------------------------------

/// Identifies one propagation pass.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

// ---------------------------------------------------------------------------
// Per-block power state
// ---------------------------------------------------------------------------

/// A switchable power device mounted on a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSource {
    starts_powered: bool,
    on: bool,
}

impl PowerSource {
    pub fn new(starts_powered: bool) -> Self {
        Self {
            starts_powered,
            on: starts_powered,
        }
    }

    pub fn starts_powered(&self) -> bool {
        self.starts_powered
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

/// Power state of one block.
#[derive(Debug)]
pub struct PowerNode {
    connectors: ConnectorSet,
    midpoint: Option<Midpoint>,
    source: Option<PowerSource>,
    start_powered: bool,
    powered: bool,
    last_evaluation: Epoch,
    sinks: Vec<Box<dyn PowerableSink>>,
}

impl PowerNode {
    pub fn new(connectors: ConnectorSet) -> Self {
        Self {
            connectors,
            midpoint: None,
            source: None,
            start_powered: false,
            powered: false,
            last_evaluation: Epoch::default(),
            sinks: Vec::new(),
        }
    }

    pub fn with_midpoint(mut self) -> Self {
        self.midpoint = Some(Midpoint::default());
        self
    }

    pub fn with_source(mut self, source: PowerSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Mark the block as permanently live.
    pub fn start_powered(mut self, start_powered: bool) -> Self {
        self.start_powered = start_powered;
        self
    }

    pub fn with_sink(mut self, sink: impl PowerableSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_sinks(mut self, sinks: impl IntoIterator<Item = Box<dyn PowerableSink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    pub fn connectors(&self) -> &ConnectorSet {
        &self.connectors
    }

    pub fn midpoint(&self) -> Option<&Midpoint> {
        self.midpoint.as_ref()
    }

    pub fn source(&self) -> Option<&PowerSource> {
        self.source.as_ref()
    }

    pub fn has_own_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_start_powered(&self) -> bool {
        self.start_powered
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn last_evaluation(&self) -> Epoch {
        self.last_evaluation
    }

    /// Start-powered blocks and blocks whose device is switched on.
    pub fn is_live_source(&self) -> bool {
        self.start_powered || self.source.is_some_and(|s| s.on)
    }

    /// The powered cascade: light or darken the lines and midpoint, then tell
    /// the sinks if the value changed. Returns whether it changed.
    fn apply(
        &mut self,
        block: BlockId,
        powered: bool,
        epoch: Epoch,
        events: &mut Vec<PowerEvent>,
    ) -> bool {
        self.connectors.set_lit(powered);
        if let Some(midpoint) = self.midpoint.as_mut() {
            midpoint.set_lit(powered);
        }
        if self.powered == powered {
            return false;
        }
        self.powered = powered;
        for sink in &mut self.sinks {
            sink.set_powered(powered);
        }
        events.push(if powered {
            PowerEvent::Energized { block, epoch }
        } else {
            PowerEvent::Deenergized { block, epoch }
        });
        true
    }
}

// ---------------------------------------------------------------------------
// Events and errors
// ---------------------------------------------------------------------------

/// Emitted when a block's powered value changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerEvent {
    Energized { block: BlockId, epoch: Epoch },
    Deenergized { block: BlockId, epoch: Epoch },
}

impl PowerEvent {
    pub fn block(&self) -> BlockId {
        match self {
            PowerEvent::Energized { block, .. } | PowerEvent::Deenergized { block, .. } => *block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PowerError {
    #[error("block is not registered with the power graph")]
    UnknownBlock(BlockId),
    #[error("block is already registered with the power graph")]
    DuplicateBlock(BlockId),
    #[error("block has no power source")]
    NotASource(BlockId),
}

/// Outcome of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub epoch: Epoch,
    /// Blocks reached by forward traversal, in visit order.
    pub visited: Vec<BlockId>,
    /// Net power transitions committed by the pass.
    pub events: Vec<PowerEvent>,
}

// ---------------------------------------------------------------------------
// PowerGraph
// ---------------------------------------------------------------------------

/// Owns every block's power state and runs propagation passes over the grid.
#[derive(Debug, Default)]
pub struct PowerGraph {
    nodes: BTreeMap<BlockId, PowerNode>,
    epoch: Epoch,
    passes: u64,
    require_reciprocal: bool,
}

impl PowerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, an edge also needs a connector on the neighbour pointing
    /// back at the block.
    pub fn with_reciprocal_connectors(require: bool) -> Self {
        Self {
            require_reciprocal: require,
            ..Self::default()
        }
    }

    // -- Registration --

    pub fn add_block(&mut self, block: BlockId, node: PowerNode) -> Result<(), PowerError> {
        if self.nodes.contains_key(&block) {
            return Err(PowerError::DuplicateBlock(block));
        }
        self.nodes.insert(block, node);
        Ok(())
    }

    /// Attach a sink to a block. The sink is told the current state at once.
    pub fn attach_sink(
        &mut self,
        block: BlockId,
        mut sink: Box<dyn PowerableSink>,
    ) -> Result<(), PowerError> {
        let node = self
            .nodes
            .get_mut(&block)
            .ok_or(PowerError::UnknownBlock(block))?;
        sink.set_powered(node.powered);
        node.sinks.push(sink);
        Ok(())
    }

    // -- Queries --

    pub fn node(&self, block: BlockId) -> Option<&PowerNode> {
        self.nodes.get(&block)
    }

    pub fn is_powered(&self, block: BlockId) -> bool {
        self.nodes.get(&block).is_some_and(|n| n.powered)
    }

    pub fn powered_blocks(&self) -> BTreeSet<BlockId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.powered)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Number of full passes run so far.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -- Propagation --

    /// Energize everything reachable from `source` without clearing anything
    /// first. Blocks in `excluding` are treated as absent.
    pub fn propagate_forward(
        &mut self,
        grid: &SpatialGrid,
        source: BlockId,
        excluding: &BTreeSet<BlockId>,
    ) -> PassReport {
        let epoch = self.next_epoch();
        let mut report = PassReport {
            epoch,
            ..PassReport::default()
        };
        self.spread(grid, source, excluding, epoch, &mut report.visited);
        for &block in &report.visited {
            if let Some(node) = self.nodes.get_mut(&block) {
                node.apply(block, true, epoch, &mut report.events);
            }
        }
        report
    }

    /// Recompute the whole world from its live sources.
    ///
    /// Every block that is not a live source is de-energized, then power is
    /// spread forward from every live source not in `excluding`. Only the net
    /// change is committed. An excluded block that is not a live source always
    /// ends up de-energized; an excluded live source keeps its value.
    pub fn propagate_all(
        &mut self,
        grid: &SpatialGrid,
        excluding: &BTreeSet<BlockId>,
    ) -> PassReport {
        let roots: Vec<BlockId> = self
            .nodes
            .iter()
            .filter(|(id, n)| n.is_live_source() && !excluding.contains(id))
            .map(|(&id, _)| id)
            .collect();
        self.run_pass(grid, excluding, &roots)
    }

    /// Whether `block` is a live source or is reachable from one.
    ///
    /// Walks edges in reverse and stamps what it visits, but never changes
    /// any power state.
    pub fn propagate_backward(&mut self, grid: &SpatialGrid, block: BlockId) -> bool {
        let epoch = self.next_epoch();
        let mut stack = vec![block];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            if node.last_evaluation == epoch {
                continue;
            }
            node.last_evaluation = epoch;
            if node.is_live_source() {
                return true;
            }
            let Some(position) = grid.block_position(current) else {
                continue;
            };
            let facing = grid.facing(current).unwrap_or_default();
            let own: Vec<Direction> = node.connectors.world_directions(facing).collect();
            for direction in Direction::all() {
                let Some(upstream) = grid.neighbor_block(position, direction, grid.cell_size())
                else {
                    continue;
                };
                if !self.points_back(grid, upstream, direction) {
                    continue;
                }
                if self.require_reciprocal && !own.contains(&direction) {
                    continue;
                }
                stack.push(upstream);
            }
        }
        false
    }

    /// Switch a block's device and run its cascade. No traversal happens.
    pub fn toggle_source(
        &mut self,
        block: BlockId,
        on: bool,
    ) -> Result<Vec<PowerEvent>, PowerError> {
        let epoch = self.epoch;
        let node = self
            .nodes
            .get_mut(&block)
            .ok_or(PowerError::UnknownBlock(block))?;
        let source = node.source.as_mut().ok_or(PowerError::NotASource(block))?;
        source.on = on;
        let mut events = Vec::new();
        node.apply(block, on, epoch, &mut events);
        Ok(events)
    }

    /// Run the de-energize cascade on a single block.
    pub fn deenergize(&mut self, block: BlockId) -> Vec<PowerEvent> {
        let epoch = self.epoch;
        let mut events = Vec::new();
        if let Some(node) = self.nodes.get_mut(&block) {
            node.apply(block, false, epoch, &mut events);
        }
        events
    }

    // -- Internals --

    fn next_epoch(&mut self) -> Epoch {
        self.epoch = self.epoch.next();
        self.epoch
    }

    fn run_pass(
        &mut self,
        grid: &SpatialGrid,
        excluding: &BTreeSet<BlockId>,
        roots: &[BlockId],
    ) -> PassReport {
        let epoch = self.next_epoch();
        let mut report = PassReport {
            epoch,
            ..PassReport::default()
        };
        for &root in roots {
            self.spread(grid, root, excluding, epoch, &mut report.visited);
        }

        let reached: BTreeSet<BlockId> = report.visited.iter().copied().collect();
        for (&block, node) in self.nodes.iter_mut() {
            let powered = if node.is_live_source() {
                !excluding.contains(&block) || node.powered
            } else {
                reached.contains(&block)
            };
            node.apply(block, powered, epoch, &mut report.events);
        }

        self.passes += 1;
        tracing::trace!(
            epoch = epoch.0,
            visited = report.visited.len(),
            changed = report.events.len(),
            "power pass"
        );
        report
    }

    /// Depth-first walk from `start`, stamping and recording each block once.
    fn spread(
        &mut self,
        grid: &SpatialGrid,
        start: BlockId,
        excluding: &BTreeSet<BlockId>,
        epoch: Epoch,
        visited: &mut Vec<BlockId>,
    ) {
        let mut stack = vec![start];
        while let Some(block) = stack.pop() {
            if excluding.contains(&block) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&block) else {
                continue;
            };
            if node.last_evaluation == epoch {
                continue;
            }
            node.last_evaluation = epoch;
            visited.push(block);

            let Some(position) = grid.block_position(block) else {
                continue;
            };
            let facing = grid.facing(block).unwrap_or_default();
            let outgoing: Vec<Direction> = node.connectors.world_directions(facing).collect();
            for direction in outgoing {
                let Some(neighbor) = grid.neighbor_block(position, direction, grid.cell_size())
                else {
                    continue;
                };
                if excluding.contains(&neighbor) {
                    continue;
                }
                if self.require_reciprocal && !self.points_back(grid, neighbor, direction) {
                    continue;
                }
                stack.push(neighbor);
            }
        }
    }

    /// Whether `neighbor`, found one step along `direction`, has a connector
    /// pointing back the way we came.
    fn points_back(&self, grid: &SpatialGrid, neighbor: BlockId, direction: Direction) -> bool {
        let Some(node) = self.nodes.get(&neighbor) else {
            return false;
        };
        let facing = grid.facing(neighbor).unwrap_or_default();
        node.connectors
            .has_connecting_line(facing, direction.opposite())
    }
}
