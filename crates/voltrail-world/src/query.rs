//! Owned read-only views of world state for presentation and tooling.

use voltrail_core::coord::{Coordinate, Direction, Rotation};
use voltrail_core::fixed::Fixed64;
use voltrail_core::id::{BlockId, RailStopId};
use voltrail_power::Epoch;

use crate::block::MotionState;

/// Everything known about one block, copied out of the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub id: BlockId,
    pub name: String,
    /// Grid position. Does not change until a move completes.
    pub position: Coordinate,
    pub facing: Rotation,
    /// Connector directions in world space.
    pub connectors: Vec<Direction>,
    pub powered: bool,
    /// Has a source device or starts powered.
    pub has_own_source: bool,
    pub motion: MotionState,
    /// 0..1 through the current transition, 0 when idle.
    pub progress: Fixed64,
    pub last_evaluation: Epoch,
    pub home_rail_stop: Option<RailStopId>,
    pub interactable: bool,
    pub selected: bool,
}

/// Summary of one [`World::step`](crate::World::step).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub tick: voltrail_core::fixed::Ticks,
    /// Blocks whose transition completed this step, in completion order.
    pub completed: Vec<BlockId>,
    /// Full propagation passes run this step.
    pub passes: u32,
}

/// Summary of one [`World::advance`](crate::World::advance).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub steps_run: u64,
    pub completed: Vec<BlockId>,
}
