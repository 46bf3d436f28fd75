//! Block records and the input used to build them.

use serde::{Deserialize, Serialize};
use voltrail_core::coord::{Coordinate, Direction, Rotation};
use voltrail_core::id::RailStopId;
use voltrail_power::PowerableSink;

/// Where a block is in its transition state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Idle,
    Rotating,
    Moving,
}

/// Which way a rotate command turns a block, seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDirection {
    Left,
    Right,
}

impl RotationDirection {
    pub fn apply(self, facing: Rotation) -> Rotation {
        match self {
            RotationDirection::Right => facing.rotate_cw(),
            RotationDirection::Left => facing.rotate_ccw(),
        }
    }

    /// Signed yaw change in degrees.
    pub fn degrees(self) -> i32 {
        match self {
            RotationDirection::Right => 90,
            RotationDirection::Left => -90,
        }
    }
}

/// World-side state of a block. Position and facing live in the grid, power
/// state in the power graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub(crate) name: String,
    pub(crate) interactable: bool,
    pub(crate) motion: MotionState,
    pub(crate) home_rail_stop: Option<RailStopId>,
    pub(crate) selected: bool,
}

impl Block {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_interactable(&self) -> bool {
        self.interactable
    }

    pub fn motion(&self) -> MotionState {
        self.motion
    }

    pub fn is_idle(&self) -> bool {
        self.motion == MotionState::Idle
    }

    pub fn home_rail_stop(&self) -> Option<RailStopId> {
        self.home_rail_stop
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Everything needed to place one block in a new world.
#[derive(Debug)]
pub struct BlockSpec {
    pub name: String,
    pub position: Coordinate,
    pub facing: Rotation,
    /// Connector directions in the block's local frame.
    pub connectors: Vec<Direction>,
    pub midpoint: bool,
    pub interactable: bool,
    pub start_powered: bool,
    /// A switchable source device; the value is its initial state.
    pub power_source: Option<bool>,
    pub sinks: Vec<Box<dyn PowerableSink>>,
}

impl BlockSpec {
    pub fn new(name: impl Into<String>, position: Coordinate) -> Self {
        Self {
            name: name.into(),
            position,
            facing: Rotation::None,
            connectors: Vec::new(),
            midpoint: false,
            interactable: true,
            start_powered: false,
            power_source: None,
            sinks: Vec::new(),
        }
    }

    pub fn facing(mut self, facing: Rotation) -> Self {
        self.facing = facing;
        self
    }

    pub fn connectors(mut self, connectors: impl IntoIterator<Item = Direction>) -> Self {
        self.connectors = connectors.into_iter().collect();
        self
    }

    pub fn midpoint(mut self) -> Self {
        self.midpoint = true;
        self
    }

    pub fn interactable(mut self, interactable: bool) -> Self {
        self.interactable = interactable;
        self
    }

    pub fn start_powered(mut self) -> Self {
        self.start_powered = true;
        self
    }

    pub fn power_source(mut self, starts_powered: bool) -> Self {
        self.power_source = Some(starts_powered);
        self
    }

    pub fn sink(mut self, sink: impl PowerableSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}
