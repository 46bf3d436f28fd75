//! Directional connectors attached to a block.
//!
//! Connectors are declared in the block's local frame when the block is
//! built and never change afterwards. The world-space direction of each
//! connector follows the block's facing, so a rotation changes which
//! neighbours a block can reach without touching the set itself.

use serde::{Deserialize, Serialize};
use voltrail_core::coord::{Direction, Rotation};

/// One connector line. `lit` mirrors the owning block's power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub local: Direction,
    lit: bool,
}

impl Connector {
    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

/// The connectors of one block, at most one per local direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSet {
    connectors: Vec<Connector>,
}

impl ConnectorSet {
    /// Build a set from local directions. Duplicates are dropped.
    pub fn new(directions: impl IntoIterator<Item = Direction>) -> Self {
        let mut connectors: Vec<Connector> = Vec::new();
        for local in directions {
            if !connectors.iter().any(|c| c.local == local) {
                connectors.push(Connector { local, lit: false });
            }
        }
        Self { connectors }
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.iter()
    }

    /// Connector directions in world space for a block with `facing`.
    pub fn world_directions(&self, facing: Rotation) -> impl Iterator<Item = Direction> + '_ {
        self.connectors.iter().map(move |c| c.local.rotated(facing))
    }

    /// Whether a connector points toward `direction` in world space.
    pub fn has_connecting_line(&self, facing: Rotation, direction: Direction) -> bool {
        self.world_directions(facing).any(|d| d == direction)
    }

    /// Light or darken every connector line.
    pub(crate) fn set_lit(&mut self, lit: bool) {
        for connector in &mut self.connectors {
            connector.lit = lit;
        }
    }
}

/// The optional fixture at the centre of a block where its lines meet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Midpoint {
    lit: bool,
}

impl Midpoint {
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub(crate) fn set_lit(&mut self, lit: bool) {
        self.lit = lit;
    }
}
