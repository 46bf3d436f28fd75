use voltrail_core::id::BlockId;
use voltrail_power::PowerError;
use voltrail_rail::RailError;
use voltrail_spatial::SpatialError;

use crate::block::MotionState;

/// Why a move has nowhere to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UnreachableReason {
    #[error("block has no rail stop")]
    NoHomeStop,
    #[error("no rail leaves the stop in that direction")]
    NoRail,
    #[error("no free stop along the rail")]
    NoFreeStop,
    #[error("direction is not a single axis")]
    NotAxisAligned,
}

/// A command the world declined. Nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("block is {state:?} and cannot start another transition")]
    IllegalTransition { block: BlockId, state: MotionState },
    #[error("move is unreachable: {reason}")]
    Unreachable {
        block: BlockId,
        reason: UnreachableReason,
    },
    #[error("unknown block")]
    UnknownBlock(BlockId),
    #[error("block is not interactable")]
    NotInteractable(BlockId),
    #[error("block has no power source")]
    NotASource(BlockId),
}

/// Broken world invariants. These are bugs or bad level data, not player
/// input, and are not recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),
    #[error(transparent)]
    Rail(#[from] RailError),
    #[error(transparent)]
    Power(#[from] PowerError),
    #[error("block has no grid placement")]
    Unplaced(BlockId),
}
