//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::coord::{Coordinate, DEFAULT_CELL_SIZE};
use crate::fixed::Fixed64;
use crate::id::{BlockId, RailStopId};
use slotmap::SlotMap;

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Coordinate of grid cell `(x, y, z)` at the default cell size.
pub fn cell(x: i32, y: i32, z: i32) -> Coordinate {
    Coordinate::new(
        x * DEFAULT_CELL_SIZE,
        y * DEFAULT_CELL_SIZE,
        z * DEFAULT_CELL_SIZE,
    )
}

pub fn make_block_ids(count: usize) -> Vec<BlockId> {
    let mut sm = SlotMap::<BlockId, ()>::with_key();
    (0..count).map(|_| sm.insert(())).collect()
}

pub fn make_block_id() -> BlockId {
    make_block_ids(1)[0]
}

pub fn make_stop_ids(count: usize) -> Vec<RailStopId> {
    let mut sm = SlotMap::<RailStopId, ()>::with_key();
    (0..count).map(|_| sm.insert(())).collect()
}
