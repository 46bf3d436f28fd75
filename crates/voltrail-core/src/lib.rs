//! Voltrail Core -- shared vocabulary for the block/rail puzzle engine.
//!
//! Every other Voltrail crate builds on the types defined here:
//!
//! - [`id`] -- slotmap keys for blocks, rail stops and rail segments.
//! - [`coord`] -- the exact-hash [`coord::Coordinate`] key, the six
//!   axis-aligned [`coord::Direction`]s and the four vertical-axis
//!   [`coord::Rotation`]s a block can face.
//! - [`fixed`] -- Q32.32 fixed-point math and the [`fixed::Ticks`] time unit
//!   used for transition timing and interpolation.
//!
//! The crate has no behaviour of its own; grids, rails, power and the world
//! state machine live in their own crates.

pub mod coord;
pub mod fixed;
pub mod id;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
