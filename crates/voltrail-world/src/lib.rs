//! The Voltrail world: blocks on a grid, rails they slide along, and the
//! power that flows between them.
//!
//! # Lifecycle
//!
//! 1. Register rails, rail stops and blocks on a [`WorldBuilder`], in any
//!    order, and call [`WorldBuilder::build`].
//! 2. Issue commands ([`World::rotate`], [`World::move_block`],
//!    [`World::mark_selected`], ...). A command either starts a timed
//!    transition or returns a [`CommandError`] and changes nothing.
//! 3. Call [`World::step`] (or [`World::advance`]) to move time forward.
//!    Completed transitions update the grid and re-power the world; events
//!    are delivered at the end of every step.
//!
//! A block is in exactly one of the [`MotionState`]s at a time. While it is
//! rotating or moving, further rotate and move commands are rejected.

pub mod block;
pub mod builder;
pub mod config;
pub mod error;
pub mod event;
pub mod query;
pub mod transition;
pub mod world;

pub use block::{Block, BlockSpec, MotionState, RotationDirection};
pub use builder::WorldBuilder;
pub use config::WorldConfig;
pub use error::{CommandError, UnreachableReason, WorldError};
pub use event::{EventBus, WorldEvent, WorldEventKind};
pub use query::{AdvanceReport, BlockSnapshot, StepReport};
pub use transition::{Transition, TransitionKind, TransitionTarget};
pub use world::World;
