//! The world context: command surface, tick loop and queries.

use std::collections::BTreeSet;

use slotmap::SlotMap;
use voltrail_core::coord::{Coordinate, Direction};
use voltrail_core::fixed::{Fixed64, Ticks};
use voltrail_core::id::BlockId;
use voltrail_power::{PowerEvent, PowerGraph, PowerableSink};
use voltrail_rail::RailNetwork;
use voltrail_spatial::SpatialGrid;

use crate::block::{Block, MotionState, RotationDirection};
use crate::config::WorldConfig;
use crate::error::{CommandError, UnreachableReason, WorldError};
use crate::event::{EventBus, WorldEvent};
use crate::query::{AdvanceReport, BlockSnapshot, StepReport};
use crate::transition::{Transition, TransitionScheduler, TransitionTarget};

/// A running puzzle world.
///
/// Built with [`WorldBuilder`](crate::WorldBuilder). Commands validate and
/// start transitions; [`step`](Self::step) advances time and completes them.
#[derive(Debug)]
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) grid: SpatialGrid,
    pub(crate) rails: RailNetwork,
    pub(crate) power: PowerGraph,
    pub(crate) blocks: SlotMap<BlockId, Block>,
    pub(crate) scheduler: TransitionScheduler,
    pub(crate) events: EventBus,
    pub(crate) tick: Ticks,
    /// At most one block is selected at a time.
    pub(crate) selected: Option<BlockId>,
}

impl World {
    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Start a quarter turn.
    ///
    /// The rest of the world is re-powered as if the block were gone and the
    /// block itself goes dark until the turn completes.
    pub fn rotate(
        &mut self,
        block: BlockId,
        direction: RotationDirection,
    ) -> Result<(), CommandError> {
        let record = self.interactable(block)?;
        if !record.is_idle() {
            return Err(self.reject_busy(block, record.motion));
        }
        let from = self.grid.facing(block).ok_or(CommandError::UnknownBlock(block))?;
        let to = direction.apply(from);

        self.teardown(block);
        self.start(Transition {
            block,
            started: self.tick,
            duration: self.config.rotation_ticks,
            target: TransitionTarget::Rotate {
                from,
                to,
                yaw_delta: direction.degrees(),
            },
        });
        Ok(())
    }

    /// Start sliding a block along its rail to the next stop in `direction`.
    pub fn move_block(
        &mut self,
        block: BlockId,
        direction: Direction,
    ) -> Result<(), CommandError> {
        let record = self.interactable(block)?;
        let motion = record.motion;
        let Some(home) = record.home_rail_stop else {
            return Err(self.reject_unreachable(block, UnreachableReason::NoHomeStop));
        };
        if !self.rails.is_legal_move(home, direction) {
            return Err(self.reject_unreachable(block, UnreachableReason::NoRail));
        }
        let Some(destination) = self.rails.next_stop(&self.grid, home, direction) else {
            return Err(self.reject_unreachable(block, UnreachableReason::NoFreeStop));
        };
        if motion != MotionState::Idle {
            return Err(self.reject_busy(block, motion));
        }

        let (Some(from), Some(to)) = (
            self.grid.block_position(block),
            self.grid.rail_stop_position(destination),
        ) else {
            return Err(CommandError::UnknownBlock(block));
        };
        if self.rails.reserve(destination, block).is_err() {
            return Err(self.reject_unreachable(block, UnreachableReason::NoFreeStop));
        }

        self.deselect_quietly(block);
        let vacated = self.rails.vacate(home);
        debug_assert!(matches!(vacated, Ok(Some(b)) if b == block));
        self.teardown(block);

        let cells =
            u64::from(from.manhattan_distance(&to) / self.grid.cell_size().unsigned_abs());
        self.start(Transition {
            block,
            started: self.tick,
            duration: cells.max(1) * self.config.ticks_per_cell,
            target: TransitionTarget::Move {
                from,
                to,
                destination,
            },
        });
        Ok(())
    }

    /// [`move_block`](Self::move_block) from a raw input vector. Anything but
    /// a single-axis vector is unreachable.
    pub fn move_toward(
        &mut self,
        block: BlockId,
        delta: (i32, i32, i32),
    ) -> Result<(), CommandError> {
        match Direction::from_delta(delta.0, delta.1, delta.2) {
            Some(direction) => self.move_block(block, direction),
            None => {
                self.interactable(block)?;
                Err(self.reject_unreachable(block, UnreachableReason::NotAxisAligned))
            }
        }
    }

    /// Select a block, deselecting whichever block held the selection.
    /// Already-selected blocks are left alone.
    pub fn mark_selected(&mut self, block: BlockId) -> Result<(), CommandError> {
        let record = self.interactable(block)?;
        if record.motion == MotionState::Moving {
            return Err(self.reject_busy(block, MotionState::Moving));
        }
        if record.selected {
            return Ok(());
        }
        if let Some(previous) = self.selected {
            self.deselect_quietly(previous);
        }
        if let Some(record) = self.blocks.get_mut(block) {
            record.selected = true;
        }
        self.selected = Some(block);
        self.events.emit(WorldEvent::BlockSelected {
            block,
            tick: self.tick,
        });
        Ok(())
    }

    pub fn deselect(&mut self, block: BlockId) -> Result<(), CommandError> {
        if !self.blocks.contains_key(block) {
            return Err(CommandError::UnknownBlock(block));
        }
        self.deselect_quietly(block);
        Ok(())
    }

    /// Switch a block's source device, run its cascade, then re-power the
    /// world.
    pub fn toggle_source(&mut self, block: BlockId, on: bool) -> Result<(), CommandError> {
        let events = self.power.toggle_source(block, on).map_err(|err| match err {
            voltrail_power::PowerError::NotASource(id) => CommandError::NotASource(id),
            _ => CommandError::UnknownBlock(block),
        })?;
        self.events.emit(WorldEvent::SourceToggled {
            block,
            on,
            tick: self.tick,
        });
        self.emit_power(events);
        let in_flight = self.in_flight();
        let pass = self.power.propagate_all(&self.grid, &in_flight);
        self.emit_power(pass.events);
        tracing::debug!(?block, on, "source toggled");
        Ok(())
    }

    /// Attach a powered device to a block. It is told the current state
    /// straight away.
    pub fn attach_sink(
        &mut self,
        block: BlockId,
        sink: Box<dyn PowerableSink>,
    ) -> Result<(), CommandError> {
        self.power
            .attach_sink(block, sink)
            .map_err(|_| CommandError::UnknownBlock(block))
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Advance one tick: complete due transitions, then deliver events.
    ///
    /// Each completion applies its grid change and runs exactly one full
    /// propagation pass. If a completion fails, the transitions after it stay
    /// scheduled.
    pub fn step(&mut self) -> Result<StepReport, WorldError> {
        self.tick += 1;
        let mut report = StepReport {
            tick: self.tick,
            ..StepReport::default()
        };
        let mut due = self.scheduler.take_due(self.tick).into_iter();
        while let Some(transition) = due.next() {
            if let Err(err) = self.complete(&transition) {
                tracing::error!(block = ?transition.block, %err, "transition could not complete");
                for rest in due {
                    self.scheduler.schedule(rest);
                }
                return Err(err);
            }
            report.passes += 1;
            report.completed.push(transition.block);
        }
        self.events.deliver();
        Ok(report)
    }

    /// Run `dt` steps.
    pub fn advance(&mut self, dt: Ticks) -> Result<AdvanceReport, WorldError> {
        let mut result = AdvanceReport::default();
        for _ in 0..dt {
            let step = self.step()?;
            result.steps_run += 1;
            result.completed.extend(step.completed);
        }
        Ok(result)
    }

    /// Step until nothing is in flight, or `max_steps` have run.
    pub fn settle(&mut self, max_steps: u64) -> Result<AdvanceReport, WorldError> {
        let mut result = AdvanceReport::default();
        while !self.scheduler.is_empty() && result.steps_run < max_steps {
            let step = self.step()?;
            result.steps_run += 1;
            result.completed.extend(step.completed);
        }
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn rails(&self) -> &RailNetwork {
        &self.rails
    }

    pub fn power(&self) -> &PowerGraph {
        &self.power
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn block(&self, block: BlockId) -> Option<&Block> {
        self.blocks.get(block)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter()
    }

    pub fn block_at(&self, coord: Coordinate) -> Option<BlockId> {
        self.grid.block_at(coord)
    }

    pub fn block_by_name(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, b)| b.name == name)
            .map(|(id, _)| id)
    }

    pub fn selected(&self) -> Option<BlockId> {
        self.selected
    }

    pub fn is_powered(&self, block: BlockId) -> bool {
        self.power.is_powered(block)
    }

    pub fn powered_blocks(&self) -> BTreeSet<BlockId> {
        self.power.powered_blocks()
    }

    /// Directions in which track leaves the block's stop.
    pub fn movement_options(&self, block: BlockId) -> Vec<Direction> {
        self.blocks
            .get(block)
            .and_then(|b| b.home_rail_stop)
            .map(|stop| self.rails.connected_directions(stop))
            .unwrap_or_default()
    }

    /// Whether the block is a live source or wired to one, without touching
    /// any power state.
    pub fn is_connected_to_source(&mut self, block: BlockId) -> bool {
        self.power.propagate_backward(&self.grid, block)
    }

    pub fn transition(&self, block: BlockId) -> Option<&Transition> {
        self.scheduler.get(block)
    }

    /// 0..1 through the block's current transition.
    pub fn transition_progress(&self, block: BlockId) -> Option<Fixed64> {
        self.scheduler.get(block).map(|t| t.progress(self.tick))
    }

    /// Where the block should be drawn, in world units.
    pub fn interpolated_position(&self, block: BlockId) -> Option<[Fixed64; 3]> {
        if let Some(position) = self.scheduler.get(block).and_then(|t| t.position_at(self.tick)) {
            return Some(position);
        }
        let at = self.grid.block_position(block)?;
        Some([
            Fixed64::from_num(at.x),
            Fixed64::from_num(at.y),
            Fixed64::from_num(at.z),
        ])
    }

    /// The block's yaw in degrees, as it should be drawn.
    pub fn interpolated_yaw(&self, block: BlockId) -> Option<Fixed64> {
        if let Some(yaw) = self.scheduler.get(block).and_then(|t| t.yaw_at(self.tick)) {
            return Some(yaw);
        }
        self.grid
            .facing(block)
            .map(|f| Fixed64::from_num(f.degrees()))
    }

    pub fn block_snapshot(&self, block: BlockId) -> Option<BlockSnapshot> {
        let record = self.blocks.get(block)?;
        let node = self.power.node(block)?;
        let position = self.grid.block_position(block)?;
        let facing = self.grid.facing(block)?;
        Some(BlockSnapshot {
            id: block,
            name: record.name.clone(),
            position,
            facing,
            connectors: node.connectors().world_directions(facing).collect(),
            powered: node.is_powered(),
            has_own_source: node.has_own_source() || node.is_start_powered(),
            motion: record.motion,
            progress: self.transition_progress(block).unwrap_or(Fixed64::ZERO),
            last_evaluation: node.last_evaluation(),
            home_rail_stop: record.home_rail_stop,
            interactable: record.interactable,
            selected: record.selected,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn interactable(&self, block: BlockId) -> Result<&Block, CommandError> {
        let record = self
            .blocks
            .get(block)
            .ok_or(CommandError::UnknownBlock(block))?;
        if !record.interactable {
            return Err(CommandError::NotInteractable(block));
        }
        Ok(record)
    }

    fn reject_busy(&self, block: BlockId, state: MotionState) -> CommandError {
        tracing::debug!(?block, ?state, "command rejected: block is busy");
        CommandError::IllegalTransition { block, state }
    }

    fn reject_unreachable(&mut self, block: BlockId, reason: UnreachableReason) -> CommandError {
        tracing::debug!(?block, %reason, "move rejected");
        self.events.emit(WorldEvent::MoveBlocked {
            block,
            reason,
            tick: self.tick,
        });
        CommandError::Unreachable { block, reason }
    }

    fn deselect_quietly(&mut self, block: BlockId) {
        let Some(record) = self.blocks.get_mut(block) else {
            return;
        };
        if self.selected == Some(block) {
            self.selected = None;
        }
        if record.selected {
            record.selected = false;
            self.events.emit(WorldEvent::BlockDeselected {
                block,
                tick: self.tick,
            });
        }
    }

    /// Blocks that are rotating or moving. Power passes treat them as absent.
    fn in_flight(&self) -> BTreeSet<BlockId> {
        self.blocks
            .iter()
            .filter(|(_, b)| !b.is_idle())
            .map(|(id, _)| id)
            .collect()
    }

    /// Re-power the world without `block` and the blocks already in flight,
    /// then darken `block` itself.
    fn teardown(&mut self, block: BlockId) {
        let mut excluding = self.in_flight();
        excluding.insert(block);
        let pass = self.power.propagate_all(&self.grid, &excluding);
        self.emit_power(pass.events);
        let local = self.power.deenergize(block);
        self.emit_power(local);
    }

    fn start(&mut self, transition: Transition) {
        let motion = match transition.target {
            TransitionTarget::Rotate { .. } => MotionState::Rotating,
            TransitionTarget::Move { .. } => MotionState::Moving,
        };
        if let Some(record) = self.blocks.get_mut(transition.block) {
            record.motion = motion;
        }
        if self.scheduler.schedule(transition).is_some() {
            tracing::error!(block = ?transition.block, "replaced an in-flight transition");
        }
        tracing::debug!(
            block = ?transition.block,
            kind = ?transition.kind(),
            duration = transition.duration,
            "transition started"
        );
        self.events.emit(WorldEvent::TransitionStarted {
            block: transition.block,
            kind: transition.kind(),
            duration: transition.duration,
            tick: self.tick,
        });
    }

    fn complete(&mut self, transition: &Transition) -> Result<(), WorldError> {
        let block = transition.block;
        match transition.target {
            TransitionTarget::Rotate { to, .. } => {
                self.grid.set_facing(block, to)?;
            }
            TransitionTarget::Move {
                from,
                to,
                destination,
            } => {
                self.grid.relocate_block(from, to, block)?;
                if let Err(err) = self.rails.occupy(destination, block) {
                    self.grid.relocate_block(to, from, block)?;
                    return Err(err.into());
                }
                if let Some(record) = self.blocks.get_mut(block) {
                    record.home_rail_stop = Some(destination);
                }
            }
        }
        if let Some(record) = self.blocks.get_mut(block) {
            record.motion = MotionState::Idle;
        }

        let in_flight = self.in_flight();
        let pass = self.power.propagate_all(&self.grid, &in_flight);
        self.emit_power(pass.events);
        tracing::debug!(?block, kind = ?transition.kind(), tick = self.tick, "transition completed");
        self.events.emit(WorldEvent::TransitionCompleted {
            block,
            kind: transition.kind(),
            tick: self.tick,
        });
        Ok(())
    }

    pub(crate) fn emit_power(&mut self, events: Vec<PowerEvent>) {
        let tick = self.tick;
        for event in events {
            self.events.emit(match event {
                PowerEvent::Energized { block, .. } => WorldEvent::BlockEnergized { block, tick },
                PowerEvent::Deenergized { block, .. } => WorldEvent::BlockDeenergized { block, tick },
            });
        }
    }
}
