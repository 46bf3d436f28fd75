//! Timed block transitions and the scheduler that completes them.
//!
//! A transition is recorded when a rotate or move command is accepted and
//! completes once the world's tick reaches `started + duration`. Nothing about
//! the block's position or facing changes until then.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use voltrail_core::coord::{Coordinate, Rotation};
use voltrail_core::fixed::{self, Fixed64, Ticks};
use voltrail_core::id::{BlockId, RailStopId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Rotate,
    Move,
}

/// What a transition changes when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
    Rotate {
        from: Rotation,
        to: Rotation,
        /// Signed yaw change, in degrees.
        yaw_delta: i32,
    },
    Move {
        from: Coordinate,
        to: Coordinate,
        destination: RailStopId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub block: BlockId,
    pub started: Ticks,
    pub duration: Ticks,
    pub target: TransitionTarget,
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match self.target {
            TransitionTarget::Rotate { .. } => TransitionKind::Rotate,
            TransitionTarget::Move { .. } => TransitionKind::Move,
        }
    }

    pub fn due(&self) -> Ticks {
        self.started.saturating_add(self.duration)
    }

    /// Fraction complete at `now`, in `[0, 1]`.
    pub fn progress(&self, now: Ticks) -> Fixed64 {
        fixed::progress(now.saturating_sub(self.started), self.duration)
    }

    /// Interpolated position at `now`, in world units. `None` for rotations.
    pub fn position_at(&self, now: Ticks) -> Option<[Fixed64; 3]> {
        let TransitionTarget::Move { from, to, .. } = self.target else {
            return None;
        };
        let t = self.progress(now);
        Some([
            fixed::lerp(from.x, to.x, t),
            fixed::lerp(from.y, to.y, t),
            fixed::lerp(from.z, to.z, t),
        ])
    }

    /// Interpolated yaw at `now`, in degrees. `None` for moves.
    ///
    /// Mid-turn values may fall outside `[0, 360)`.
    pub fn yaw_at(&self, now: Ticks) -> Option<Fixed64> {
        let TransitionTarget::Rotate { from, yaw_delta, .. } = self.target else {
            return None;
        };
        let start = from.degrees();
        Some(fixed::lerp(start, start + yaw_delta, self.progress(now)))
    }
}

/// In-flight transitions keyed by block and kind.
#[derive(Debug, Default)]
pub struct TransitionScheduler {
    active: BTreeMap<(BlockId, TransitionKind), Transition>,
}

impl TransitionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the transition it replaced, which callers treat as a bug.
    pub fn schedule(&mut self, transition: Transition) -> Option<Transition> {
        self.active
            .insert((transition.block, transition.kind()), transition)
    }

    /// The block's in-flight transition, if any.
    pub fn get(&self, block: BlockId) -> Option<&Transition> {
        self.active
            .range((block, TransitionKind::Rotate)..=(block, TransitionKind::Move))
            .map(|(_, t)| t)
            .next()
    }

    /// Remove and return every transition due at `now`, ordered by due tick
    /// and then by block.
    pub fn take_due(&mut self, now: Ticks) -> Vec<Transition> {
        let keys: Vec<(BlockId, TransitionKind)> = self
            .active
            .iter()
            .filter(|(_, t)| t.due() <= now)
            .map(|(k, _)| *k)
            .collect();
        let mut due: Vec<Transition> = keys
            .iter()
            .filter_map(|k| self.active.remove(k))
            .collect();
        due.sort_by_key(|t| (t.due(), t.block));
        due
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
