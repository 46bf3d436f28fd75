//! The consumer contract for powered devices.
//!
//! Doors, lasers, receivers and anything else that reacts to power implement
//! [`PowerableSink`]. The engine calls [`PowerableSink::set_powered`] from a
//! block's power cascade and never looks inside the device.

use std::cell::Cell;
use std::rc::Rc;

/// A device that reacts to its block being energized or de-energized.
///
/// Implementations must tolerate repeated calls with the same value, and
/// must not call back into the power engine from inside `set_powered`.
pub trait PowerableSink: std::fmt::Debug {
    fn set_powered(&mut self, powered: bool);
}

/// A sink that records its latest state behind a shared handle.
///
/// Cloning a latch yields another handle onto the same state, so a host can
/// attach one clone to a block and keep the other to read from.
#[derive(Debug, Clone, Default)]
pub struct PowerLatch {
    powered: Rc<Cell<bool>>,
    calls: Rc<Cell<u32>>,
}

impl PowerLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_powered(&self) -> bool {
        self.powered.get()
    }

    /// Number of `set_powered` calls received so far.
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl PowerableSink for PowerLatch {
    fn set_powered(&mut self, powered: bool) {
        self.powered.set(powered);
        self.calls.set(self.calls.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let latch = PowerLatch::new();
        let mut attached: Box<dyn PowerableSink> = Box::new(latch.clone());

        attached.set_powered(true);
        assert!(latch.is_powered());
        attached.set_powered(false);
        assert!(!latch.is_powered());
        assert_eq!(latch.calls(), 2);
    }
}
