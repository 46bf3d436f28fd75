//! World events and the ring-buffered bus that delivers them.
//!
//! Commands and completed transitions emit events as they happen. Events sit
//! in one fixed-capacity [`EventBuffer`] per kind until the end of the next
//! [`World::step`](crate::World::step), when every passive listener for that
//! kind sees them oldest-first and the buffers are cleared.
//!
//! A suppressed kind is never buffered and costs nothing to emit.

use voltrail_core::fixed::Ticks;
use voltrail_core::id::BlockId;

use crate::error::UnreachableReason;
use crate::transition::TransitionKind;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something that happened in the world. Every event carries its tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    // -- Power --
    BlockEnergized {
        block: BlockId,
        tick: Ticks,
    },
    BlockDeenergized {
        block: BlockId,
        tick: Ticks,
    },
    SourceToggled {
        block: BlockId,
        on: bool,
        tick: Ticks,
    },

    // -- Transitions --
    TransitionStarted {
        block: BlockId,
        kind: TransitionKind,
        duration: Ticks,
        tick: Ticks,
    },
    TransitionCompleted {
        block: BlockId,
        kind: TransitionKind,
        tick: Ticks,
    },
    MoveBlocked {
        block: BlockId,
        reason: UnreachableReason,
        tick: Ticks,
    },

    // -- Selection --
    BlockSelected {
        block: BlockId,
        tick: Ticks,
    },
    BlockDeselected {
        block: BlockId,
        tick: Ticks,
    },
}

/// Discriminant of [`WorldEvent`], used for suppression and subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldEventKind {
    BlockEnergized,
    BlockDeenergized,
    SourceToggled,
    TransitionStarted,
    TransitionCompleted,
    MoveBlocked,
    BlockSelected,
    BlockDeselected,
}

const EVENT_KIND_COUNT: usize = 8;

impl WorldEvent {
    pub fn kind(&self) -> WorldEventKind {
        match self {
            WorldEvent::BlockEnergized { .. } => WorldEventKind::BlockEnergized,
            WorldEvent::BlockDeenergized { .. } => WorldEventKind::BlockDeenergized,
            WorldEvent::SourceToggled { .. } => WorldEventKind::SourceToggled,
            WorldEvent::TransitionStarted { .. } => WorldEventKind::TransitionStarted,
            WorldEvent::TransitionCompleted { .. } => WorldEventKind::TransitionCompleted,
            WorldEvent::MoveBlocked { .. } => WorldEventKind::MoveBlocked,
            WorldEvent::BlockSelected { .. } => WorldEventKind::BlockSelected,
            WorldEvent::BlockDeselected { .. } => WorldEventKind::BlockDeselected,
        }
    }

    pub fn block(&self) -> BlockId {
        match self {
            WorldEvent::BlockEnergized { block, .. }
            | WorldEvent::BlockDeenergized { block, .. }
            | WorldEvent::SourceToggled { block, .. }
            | WorldEvent::TransitionStarted { block, .. }
            | WorldEvent::TransitionCompleted { block, .. }
            | WorldEvent::MoveBlocked { block, .. }
            | WorldEvent::BlockSelected { block, .. }
            | WorldEvent::BlockDeselected { block, .. } => *block,
        }
    }
}

impl WorldEventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity ring buffer. When full, the oldest event is overwritten.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<WorldEvent>>,
    /// Next write position.
    head: usize,
    len: usize,
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: WorldEvent) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Events written since creation, including overwritten ones.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &WorldEvent> {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |offset| self.events[(start + offset) % capacity].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A read-only subscriber.
pub type PassiveListener = Box<dyn FnMut(&WorldEvent)>;

/// One lazily allocated ring buffer per event kind, plus listeners.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Stop recording a kind and drop anything already buffered for it.
    pub fn suppress(&mut self, kind: WorldEventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: WorldEventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn emit(&mut self, event: WorldEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Listeners run in registration order.
    pub fn on_passive(&mut self, kind: WorldEventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Hand every buffered event to its listeners, then clear the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            for listener in &mut self.listeners[idx] {
                for event in buffer.iter() {
                    listener(event);
                }
            }
            buffer.clear();
        }
    }

    pub fn buffer(&self, kind: WorldEventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: WorldEventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    pub fn total_emitted(&self, kind: WorldEventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use voltrail_core::test_utils::make_block_id;

    fn selected(tick: Ticks) -> WorldEvent {
        WorldEvent::BlockSelected {
            block: make_block_id(),
            tick,
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: Ring buffer keeps the newest events
    // -----------------------------------------------------------------------
    #[test]
    fn buffer_overwrites_oldest() {
        let mut buf = EventBuffer::new(2);
        buf.push(selected(1));
        buf.push(selected(2));
        buf.push(selected(3));

        let ticks: Vec<Ticks> = buf
            .iter()
            .map(|e| match e {
                WorldEvent::BlockSelected { tick, .. } => *tick,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ticks, vec![2, 3]);
        assert_eq!(buf.total_written(), 3);
        assert_eq!(buf.dropped_count(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 2: Delivery
    // -----------------------------------------------------------------------
    #[test]
    fn deliver_reaches_listeners_and_clears() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on_passive(
            WorldEventKind::BlockSelected,
            Box::new(move |e| sink.borrow_mut().push(e.clone())),
        );

        bus.emit(selected(1));
        bus.emit(selected(2));
        assert_eq!(bus.buffered_count(WorldEventKind::BlockSelected), 2);

        bus.deliver();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(bus.buffered_count(WorldEventKind::BlockSelected), 0);
        assert_eq!(bus.total_emitted(WorldEventKind::BlockSelected), 2);
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        bus.on_passive(
            WorldEventKind::BlockDeselected,
            Box::new(move |_| *c.borrow_mut() += 1),
        );

        bus.emit(selected(1));
        bus.deliver();
        assert_eq!(*count.borrow(), 0);
    }

    // -----------------------------------------------------------------------
    // Test 3: Suppression
    // -----------------------------------------------------------------------
    #[test]
    fn suppressed_kind_is_not_buffered() {
        let mut bus = EventBus::default();
        bus.suppress(WorldEventKind::BlockSelected);
        bus.emit(selected(1));

        assert!(bus.is_suppressed(WorldEventKind::BlockSelected));
        assert!(bus.buffer(WorldEventKind::BlockSelected).is_none());
    }
}
