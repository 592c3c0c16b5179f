use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use crate::types::WindowSnapshot;

/// Single-slot, latest-wins handoff between the producer and consumer contexts.
///
/// A one-element `ArrayQueue`: the slot is either empty (nothing ready) or
/// holds one whole value, so the reader never sees a half-written snapshot.
/// Publishing replaces an unread value instead of waiting.
struct Slot<T> {
    ready: ArrayQueue<T>,
    published: AtomicU64,
    overruns: AtomicU64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            ready: ArrayQueue::new(1),
            published: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
        }
    }
}

/// Producer half. Not `Clone`: there is exactly one writer.
pub struct SlotWriter<T> {
    slot: Arc<Slot<T>>,
}

/// Consumer half. Not `Clone`: there is exactly one reader.
pub struct SlotReader<T> {
    slot: Arc<Slot<T>>,
}

pub fn slot<T: Send>() -> (SlotWriter<T>, SlotReader<T>) {
    let slot = Arc::new(Slot::new());
    (
        SlotWriter { slot: slot.clone() },
        SlotReader { slot },
    )
}

impl<T> SlotWriter<T> {
    /// Makes `value` the ready value. Returns `true` when an unread value was
    /// still pending and has been discarded (an overrun).
    pub fn publish(&mut self, value: T) -> bool {
        let stale = self.slot.ready.force_push(value);
        self.slot.published.fetch_add(1, Ordering::Relaxed);
        if stale.is_none() {
            return false;
        }
        self.slot.overruns.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn overruns(&self) -> u64 {
        self.slot.overruns.load(Ordering::Relaxed)
    }
}

impl<T> SlotReader<T> {
    pub fn is_ready(&self) -> bool {
        !self.slot.ready.is_empty()
    }

    /// Takes the ready value, clearing the slot.
    pub fn take(&mut self) -> Option<T> {
        self.slot.ready.pop()
    }

    /// Windows published since the mailbox was created, including overwritten ones.
    pub fn published(&self) -> u64 {
        self.slot.published.load(Ordering::Relaxed)
    }

    pub fn overruns(&self) -> u64 {
        self.slot.overruns.load(Ordering::Relaxed)
    }

    /// The producer half has been dropped.
    pub fn is_orphaned(&self) -> bool {
        Arc::strong_count(&self.slot) == 1
    }
}

pub type WindowPublisher = SlotWriter<WindowSnapshot>;
pub type WindowReceiver = SlotReader<WindowSnapshot>;

pub fn window_mailbox() -> (WindowPublisher, WindowReceiver) {
    slot()
}
