//! In-process Entry Queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tierlog_core::LogEntry;

/// Result of [`EntryQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted; carries the open queue length afterwards.
    Queued(usize),
    /// Accepted, and the open queue was sealed into a batch of this many
    /// entries. The caller owes a flush.
    Sealed(usize),
    /// The queue is at capacity and could not be sealed; the entry was not
    /// stored. Only Debug/Info entries are ever rejected.
    Rejected,
}

/// Result of [`EntryQueue::requeue_front`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requeued {
    /// Entries of the failed batch kept in the queue.
    pub kept: usize,
    /// Entries dropped over capacity, from the failed batch or newer.
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct Slots {
    /// Batches handed off to a pending flush, oldest first.
    sealed: VecDeque<Vec<LogEntry>>,
    open: VecDeque<LogEntry>,
}

/// Bounded FIFO of entries waiting to be pushed to the intermediate buffer.
///
/// The open queue never grows past `capacity` with Debug/Info entries.
/// Reaching the cap seals the open entries into a batch that the next flush
/// takes ahead of anything newer, so a burst larger than the cap is not
/// lost while the buffer is healthy. The cap only costs entries once a push
/// has failed and the batch is put back.
///
/// The lock is never held across an await point; every method is a short
/// synchronous critical section.
#[derive(Debug)]
pub struct EntryQueue {
    slots: Mutex<Slots>,
    capacity: usize,
}

impl EntryQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots {
                sealed: VecDeque::new(),
                open: VecDeque::with_capacity(capacity.min(1024)),
            }),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `entry`.
    ///
    /// With `can_seal`, the open queue is sealed when `entry` is Warn/Error
    /// or the cap is reached. Without it nothing is sealed, Debug/Info
    /// entries are rejected at the cap and Warn/Error entries are kept past
    /// it.
    pub fn enqueue(&self, entry: LogEntry, can_seal: bool) -> EnqueueOutcome {
        let severe = entry.level().is_severe();
        let mut slots = self.lock();
        if slots.open.len() >= self.capacity && !severe {
            if !can_seal {
                return EnqueueOutcome::Rejected;
            }
            Self::seal_locked(&mut slots);
        }
        slots.open.push_back(entry);

        let len = slots.open.len();
        if can_seal && (severe || len >= self.capacity) {
            Self::seal_locked(&mut slots);
            return EnqueueOutcome::Sealed(len);
        }
        EnqueueOutcome::Queued(len)
    }

    fn seal_locked(slots: &mut Slots) {
        if !slots.open.is_empty() {
            let batch = std::mem::take(&mut slots.open).into();
            slots.sealed.push_back(batch);
        }
    }

    /// Take every entry in insertion order, sealed batches first, leaving
    /// the queue empty.
    pub fn drain_all(&self) -> Vec<LogEntry> {
        let mut slots = self.lock();
        let mut drained: Vec<LogEntry> = slots.sealed.drain(..).flatten().collect();
        drained.extend(slots.open.drain(..));
        drained
    }

    /// Put a failed batch back in front of anything queued since it was
    /// drained, truncated to capacity.
    ///
    /// The front of the batch is kept; the newest entries are the ones lost.
    pub fn requeue_front(&self, batch: Vec<LogEntry>) -> Requeued {
        let mut slots = self.lock();
        let failed = batch.len();

        let mut merged: VecDeque<LogEntry> = batch.into();
        merged.extend(slots.sealed.drain(..).flatten());
        merged.extend(slots.open.drain(..));
        let total = merged.len();
        merged.truncate(self.capacity);
        slots.open = merged;

        Requeued {
            kept: failed.min(self.capacity),
            dropped: total.saturating_sub(self.capacity),
        }
    }

    /// Entries in the open queue.
    pub fn len(&self) -> usize {
        self.lock().open.len()
    }

    /// Entries sealed into batches and waiting for a flush.
    pub fn sealed_len(&self) -> usize {
        self.lock().sealed.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        let slots = self.lock();
        slots.open.is_empty() && slots.sealed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierlog_core::{LogLevel, LogMetadata, LogType};

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message, LogType::Request, LogMetadata::new())
    }

    fn severe(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Error, message, LogType::Error, LogMetadata::new())
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.message()).collect()
    }

    #[test]
    fn test_enqueue_reports_size() {
        let queue = EntryQueue::new(10);
        assert!(queue.is_empty());
        assert_eq!(queue.enqueue(entry("a"), true), EnqueueOutcome::Queued(1));
        assert_eq!(queue.enqueue(entry("b"), true), EnqueueOutcome::Queued(2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_reaching_capacity_seals_batch() {
        let queue = EntryQueue::new(2);
        queue.enqueue(entry("a"), true);
        assert_eq!(queue.enqueue(entry("b"), true), EnqueueOutcome::Sealed(2));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.sealed_len(), 2);

        assert_eq!(queue.enqueue(entry("c"), true), EnqueueOutcome::Queued(1));
        assert_eq!(messages(&queue.drain_all()), ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_burst_past_capacity_keeps_everything() {
        let queue = EntryQueue::new(3);
        for i in 0..10 {
            let outcome = queue.enqueue(entry(&i.to_string()), true);
            assert_ne!(outcome, EnqueueOutcome::Rejected);
            assert!(queue.len() <= 3);
        }
        let drained = queue.drain_all();
        assert_eq!(
            messages(&drained),
            ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]
        );
    }

    #[test]
    fn test_severe_entry_seals_immediately() {
        let queue = EntryQueue::new(10);
        queue.enqueue(entry("a"), true);
        assert_eq!(queue.enqueue(severe("boom"), true), EnqueueOutcome::Sealed(2));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.sealed_len(), 2);
    }

    #[test]
    fn test_without_sealing_rejects_only_info_at_capacity() {
        let queue = EntryQueue::new(2);
        queue.enqueue(entry("a"), false);
        queue.enqueue(entry("b"), false);
        assert_eq!(queue.enqueue(entry("c"), false), EnqueueOutcome::Rejected);
        assert_eq!(queue.enqueue(severe("d"), false), EnqueueOutcome::Queued(3));
        assert_eq!(messages(&queue.drain_all()), ["a", "b", "d"]);
    }

    #[test]
    fn test_drain_all_preserves_order_and_empties() {
        let queue = EntryQueue::new(10);
        for m in ["A", "B", "C"] {
            queue.enqueue(entry(m), true);
        }
        let drained = queue.drain_all();
        assert_eq!(messages(&drained), ["A", "B", "C"]);
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_requeue_front_goes_before_newer_entries() {
        let queue = EntryQueue::new(10);
        queue.enqueue(entry("A"), true);
        queue.enqueue(entry("B"), true);
        let failed = queue.drain_all();

        queue.enqueue(entry("C"), true);
        assert_eq!(
            queue.requeue_front(failed),
            Requeued {
                kept: 2,
                dropped: 0
            }
        );

        assert_eq!(messages(&queue.drain_all()), ["A", "B", "C"]);
    }

    #[test]
    fn test_requeue_front_caps_and_keeps_oldest() {
        let queue = EntryQueue::new(3);
        let failed: Vec<_> = ["1", "2", "3", "4"].into_iter().map(entry).collect();
        queue.enqueue(entry("new"), true);

        let requeued = queue.requeue_front(failed);
        assert_eq!(
            requeued,
            Requeued {
                kept: 3,
                dropped: 2
            }
        );
        assert_eq!(messages(&queue.drain_all()), ["1", "2", "3"]);
    }

    #[test]
    fn test_requeue_front_counts_newer_entries_as_dropped() {
        let queue = EntryQueue::new(3);
        let failed: Vec<_> = ["1", "2"].into_iter().map(entry).collect();
        queue.enqueue(entry("x"), true);
        queue.enqueue(entry("y"), true);

        let requeued = queue.requeue_front(failed);
        assert_eq!(
            requeued,
            Requeued {
                kept: 2,
                dropped: 1
            }
        );
        assert_eq!(messages(&queue.drain_all()), ["1", "2", "x"]);
    }
}
