//! Virtual millisecond timer queue.

use crate::Host;
use core::fmt;

pub type TimerId = u64;

type TimerCallback = Box<dyn FnOnce(&mut Host)>;

pub(crate) struct Timer {
    id: TimerId,
    due_ms: u64,
    pub(crate) callback: TimerCallback,
}

/// Pending `set_timeout` callbacks ordered by (due time, scheduling order).
pub(crate) struct TimerQueue {
    now_ms: u64,
    next_id: TimerId,
    pending: Vec<Timer>,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_id: 1,
            pending: Vec::new(),
        }
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now_ms", &self.now_ms)
            .field("next_id", &self.next_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl TimerQueue {
    pub(crate) fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn schedule(&mut self, delay_ms: u64, callback: TimerCallback) -> TimerId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.pending.push(Timer {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            callback,
        });
        id
    }

    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        self.pending.len() != before
    }

    /// Removes the earliest timer due at or before `limit_ms` and moves the
    /// clock to its due time.
    pub(crate) fn pop_due(&mut self, limit_ms: u64) -> Option<Timer> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due_ms <= limit_ms)
            .min_by_key(|(_, timer)| (timer.due_ms, timer.id))
            .map(|(index, _)| index)?;
        let timer = self.pending.remove(index);
        self.now_ms = self.now_ms.max(timer.due_ms);
        Some(timer)
    }

    pub(crate) fn settle_at(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }
}
