use crate::host::GroupId;
use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Work queue of pending group dispatches.
///
/// A sweep front-loads one dispatch per managed group, spaced one tick unit
/// apart, then rearms itself behind the last one. `Tactics::tick` pops at most
/// a bounded number of due entries per call.
///
/// A group has at most one pending dispatch. Scheduling it again only moves
/// that dispatch earlier, so the queue never outgrows the registry no matter
/// how rarely the host ticks.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<(u64, u64, GroupId)>>,
    // Authoritative due time per group, heap entries disagreeing with it are stale
    due: AHashMap<GroupId, u64>,
    // FIFO among dispatches due at the same time
    seq: u64,
    next_sweep: u64,
}

impl Scheduler {
    pub fn starting_at(now: u64) -> Self {
        Self {
            next_sweep: now,
            ..Default::default()
        }
    }

    /// Queues a dispatch of `group` at `due`, unless one is already pending
    /// at or before that time.
    pub fn schedule(&mut self, group: GroupId, due: u64) {
        if matches!(self.due.get(&group), Some(pending) if *pending <= due) {
            return;
        }
        self.due.insert(group, due);
        self.seq += 1;
        self.queue.push(Reverse((due, self.seq, group)));
    }

    /// Drops the pending dispatch of `group`, if any.
    pub fn cancel(&mut self, group: GroupId) {
        self.due.remove(&group);
    }

    pub fn pop_due(&mut self, now: u64) -> Option<GroupId> {
        while let Some(Reverse((due, _, group))) = self.queue.peek().copied() {
            if due > now {
                return None;
            }
            self.queue.pop();
            if self.due.get(&group) == Some(&due) {
                self.due.remove(&group);
                return Some(group);
            }
        }
        None
    }

    /// Whether a sweep should skip `group`.
    pub fn is_pending(&self, group: GroupId) -> bool {
        self.due.contains_key(&group)
    }

    pub fn sweep_due(&self, now: u64) -> bool {
        now >= self.next_sweep
    }

    pub fn rearm(&mut self, at: u64) {
        self.next_sweep = at;
    }

    pub fn next_sweep(&self) -> u64 {
        self.next_sweep
    }

    pub fn pending(&self) -> usize {
        self.due.len()
    }
}
