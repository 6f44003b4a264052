//! # Ordered storage of pending jobs.
//!
//! [`PriorityQueue`] keeps pending [`JobRequest`]s in dequeue order:
//! priority tier descending, then enqueue timestamp ascending, then
//! admission sequence number ascending. The sequence number is stamped here
//! and makes the order total — two entries never compare equal.
//!
//! The container is deliberately dumb: no locking, no owners, no workers.
//! [`QueueManager`](super::QueueManager) wraps it in a mutex and layers
//! admission on top.

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use crate::jobs::{JobId, JobRequest};

/// Total ordering key: tier descending, then time ascending, then sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryKey {
    tier: u8,
    enqueued_at: SystemTime,
    seq: u64,
}

impl Ord for EntryKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .tier
            .cmp(&self.tier)
            .then(self.enqueued_at.cmp(&other.enqueued_at))
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A pending job together with its admission stamps.
///
/// The tie-breaking sequence number lives in the map key.
#[derive(Debug, Clone)]
pub(crate) struct QueueEntry {
    /// The job itself.
    pub job: JobRequest,
    /// Effective tier decided at admission (tier policy applied).
    pub tier: u8,
    /// When the job was admitted.
    pub enqueued_at: SystemTime,
}

/// Ordered container of pending jobs.
///
/// Insert and remove are O(log n); position lookups walk the order.
/// Iteration yields dequeue order.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    entries: BTreeMap<EntryKey, QueueEntry>,
    index: HashMap<JobId, EntryKey>,
    next_seq: u64,
}

impl PriorityQueue {
    /// Inserts a job with the given effective tier and returns its current
    /// 1-indexed position.
    pub(crate) fn enqueue(&mut self, job: JobRequest, tier: u8) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;

        let key = EntryKey {
            tier,
            enqueued_at: SystemTime::now(),
            seq,
        };
        let entry = QueueEntry {
            tier,
            enqueued_at: key.enqueued_at,
            job,
        };
        self.index.insert(entry.job.id, key);
        self.entries.insert(key, entry);

        // Position of the key we just inserted.
        self.entries.range(..=key).count()
    }

    /// Removes and returns the highest-priority, oldest entry.
    pub(crate) fn pop(&mut self) -> Option<QueueEntry> {
        let key = *self.entries.keys().next()?;
        let entry = self.entries.remove(&key)?;
        self.index.remove(&entry.job.id);
        Some(entry)
    }

    /// Removes a specific pending job. Absence is benign (`None`).
    pub(crate) fn remove(&mut self, id: JobId) -> Option<QueueEntry> {
        let key = self.index.remove(&id)?;
        self.entries.remove(&key)
    }

    /// Borrows a pending entry by id.
    pub(crate) fn get(&self, id: JobId) -> Option<&QueueEntry> {
        let key = self.index.get(&id)?;
        self.entries.get(key)
    }

    /// Current 1-indexed position of a pending job, or `None` if absent.
    pub fn position_of(&self, id: JobId) -> Option<usize> {
        let key = self.index.get(&id)?;
        Some(self.entries.range(..=*key).count())
    }

    /// Pending entries in dequeue order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values()
    }

    /// True when a job with this id is pending.
    pub fn contains(&self, id: JobId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no jobs are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobRequest;

    fn job(owner: &str, tier: u8) -> JobRequest {
        JobRequest::new(owner, "test", Vec::new()).with_tier(tier)
    }

    #[test]
    fn pops_by_tier_then_fifo() {
        let mut q = PriorityQueue::default();
        let a = job("a", 1);
        let b = job("b", 2);
        let c = job("c", 1);
        let (ia, ib, ic) = (a.id, b.id, c.id);

        q.enqueue(a, 1);
        q.enqueue(b, 2);
        q.enqueue(c, 1);

        assert_eq!(q.pop().map(|e| e.job.id), Some(ib));
        assert_eq!(q.pop().map(|e| e.job.id), Some(ia));
        assert_eq!(q.pop().map(|e| e.job.id), Some(ic));
        assert!(q.pop().is_none());
    }

    #[test]
    fn equal_tier_breaks_ties_by_sequence() {
        let mut q = PriorityQueue::default();
        let ids: Vec<_> = (0..8)
            .map(|_| {
                let j = job("o", 3);
                let id = j.id;
                q.enqueue(j, 3);
                id
            })
            .collect();

        let popped: Vec<_> = std::iter::from_fn(|| q.pop()).map(|e| e.job.id).collect();
        assert_eq!(popped, ids);
    }

    #[test]
    fn enqueue_reports_position() {
        let mut q = PriorityQueue::default();
        assert_eq!(q.enqueue(job("a", 1), 1), 1);
        assert_eq!(q.enqueue(job("b", 1), 1), 2);
        // Higher tier jumps the line.
        assert_eq!(q.enqueue(job("c", 5), 5), 1);
    }

    #[test]
    fn remove_and_position() {
        let mut q = PriorityQueue::default();
        let a = job("a", 2);
        let b = job("b", 1);
        let (ia, ib) = (a.id, b.id);
        q.enqueue(a, 2);
        q.enqueue(b, 1);

        assert_eq!(q.position_of(ib), Some(2));
        assert!(q.remove(ia).is_some());
        assert_eq!(q.position_of(ib), Some(1));
        // Absence is benign.
        assert!(q.remove(ia).is_none());
        assert_eq!(q.position_of(ia), None);
    }
}
