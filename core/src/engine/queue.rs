use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Mutation;

/// Position of a mutation in the order `update` was called. Never reused within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Seq(u64);

/// One speculative change waiting to be persisted
pub(crate) struct PendingMutation<T> {
    pub id: String,
    pub optimistic_value: T,
    /// What the visible value was right before this change. Restored on rollback.
    pub previous_value: T,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    operation: Arc<dyn Mutation>,
    /// The change applied right before this one, whether or not it is still queued
    predecessor: Option<Seq>,
}

/// Outcome of recording a failed attempt
pub(crate) enum Failure<T> {
    /// The entry was removed (reset) while its attempt was in flight
    Vanished,
    Retrying { id: String, attempts: u32 },
    Exhausted {
        entry: PendingMutation<T>,
        /// Value to put back on screen, if this change is still the one showing
        restore: Option<T>,
    },
}

/// Queued mutations in `update` order
pub(crate) struct PendingQueue<T> {
    entries: BTreeMap<Seq, PendingMutation<T>>,
    next: u64,
    /// Most recent change made through `update`, queued or already settled
    latest: Option<Seq>,
}

impl<T: Clone> PendingQueue<T> {
    pub fn new() -> Self { Self { entries: BTreeMap::new(), next: 0, latest: None } }

    pub fn push(&mut self, id: String, optimistic_value: T, previous_value: T, operation: Arc<dyn Mutation>) -> Seq {
        let seq = Seq(self.next);
        self.next += 1;
        let entry = PendingMutation {
            id,
            optimistic_value,
            previous_value,
            retry_count: 0,
            created_at: Utc::now(),
            operation,
            predecessor: self.latest.replace(seq),
        };
        self.entries.insert(seq, entry);
        seq
    }

    /// Operations of every queued entry, in processing order
    pub fn snapshot(&self) -> Vec<(Seq, Arc<dyn Mutation>)> {
        self.entries.iter().map(|(seq, entry)| (*seq, entry.operation.clone())).collect()
    }

    pub fn contains(&self, seq: Seq) -> bool { self.entries.contains_key(&seq) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn ids(&self) -> Vec<String> { self.entries.values().map(|entry| entry.id.clone()).collect() }

    pub fn max_retry_count(&self) -> u32 { self.entries.values().map(|entry| entry.retry_count).max().unwrap_or(0) }

    /// Remove a persisted entry
    pub fn complete(&mut self, seq: Seq) -> Option<PendingMutation<T>> { self.entries.remove(&seq) }

    /// Count a failed attempt. Once the entry has already been retried `max_retries` times it is
    /// removed and rolled back.
    ///
    /// A rolled back change that has since been overwritten by a later `update` does not touch the
    /// visible value; instead the queued change made directly on top of it inherits its baseline, so
    /// that rolling that one back later lands on the value from before both.
    pub fn record_failure(&mut self, seq: Seq, max_retries: u32) -> Failure<T> {
        let Some(entry) = self.entries.get_mut(&seq) else {
            return Failure::Vanished;
        };
        if entry.retry_count < max_retries {
            entry.retry_count += 1;
            return Failure::Retrying { id: entry.id.clone(), attempts: entry.retry_count };
        }

        let Some(entry) = self.entries.remove(&seq) else {
            return Failure::Vanished;
        };
        let restore = if self.latest == Some(seq) {
            self.latest = entry.predecessor;
            Some(entry.previous_value.clone())
        } else {
            if let Some(successor) = self.entries.values_mut().find(|candidate| candidate.predecessor == Some(seq)) {
                successor.previous_value = entry.previous_value.clone();
                successor.predecessor = entry.predecessor;
            }
            None
        };
        Failure::Exhausted { entry, restore }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest = None;
    }
}
