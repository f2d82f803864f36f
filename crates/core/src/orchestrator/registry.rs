//! In-memory registry of in-flight downloads.
//!
//! The registry is plain synchronous state; the orchestrator owns it behind a
//! single async mutex together with the deadline timer and the callback list.
//! Every "is it empty now?" decision is made here, under that lock, which is
//! what keeps the library refresh to at most one run per batch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{DownloadEntry, EntryState};

/// Result of inserting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insert {
    /// An entry with the same download ID already exists; nothing changed.
    Duplicate,
    /// Entry added. `batch_started` carries the new epoch when the registry
    /// was empty before the insert.
    Inserted { batch_started: Option<u64> },
}

/// What the caller must do after a failure was recorded.
#[derive(Debug, Clone)]
pub(crate) enum FailureAction {
    Unknown,
    /// Entry is already being cleaned up by another failure.
    AlreadyExhausting,
    /// Issue a new search; the entry stays tracked.
    Retry { entry: DownloadEntry, attempt: u32 },
    /// Run cleanup, then remove the entry.
    Exhaust { entry: DownloadEntry },
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<String, DownloadEntry>,
    epoch: u64,
    batch_open: bool,
    settled: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: DownloadEntry) -> Insert {
        if self.entries.contains_key(&entry.download_id) {
            return Insert::Duplicate;
        }

        let batch_started = if self.entries.is_empty() {
            self.epoch += 1;
            self.batch_open = true;
            Some(self.epoch)
        } else {
            None
        };

        self.entries.insert(entry.download_id.clone(), entry);
        Insert::Inserted { batch_started }
    }

    pub fn remove(&mut self, download_id: &str) -> Option<DownloadEntry> {
        self.entries.remove(download_id)
    }

    /// Record a failure against an entry and decide between retry and cleanup.
    ///
    /// `forced` failures skip the attempt budget and exhaust immediately.
    pub fn register_failure(
        &mut self,
        download_id: &str,
        reason: &str,
        forced: bool,
        max_attempts: u32,
    ) -> FailureAction {
        let Some(entry) = self.entries.get_mut(download_id) else {
            return FailureAction::Unknown;
        };

        if entry.state == EntryState::Exhausted {
            return FailureAction::AlreadyExhausting;
        }

        entry.last_error = Some(reason.to_string());

        if forced || entry.attempts >= max_attempts {
            entry.state = EntryState::Exhausted;
            FailureAction::Exhaust {
                entry: entry.clone(),
            }
        } else {
            entry.attempts += 1;
            entry.state = EntryState::Retrying;
            FailureAction::Retry {
                attempt: entry.attempts,
                entry: entry.clone(),
            }
        }
    }

    /// Close the current batch if the registry is empty.
    ///
    /// Returns the settled epoch exactly once per batch; later calls return
    /// `None` until a new batch starts.
    pub fn settle_if_empty(&mut self) -> Option<u64> {
        if self.batch_open && self.entries.is_empty() {
            self.batch_open = false;
            self.settled += 1;
            Some(self.epoch)
        } else {
            None
        }
    }

    /// IDs of entries started before `cutoff`. Entries mid-cleanup are skipped.
    pub fn stale_ids(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.state != EntryState::Exhausted && e.started_at < cutoff)
            .map(|e| e.download_id.clone())
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<DownloadEntry> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.download_id.cmp(&b.download_id))
        });
        entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.batch_open = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn settled(&self) -> u64 {
        self.settled
    }

    #[cfg(test)]
    pub fn get(&self, download_id: &str) -> Option<&DownloadEntry> {
        self.entries.get(download_id)
    }

    #[cfg(test)]
    pub fn get_mut(&mut self, download_id: &str) -> Option<&mut DownloadEntry> {
        self.entries.get_mut(download_id)
    }
}
