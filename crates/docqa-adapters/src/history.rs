//! Bounded in-memory history of recent results.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use docqa_core::{AnalysisResult, ResultOutput};

/// Keeps the most recent `capacity` results, evicting the oldest first.
///
/// Nothing is persisted; the history lives as long as the value.
pub struct RecentHistory {
    capacity: NonZeroUsize,
    entries: Mutex<VecDeque<AnalysisResult>>,
}

impl RecentHistory {
    /// Creates an empty history holding at most `capacity` results.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.get())),
        }
    }

    /// Maximum number of retained results.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of retained results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Adds a result, evicting the oldest one when full.
    pub fn push(&self, result: AnalysisResult) {
        let mut entries = self.lock();
        if entries.len() == self.capacity.get() {
            entries.pop_front();
        }
        entries.push_back(result);
    }

    /// Retained results, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AnalysisResult> {
        self.lock().iter().cloned().collect()
    }

    /// Most recently recorded result.
    #[must_use]
    pub fn latest(&self) -> Option<AnalysisResult> {
        self.lock().back().cloned()
    }

    /// Drops every retained result.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AnalysisResult>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResultOutput for RecentHistory {
    fn write(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        self.push(result.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
