use std::collections::HashMap;

use crate::domain::{append_trail, SourceReport, SourceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Waiting for its next attempt
    Pending,
    Succeeded,
    FailedRetryable,
    FailedTerminal,
}

#[derive(Debug, Clone)]
struct Entry {
    state: RetryState,
    retries: u32,
    limit: u32,
}

/// Per-source retry bookkeeping across batches.
///
/// A source is offered at most `limit` retries after its first attempt, so it
/// takes part in at most `limit + 1` batches.
#[derive(Debug, Default)]
pub struct RetryTracker {
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl RetryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, source_id: &str, limit: u32) {
        if self.entries.contains_key(source_id) {
            return;
        }
        self.order.push(source_id.to_string());
        self.entries.insert(
            source_id.to_string(),
            Entry {
                state: RetryState::Pending,
                retries: 0,
                limit,
            },
        );
    }

    /// Record the outcome of the source's latest attempt.
    pub fn record(&mut self, source_id: &str, status: SourceStatus) -> Option<RetryState> {
        let entry = self.entries.get_mut(source_id)?;
        entry.state = match status {
            SourceStatus::Error if entry.retries < entry.limit => RetryState::FailedRetryable,
            SourceStatus::Error => RetryState::FailedTerminal,
            _ => RetryState::Succeeded,
        };
        Some(entry.state)
    }

    /// Ids due for another attempt, in tracking order.
    pub fn retryable(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.entries
                    .get(id.as_str())
                    .is_some_and(|e| e.state == RetryState::FailedRetryable)
            })
            .cloned()
            .collect()
    }

    /// Move a retryable source back to pending and return its retry number (1-based).
    pub fn begin_retry(&mut self, source_id: &str) -> Option<u32> {
        let entry = self.entries.get_mut(source_id)?;
        if entry.state != RetryState::FailedRetryable {
            return None;
        }
        entry.retries += 1;
        entry.state = RetryState::Pending;
        Some(entry.retries)
    }

    pub fn state(&self, source_id: &str) -> Option<RetryState> {
        self.entries.get(source_id).map(|e| e.state)
    }

    pub fn retries(&self, source_id: &str) -> u32 {
        self.entries.get(source_id).map_or(0, |e| e.retries)
    }
}

/// Fold a failed retry into the report of the earlier failure.
pub fn merge_retry_failure(previous: &SourceReport, retry: &SourceReport, retry_count: u32) -> SourceReport {
    let mut merged = previous.clone();
    if !retry.error.is_empty() {
        append_trail(&mut merged.error, &format!("retry_{}:{}", retry_count, retry.error));
    }
    merged.item_count = 0;
    merged.retry_attempted = true;
    merged.retry_succeeded = false;
    merged.retry_count = retry_count;
    merged.checked_at = retry.checked_at;
    merged.health_level = retry.health_level;
    merged.cooldown_until = retry.cooldown_until;
    merged
}
