//! Bounded history of proxy connection attempts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One recorded connection attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionAttempt {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency_ms: u64,
    pub message: Option<String>,
}

/// Fixed-capacity ring of recent connection attempts. Once full, pushing a
/// new attempt evicts the oldest, so memory stays constant no matter how
/// long the process runs.
#[derive(Debug, Clone)]
pub struct ConnectionHistory {
    entries: VecDeque<ConnectionAttempt>,
    capacity: usize,
}

impl ConnectionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, attempt: ConnectionAttempt) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(attempt);
    }

    pub fn record(&mut self, success: bool, latency_ms: u64, message: Option<String>) {
        self.push(ConnectionAttempt {
            timestamp: Utc::now(),
            success,
            latency_ms,
            message,
        });
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &ConnectionAttempt> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ConnectionAttempt> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_enforced() {
        let mut history = ConnectionHistory::new(3);
        for i in 0..10 {
            history.record(true, i, None);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.capacity(), 3);
        // Oldest entries were evicted; the survivors are 7, 8, 9
        let latencies: Vec<u64> = history.iter().map(|a| a.latency_ms).collect();
        assert_eq!(latencies, vec![7, 8, 9]);
    }

    #[test]
    fn test_latest_tracks_most_recent() {
        let mut history = ConnectionHistory::new(5);
        assert!(history.latest().is_none());

        history.record(true, 12, None);
        history.record(false, 30, Some("connection refused".to_string()));

        let latest = history.latest().unwrap();
        assert!(!latest.success);
        assert_eq!(latest.message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = ConnectionHistory::new(0);
        history.record(true, 1, None);
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
    }
}
