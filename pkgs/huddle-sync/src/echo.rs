//! Bounded memory of recently seen message ids

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Message ids remembered for a limited time, up to a fixed number of entries.
///
/// Used to recognise the change-feed echo of a client's own writes and to
/// ignore re-delivered inserts. Entries are never refreshed, so insertion
/// order is also expiry order.
#[derive(Debug)]
pub(crate) struct RecentIds {
    ttl: Duration,
    capacity: usize,
    seen: HashMap<String, Instant>,
    order: VecDeque<(String, Instant)>,
}

impl RecentIds {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            seen: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Remember `id`; returns false if it was already remembered
    pub fn insert(&mut self, id: String) -> bool {
        self.insert_at(id, Instant::now())
    }

    pub fn insert_at(&mut self, id: String, now: Instant) -> bool {
        self.evict_expired(now);
        if self.seen.contains_key(&id) {
            return false;
        }

        while self.seen.len() >= self.capacity {
            match self.order.pop_front() {
                Some((oldest, _)) => {
                    self.seen.remove(&oldest);
                }
                None => break,
            }
        }

        self.seen.insert(id.clone(), now);
        self.order.push_back((id, now));
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.contains_at(id, Instant::now())
    }

    pub fn contains_at(&self, id: &str, now: Instant) -> bool {
        self.seen
            .get(id)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.ttl)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some((_, at)) = self.order.front() {
            if now.saturating_duration_since(*at) < self.ttl {
                break;
            }
            if let Some((id, _)) = self.order.pop_front() {
                self.seen.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_reports_duplicates() {
        let mut ids = RecentIds::new(Duration::from_secs(30), 8);
        assert!(ids.insert("m1".to_string()));
        assert!(!ids.insert("m1".to_string()));
        assert!(ids.contains("m1"));
        assert!(!ids.contains("m2"));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let start = Instant::now();
        let mut ids = RecentIds::new(Duration::from_secs(30), 8);
        ids.insert_at("m1".to_string(), start);

        assert!(ids.contains_at("m1", start + Duration::from_secs(29)));
        assert!(!ids.contains_at("m1", start + Duration::from_secs(30)));

        // Expired entries are dropped on the next insert
        ids.insert_at("m2".to_string(), start + Duration::from_secs(31));
        assert_eq!(ids.len(), 1);
        assert!(ids.insert_at("m1".to_string(), start + Duration::from_secs(31)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let start = Instant::now();
        let mut ids = RecentIds::new(Duration::from_secs(30), 2);
        ids.insert_at("m1".to_string(), start);
        ids.insert_at("m2".to_string(), start);
        ids.insert_at("m3".to_string(), start);

        assert_eq!(ids.len(), 2);
        assert!(!ids.contains_at("m1", start));
        assert!(ids.contains_at("m2", start));
        assert!(ids.contains_at("m3", start));
    }
}
