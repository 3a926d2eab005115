//! Per-host robots.txt cache with a time-to-live

use crate::robots::RobotsRules;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Rules for a host along with the time they were fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Whether the entry is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        Utc::now() - self.fetched_at > ttl
    }
}

/// Rules keyed by base URL (`scheme://host[:port]`)
#[derive(Debug)]
pub struct RobotsCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::weeks(52 * 100)),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh rules for `base_url`, if any
    pub fn get(&self, base_url: &str) -> Option<RobotsRules> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(base_url)
            .filter(|cached| !cached.is_stale(self.ttl))
            .map(|cached| cached.rules.clone())
    }

    pub fn insert(&self, base_url: &str, rules: RobotsRules) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(base_url.to_string(), CachedRobots::new(rules));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
