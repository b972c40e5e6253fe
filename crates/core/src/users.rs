//! Bounded user-reference cache
//!
//! Maps an opaque account id to a display name. Misses go to a [`UserLookup`]
//! collaborator (the Jira user endpoint in production, a closure in tests).
//! The lookup is never called while the cache lock is held, so concurrent
//! misses for the same key may both reach the collaborator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Default number of distinct account ids kept in memory
pub const DEFAULT_CAPACITY: usize = 100;

/// A user resolved by the external identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedUser {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// External identity lookup
pub trait UserLookup: Send + Sync {
    fn lookup_user(&self, account_id: &str) -> Result<ResolvedUser, LookupError>;
}

impl<F> UserLookup for F
where
    F: Fn(&str) -> Result<ResolvedUser, LookupError> + Send + Sync,
{
    fn lookup_user(&self, account_id: &str) -> Result<ResolvedUser, LookupError> {
        self(account_id)
    }
}

/// Lookup used when no identity service is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl UserLookup for NoLookup {
    fn lookup_user(&self, _account_id: &str) -> Result<ResolvedUser, LookupError> {
        Err(LookupError::NotConfigured)
    }
}

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

#[derive(Debug)]
struct Entry {
    user: ResolvedUser,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            log::debug!("Evicting user from cache: {key}");
            self.entries.remove(&key);
        }
    }
}

/// LRU cache in front of a [`UserLookup`]
pub struct UserCache {
    lookup: Arc<dyn UserLookup>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for UserCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

impl UserCache {
    pub fn new(lookup: Arc<dyn UserLookup>) -> Self {
        Self::with_capacity(lookup, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(lookup: Arc<dyn UserLookup>, capacity: usize) -> Self {
        Self {
            lookup,
            capacity,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resolve an account id, hitting the external lookup only on a miss
    ///
    /// Failed lookups are not cached; the error goes back to the caller.
    pub fn resolve(&self, account_id: &str) -> Result<ResolvedUser, LookupError> {
        {
            let mut state = self.lock();
            let tick = state.next_tick();
            if let Some(entry) = state.entries.get_mut(account_id) {
                entry.last_used = tick;
                let user = entry.user.clone();
                state.hits += 1;
                return Ok(user);
            }
            state.misses += 1;
        }

        log::debug!("Cache miss for user: {account_id}");
        let user = self.lookup.lookup_user(account_id)?;

        if self.capacity > 0 {
            let mut state = self.lock();
            if !state.entries.contains_key(account_id) && state.entries.len() >= self.capacity {
                state.evict_least_recent();
            }
            let last_used = state.next_tick();
            state.entries.insert(
                account_id.to_string(),
                Entry {
                    user: user.clone(),
                    last_used,
                },
            );
        }

        Ok(user)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.lock().entries.contains_key(account_id)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            len: state.entries.len(),
        }
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
    }

    // A panic in another conversion must not take the cache down with it.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl CountingLookup {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl UserLookup for CountingLookup {
        fn lookup_user(&self, account_id: &str) -> Result<ResolvedUser, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if account_id == "missing" {
                return Err(LookupError::NotFound(account_id.to_string()));
            }
            Ok(ResolvedUser {
                account_id: account_id.to_string(),
                display_name: format!("User {account_id}"),
            })
        }
    }

    #[test]
    fn test_resolve_miss_then_hit() {
        // Arrange
        let lookup = CountingLookup::new();
        let cache = UserCache::new(lookup.clone());

        // Act
        let first = cache.resolve("42").unwrap();
        let second = cache.resolve("42").unwrap();

        // Assert: only the first call reaches the lookup
        assert_eq!(first.display_name, "User 42");
        assert_eq!(first, second);
        assert_eq!(lookup.calls(), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                len: 1
            }
        );
    }

    #[test]
    fn test_failed_lookup_is_not_cached() {
        let lookup = CountingLookup::new();
        let cache = UserCache::new(lookup.clone());

        assert_eq!(
            cache.resolve("missing"),
            Err(LookupError::NotFound("missing".to_string()))
        );
        assert!(cache.resolve("missing").is_err());

        // Assert: both attempts hit the lookup, nothing stored
        assert_eq!(lookup.calls(), 2);
        assert!(!cache.contains("missing"));
    }

    #[test]
    fn test_evicts_least_recently_used_beyond_capacity() {
        // Arrange: fill the cache to its default capacity
        let lookup = CountingLookup::new();
        let cache = UserCache::new(lookup.clone());
        for i in 0..DEFAULT_CAPACITY {
            cache.resolve(&i.to_string()).unwrap();
        }

        // Touch "0" so that "1" becomes the least recently used entry
        cache.resolve("0").unwrap();

        // Act: one more distinct key
        cache.resolve("new").unwrap();

        // Assert
        assert_eq!(cache.stats().len, DEFAULT_CAPACITY);
        assert!(cache.contains("0"));
        assert!(!cache.contains("1"));
        assert_eq!(lookup.calls(), DEFAULT_CAPACITY + 1);

        // Re-accessing the evicted key triggers a new external lookup
        cache.resolve("1").unwrap();
        assert_eq!(lookup.calls(), DEFAULT_CAPACITY + 2);
    }

    #[test]
    fn test_zero_capacity_never_stores() {
        let lookup = CountingLookup::new();
        let cache = UserCache::with_capacity(lookup.clone(), 0);

        cache.resolve("a").unwrap();
        cache.resolve("a").unwrap();

        assert_eq!(lookup.calls(), 2);
        assert_eq!(cache.stats().len, 0);
    }

    #[test]
    fn test_closure_lookup_and_clear() {
        let lookup = |id: &str| -> Result<ResolvedUser, LookupError> {
            Ok(ResolvedUser {
                account_id: id.to_string(),
                display_name: "Ada".to_string(),
            })
        };
        let cache = UserCache::new(Arc::new(lookup));

        assert_eq!(cache.resolve("42").unwrap().display_name, "Ada");
        cache.clear();
        assert!(!cache.contains("42"));
    }

    #[test]
    fn test_no_lookup_reports_not_configured() {
        let cache = UserCache::new(Arc::new(NoLookup));
        assert_eq!(cache.resolve("42"), Err(LookupError::NotConfigured));
    }

    #[test]
    fn test_shared_across_threads() {
        let lookup = CountingLookup::new();
        let cache = Arc::new(UserCache::new(lookup.clone()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        cache.resolve(&format!("{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.stats().len, 80);
        assert_eq!(lookup.calls(), 80);
    }
}
