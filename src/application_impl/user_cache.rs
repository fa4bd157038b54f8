use crate::domain_model::{IdentityKey, User};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lookup results for one transaction, misses included.
///
/// Every entry is tagged with the epoch it was written under and `flush`
/// bumps the epoch, so an entry from a transaction that already ended is
/// never served, even if its write raced the flush.
#[derive(Default)]
pub struct UserCache {
    entries: DashMap<IdentityKey, (u64, Option<User>)>,
    epoch: AtomicU64,
}

impl UserCache {
    pub fn get(&self, key: &IdentityKey) -> Option<Option<User>> {
        let epoch = self.epoch();
        self.entries
            .get(key)
            .filter(|entry| entry.0 == epoch)
            .map(|entry| entry.1.clone())
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Returns false if the cache was flushed since `epoch` was read.
    pub fn insert_at(&self, epoch: u64, key: IdentityKey, user: Option<User>) -> bool {
        if self.epoch() != epoch {
            return false;
        }
        self.store(epoch, key, user);
        true
    }

    /// Replace the current-transaction entry for `user`, if there is one.
    pub fn refresh(&self, user: &User) -> bool {
        let epoch = self.epoch();
        match self.entries.get_mut(&user.identity_key()) {
            Some(mut entry) if entry.0 == epoch => {
                entry.1 = Some(user.clone());
                true
            }
            _ => false,
        }
    }

    pub fn flush(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        let epoch = self.epoch();
        self.entries.iter().filter(|entry| entry.0 == epoch).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, epoch: u64, key: IdentityKey, user: Option<User>) {
        self.entries.insert(key, (epoch, user));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_misses() {
        let cache = UserCache::default();
        let key = IdentityKey::new("foo", "example.com");
        assert_eq!(cache.get(&key), None);

        assert!(cache.insert_at(cache.epoch(), key.clone(), None));
        assert_eq!(cache.get(&key), Some(None));
    }

    #[test]
    fn stale_epoch_write_is_dropped() {
        let cache = UserCache::default();
        let epoch = cache.epoch();
        cache.flush();

        let user = User::new("foo", "example.com");
        assert!(!cache.insert_at(epoch, user.identity_key(), Some(user)));
        assert!(cache.is_empty());
    }

    #[test]
    fn write_landing_after_flush_is_not_served() {
        let cache = UserCache::default();
        let user = User::new("foo", "example.com");
        let epoch = cache.epoch();

        // The epoch check passed, then the transaction ended before the write.
        cache.flush();
        cache.store(epoch, user.identity_key(), Some(user.clone()));

        assert_eq!(cache.get(&user.identity_key()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn refresh_replaces_only_existing_entries() {
        let cache = UserCache::default();
        let mut user = User::new("foo", "example.com");
        assert!(!cache.refresh(&user));
        assert!(cache.is_empty());

        cache.insert_at(cache.epoch(), user.identity_key(), Some(user.clone()));
        user.sidebar_tutorial_dismissed = true;
        assert!(cache.refresh(&user));
        assert_eq!(cache.get(&user.identity_key()), Some(Some(user)));
    }

    #[test]
    fn flush_empties() {
        let cache = UserCache::default();
        let user = User::new("foo", "example.com");
        cache.insert_at(cache.epoch(), user.identity_key(), Some(user.clone()));
        assert_eq!(cache.len(), 1);

        cache.flush();
        assert!(cache.get(&user.identity_key()).is_none());
        assert!(!cache.refresh(&user));
    }
}
