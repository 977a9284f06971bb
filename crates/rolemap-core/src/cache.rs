use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::model::{PermissionSet, RoleId, RoleSet, UserId};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    permissions: PermissionSet,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Memoized resolution results: one map keyed by user id, one keyed by the
/// canonical role-id-set, plus the reverse index from a single role id to
/// every role-set key ever registered against it.
///
/// Expiry is checked lazily on lookup; there is no background sweep. The
/// reverse index is append-only: registrations outlive both TTL expiry and
/// explicit flushes, so it over-approximates the live role-set entries but
/// never misses one.
#[derive(Debug)]
pub struct PermissionCache {
    user_entries: RwLock<HashMap<UserId, CacheEntry>>,
    role_set_entries: RwLock<HashMap<RoleSet, CacheEntry>>,
    role_dependents: RwLock<HashMap<RoleId, HashSet<RoleSet>>>,
    ttl: Duration,
}

impl PermissionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            user_entries: RwLock::new(HashMap::new()),
            role_set_entries: RwLock::new(HashMap::new()),
            role_dependents: RwLock::new(HashMap::new()),
            ttl: config.ttl,
        }
    }

    pub fn lookup_user(&self, user_id: UserId) -> Option<PermissionSet> {
        let entries = self.user_entries.read().unwrap();
        entries
            .get(&user_id)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.permissions.clone())
    }

    pub fn store_user(&self, user_id: UserId, permissions: PermissionSet) {
        let entry = self.entry(permissions);
        self.user_entries.write().unwrap().insert(user_id, entry);
        tracing::debug!(user_id = %user_id, "cached effective permissions for user");
    }

    pub fn lookup_role_set(&self, role_ids: &RoleSet) -> Option<PermissionSet> {
        let entries = self.role_set_entries.read().unwrap();
        entries
            .get(role_ids)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.permissions.clone())
    }

    pub fn store_role_set(&self, role_ids: &RoleSet, permissions: PermissionSet) {
        self.register_role_set(role_ids);
        let entry = self.entry(permissions);
        self.role_set_entries
            .write()
            .unwrap()
            .insert(role_ids.clone(), entry);
        tracing::debug!(roles = role_ids.len(), "cached effective permissions for role set");
    }

    /// Record each member role id against this exact set in the reverse
    /// index. Called before resolution as well, so a failed resolution
    /// still leaves the (safe, over-approximating) registration behind.
    pub fn register_role_set(&self, role_ids: &RoleSet) {
        let mut dependents = self.role_dependents.write().unwrap();
        for role_id in role_ids {
            dependents
                .entry(*role_id)
                .or_default()
                .insert(role_ids.clone());
        }
    }

    pub fn flush_user(&self, user_id: UserId) {
        self.user_entries.write().unwrap().remove(&user_id);
    }

    pub fn flush_users<I>(&self, user_ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut entries = self.user_entries.write().unwrap();
        let mut flushed = 0usize;
        for user_id in user_ids {
            if entries.remove(&user_id).is_some() {
                flushed += 1;
            }
        }
        if flushed > 0 {
            tracing::debug!(flushed, "flushed per-user cache entries");
        }
    }

    /// Remove every role-set entry registered against any of the given
    /// role ids. The index registrations themselves stay in place.
    pub fn flush_roles<I>(&self, role_ids: I)
    where
        I: IntoIterator<Item = RoleId>,
    {
        let sets_to_clear: HashSet<RoleSet> = {
            let dependents = self.role_dependents.read().unwrap();
            role_ids
                .into_iter()
                .filter_map(|role_id| dependents.get(&role_id))
                .flat_map(|sets| sets.iter().cloned())
                .collect()
        };

        if sets_to_clear.is_empty() {
            return;
        }

        let mut entries = self.role_set_entries.write().unwrap();
        for role_set in &sets_to_clear {
            entries.remove(role_set);
        }
        tracing::debug!(
            flushed = sets_to_clear.len(),
            "flushed role-set cache entries"
        );
    }

    pub fn flush_all(&self) {
        self.user_entries.write().unwrap().clear();
        self.role_set_entries.write().unwrap().clear();
        tracing::debug!("flushed all cache entries");
    }

    fn entry(&self, permissions: PermissionSet) -> CacheEntry {
        CacheEntry {
            permissions,
            expires_at: Instant::now() + self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissions(names: &[&str]) -> PermissionSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn role_set(ids: &[i32]) -> RoleSet {
        ids.iter().map(|id| RoleId::new(*id)).collect()
    }

    fn cache() -> PermissionCache {
        PermissionCache::new(CacheConfig::default())
    }

    fn expired_cache() -> PermissionCache {
        PermissionCache::new(CacheConfig {
            ttl: Duration::ZERO,
        })
    }

    #[test]
    fn lookup_user_misses_on_empty_cache() {
        assert_eq!(cache().lookup_user(UserId::new(1)), None);
    }

    #[test]
    fn stored_user_entry_is_served_within_ttl() {
        let cache = cache();
        cache.store_user(UserId::new(1), permissions(&["read"]));

        assert_eq!(
            cache.lookup_user(UserId::new(1)),
            Some(permissions(&["read"]))
        );
    }

    #[test]
    fn expired_user_entry_counts_as_miss() {
        let cache = expired_cache();
        cache.store_user(UserId::new(1), permissions(&["read"]));

        assert_eq!(cache.lookup_user(UserId::new(1)), None);
    }

    #[test]
    fn flush_user_removes_entry_regardless_of_ttl() {
        let cache = cache();
        cache.store_user(UserId::new(1), permissions(&["read"]));

        cache.flush_user(UserId::new(1));

        assert_eq!(cache.lookup_user(UserId::new(1)), None);
    }

    #[test]
    fn flush_users_ignores_absent_keys() {
        let cache = cache();
        cache.store_user(UserId::new(1), permissions(&["read"]));

        cache.flush_users([UserId::new(1), UserId::new(99)]);

        assert_eq!(cache.lookup_user(UserId::new(1)), None);
    }

    #[test]
    fn role_set_entry_round_trips() {
        let cache = cache();
        let key = role_set(&[1, 2]);
        cache.store_role_set(&key, permissions(&["read"]));

        assert_eq!(cache.lookup_role_set(&key), Some(permissions(&["read"])));
    }

    #[test]
    fn role_set_lookup_is_order_independent() {
        let cache = cache();
        let stored: RoleSet = [RoleId::new(2), RoleId::new(1)].into_iter().collect();
        cache.store_role_set(&stored, permissions(&["read"]));

        let probed: RoleSet = [RoleId::new(1), RoleId::new(2)].into_iter().collect();
        assert_eq!(cache.lookup_role_set(&probed), Some(permissions(&["read"])));
    }

    #[test]
    fn expired_role_set_entry_counts_as_miss() {
        let cache = expired_cache();
        let key = role_set(&[1]);
        cache.store_role_set(&key, permissions(&["read"]));

        assert_eq!(cache.lookup_role_set(&key), None);
    }

    #[test]
    fn flush_roles_clears_every_registered_set_containing_the_role() {
        let cache = cache();
        let ab = role_set(&[1, 2]);
        let bc = role_set(&[2, 3]);
        let c = role_set(&[3]);
        cache.store_role_set(&ab, permissions(&["read"]));
        cache.store_role_set(&bc, permissions(&["write"]));
        cache.store_role_set(&c, permissions(&["admin"]));

        cache.flush_roles([RoleId::new(2)]);

        assert_eq!(cache.lookup_role_set(&ab), None);
        assert_eq!(cache.lookup_role_set(&bc), None);
        assert_eq!(cache.lookup_role_set(&c), Some(permissions(&["admin"])));
    }

    #[test]
    fn flush_roles_with_unregistered_role_is_a_no_op() {
        let cache = cache();
        let key = role_set(&[1]);
        cache.store_role_set(&key, permissions(&["read"]));

        cache.flush_roles([RoleId::new(42)]);

        assert_eq!(cache.lookup_role_set(&key), Some(permissions(&["read"])));
    }

    #[test]
    fn registrations_survive_flush_roles() {
        let cache = cache();
        let key = role_set(&[1]);
        cache.store_role_set(&key, permissions(&["read"]));

        cache.flush_roles([RoleId::new(1)]);
        cache.store_role_set(&key, permissions(&["write"]));
        cache.flush_roles([RoleId::new(1)]);

        assert_eq!(cache.lookup_role_set(&key), None);
    }

    #[test]
    fn register_without_store_still_drives_flush_roles() {
        let cache = cache();
        let key = role_set(&[1, 2]);
        cache.register_role_set(&key);
        cache.store_role_set(&key, permissions(&["read"]));

        cache.flush_roles([RoleId::new(1)]);

        assert_eq!(cache.lookup_role_set(&key), None);
    }

    #[test]
    fn flush_all_clears_both_maps_but_keeps_the_index() {
        let cache = cache();
        let key = role_set(&[1]);
        cache.store_user(UserId::new(1), permissions(&["read"]));
        cache.store_role_set(&key, permissions(&["write"]));

        cache.flush_all();

        assert_eq!(cache.lookup_user(UserId::new(1)), None);
        assert_eq!(cache.lookup_role_set(&key), None);

        // The index still knows about the set, so a repopulated entry can
        // be invalidated through it.
        cache.store_role_set(&key, permissions(&["write"]));
        cache.flush_roles([RoleId::new(1)]);
        assert_eq!(cache.lookup_role_set(&key), None);
    }
}
