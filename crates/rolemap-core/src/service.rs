use std::sync::Arc;

use crate::cache::{CacheConfig, PermissionCache};
use crate::model::{PermissionSet, RoleId, RoleSet, UserId};
use crate::resolver::{AssignmentReader, EffectivePermissionResolver, QueryError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("could not get effective permissions for user with id {user_id}: {source}")]
    User {
        user_id: UserId,
        #[source]
        source: QueryError,
    },

    #[error(
        "could not get effective permissions for role ids [{}]: {source}",
        format_role_set(.role_ids)
    )]
    Roles {
        role_ids: RoleSet,
        #[source]
        source: QueryError,
    },
}

fn format_role_set(role_ids: &RoleSet) -> String {
    role_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The exposed resolution surface: memoized effective-permission lookups
/// plus explicit flush operations. One instance per process, shared by
/// reference; construct it once and hand the same `Arc`ed reader to the
/// invalidation coordinator.
pub struct PermissionService<R: AssignmentReader> {
    resolver: EffectivePermissionResolver<R>,
    cache: Arc<PermissionCache>,
}

impl<R: AssignmentReader> PermissionService<R> {
    pub fn new(reader: Arc<R>, config: CacheConfig) -> Self {
        Self {
            resolver: EffectivePermissionResolver::new(reader),
            cache: Arc::new(PermissionCache::new(config)),
        }
    }

    /// The cache handle, for wiring an `InvalidationCoordinator` against
    /// the same instance this service populates.
    pub fn cache(&self) -> Arc<PermissionCache> {
        Arc::clone(&self.cache)
    }

    pub async fn effective_permissions_for_user(
        &self,
        user_id: Option<UserId>,
    ) -> Result<PermissionSet, ResolveError> {
        let Some(user_id) = user_id else {
            return Ok(PermissionSet::new());
        };

        if let Some(hit) = self.cache.lookup_user(user_id) {
            return Ok(hit);
        }

        tracing::debug!(user_id = %user_id, "user cache miss, resolving");
        let permissions = self
            .resolver
            .resolve_for_user(user_id)
            .await
            .map_err(|source| ResolveError::User { user_id, source })?;

        self.cache.store_user(user_id, permissions.clone());
        Ok(permissions)
    }

    pub async fn effective_permissions_for_roles(
        &self,
        role_ids: &RoleSet,
    ) -> Result<PermissionSet, ResolveError> {
        if role_ids.is_empty() {
            return Ok(PermissionSet::new());
        }

        if let Some(hit) = self.cache.lookup_role_set(role_ids) {
            return Ok(hit);
        }

        // Register before resolving: a failed resolution must still leave
        // the dependency-index entry behind.
        self.cache.register_role_set(role_ids);

        tracing::debug!(roles = role_ids.len(), "role-set cache miss, resolving");
        let permissions = self
            .resolver
            .resolve_for_role_set(role_ids)
            .await
            .map_err(|source| ResolveError::Roles {
                role_ids: role_ids.clone(),
                source,
            })?;

        self.cache.store_role_set(role_ids, permissions.clone());
        Ok(permissions)
    }

    pub fn flush_for_user(&self, user_id: UserId) {
        self.cache.flush_user(user_id);
    }

    pub fn flush_for_users<I>(&self, user_ids: I)
    where
        I: IntoIterator<Item = UserId>,
    {
        self.cache.flush_users(user_ids);
    }

    pub fn flush_for_roles<I>(&self, role_ids: I)
    where
        I: IntoIterator<Item = RoleId>,
    {
        self.cache.flush_roles(role_ids);
    }

    pub fn flush_all(&self) {
        self.cache.flush_all();
    }
}
