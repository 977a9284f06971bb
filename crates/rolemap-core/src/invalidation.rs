use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use crate::cache::PermissionCache;
use crate::model::{RoleId, RolePermissionRow, RowChange, UserId, UserPermissionRow, UserRoleRow};
use crate::resolver::{AssignmentReader, QueryError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidationError {
    #[error(
        "could not resolve users holding roles [{}]: {source}",
        format_role_ids(.role_ids)
    )]
    UsersForRoles {
        role_ids: BTreeSet<RoleId>,
        #[source]
        source: QueryError,
    },
}

fn format_role_ids(role_ids: &BTreeSet<RoleId>) -> String {
    role_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Post-commit hook points, one per junction kind. Inserts and deletes
/// arrive with `previous: None`; updates carry the prior row values.
pub trait AssignmentHooks: Send + Sync {
    fn user_permissions_changed(
        &self,
        change: &RowChange<UserPermissionRow>,
    ) -> impl Future<Output = Result<(), InvalidationError>> + Send;

    fn user_roles_changed(
        &self,
        change: &RowChange<UserRoleRow>,
    ) -> impl Future<Output = Result<(), InvalidationError>> + Send;

    fn role_permissions_changed(
        &self,
        change: &RowChange<RolePermissionRow>,
    ) -> impl Future<Output = Result<(), InvalidationError>> + Send;
}

fn collect_ids<R, T, F>(change: &RowChange<R>, key: F) -> BTreeSet<T>
where
    T: Ord,
    F: Fn(&R) -> T,
{
    let mut ids: BTreeSet<T> = change.rows.iter().map(&key).collect();
    if let Some(previous) = &change.previous {
        ids.extend(previous.iter().map(&key));
    }
    ids
}

/// User ids touched by a user-permission change: every new-state row's
/// user, plus the prior user of any updated row (a grant reassigned away
/// from a user must invalidate that user too).
pub fn affected_user_ids_for_user_permissions(
    change: &RowChange<UserPermissionRow>,
) -> BTreeSet<UserId> {
    collect_ids(change, |row| row.user_id)
}

pub fn affected_user_ids_for_user_roles(change: &RowChange<UserRoleRow>) -> BTreeSet<UserId> {
    collect_ids(change, |row| row.user_id)
}

pub fn affected_role_ids_for_role_permissions(
    change: &RowChange<RolePermissionRow>,
) -> BTreeSet<RoleId> {
    collect_ids(change, |row| row.role_id)
}

/// Translates committed junction changes into cache flushes. Runs inline
/// with the triggering mutation, so a read issued after the mutation
/// returns never sees a stale entry.
pub struct InvalidationCoordinator<R: AssignmentReader> {
    reader: Arc<R>,
    cache: Arc<PermissionCache>,
}

impl<R: AssignmentReader> InvalidationCoordinator<R> {
    pub fn new(reader: Arc<R>, cache: Arc<PermissionCache>) -> Self {
        Self { reader, cache }
    }
}

impl<R: AssignmentReader> AssignmentHooks for InvalidationCoordinator<R> {
    async fn user_permissions_changed(
        &self,
        change: &RowChange<UserPermissionRow>,
    ) -> Result<(), InvalidationError> {
        let user_ids = affected_user_ids_for_user_permissions(change);
        tracing::debug!(
            users = user_ids.len(),
            "invalidating after user-permission change"
        );
        self.cache.flush_users(user_ids);
        Ok(())
    }

    async fn user_roles_changed(
        &self,
        change: &RowChange<UserRoleRow>,
    ) -> Result<(), InvalidationError> {
        // Role-set entries are keyed purely by role combination, so only
        // the per-user cache is affected by membership changes.
        let user_ids = affected_user_ids_for_user_roles(change);
        tracing::debug!(users = user_ids.len(), "invalidating after user-role change");
        self.cache.flush_users(user_ids);
        Ok(())
    }

    async fn role_permissions_changed(
        &self,
        change: &RowChange<RolePermissionRow>,
    ) -> Result<(), InvalidationError> {
        let role_ids = affected_role_ids_for_role_permissions(change);
        if role_ids.is_empty() {
            return Ok(());
        }

        self.cache.flush_roles(role_ids.iter().copied());

        // A change to what a role grants must reach every user holding
        // that role, not just the cached role-set entries.
        let user_ids = self
            .reader
            .user_ids_holding_roles(&role_ids)
            .await
            .map_err(|source| InvalidationError::UsersForRoles {
                role_ids: role_ids.clone(),
                source,
            })?;

        tracing::debug!(
            roles = role_ids.len(),
            users = user_ids.len(),
            "invalidating after role-permission change"
        );
        self.cache.flush_users(user_ids);
        Ok(())
    }
}
