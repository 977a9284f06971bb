use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use crate::model::{PermissionSet, RoleId, RoleSet, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("assignment backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed assignment query: {0}")]
    Malformed(String),
}

/// The query capability the core consumes. Each method is a pure read of
/// current assignment state; returned sequences may contain duplicates.
pub trait AssignmentReader: Send + Sync {
    /// Permission names reachable via user-role membership: the join
    /// user-role (filtered to this user) -> role -> role-permission ->
    /// permission.
    fn role_permission_names_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<String>, QueryError>> + Send;

    /// Permission names granted directly: user-permission (filtered to
    /// this user) -> permission.
    fn direct_permission_names_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<String>, QueryError>> + Send;

    /// Permission names granted by any of the given roles: role-permission
    /// filtered by `role_id IN role_ids` -> permission.
    fn permission_names_for_roles(
        &self,
        role_ids: &RoleSet,
    ) -> impl Future<Output = Result<Vec<String>, QueryError>> + Send;

    /// User ids with a user-role row pointing at any of the given roles.
    fn user_ids_holding_roles(
        &self,
        role_ids: &BTreeSet<RoleId>,
    ) -> impl Future<Output = Result<Vec<UserId>, QueryError>> + Send;
}

pub struct EffectivePermissionResolver<R: AssignmentReader> {
    reader: Arc<R>,
}

impl<R: AssignmentReader> EffectivePermissionResolver<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    pub async fn resolve_for_user(&self, user_id: UserId) -> Result<PermissionSet, QueryError> {
        let mut permissions: PermissionSet = self
            .reader
            .role_permission_names_for_user(user_id)
            .await?
            .into_iter()
            .collect();

        permissions.extend(self.reader.direct_permission_names_for_user(user_id).await?);

        Ok(permissions)
    }

    pub async fn resolve_for_role_set(
        &self,
        role_ids: &RoleSet,
    ) -> Result<PermissionSet, QueryError> {
        Ok(self
            .reader
            .permission_names_for_roles(role_ids)
            .await?
            .into_iter()
            .collect())
    }
}
