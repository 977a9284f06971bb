use rolemap_core::invalidation::{AssignmentHooks, InvalidationError};
use rolemap_core::model::{
    PermissionId, RoleId, RolePermissionRow, RowChange, RowId, UserId, UserPermissionRow,
    UserRoleRow,
};

use crate::memory::{InMemoryAssignmentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache invalidation failed: {0}")]
    Invalidation(#[from] InvalidationError),
}

/// The mutation side of the assignment directory. Every operation commits
/// to the store, then synchronously awaits the registered hooks before
/// returning, so a caller that reads after a mutation returns never sees a
/// stale cache entry. A hook failure fails the mutation's post-processing
/// and surfaces to the caller.
pub struct AssignmentPipeline<H: AssignmentHooks> {
    store: InMemoryAssignmentStore,
    hooks: H,
}

impl<H: AssignmentHooks> AssignmentPipeline<H> {
    pub fn new(store: InMemoryAssignmentStore, hooks: H) -> Self {
        Self { store, hooks }
    }

    pub fn store(&self) -> &InMemoryAssignmentStore {
        &self.store
    }

    pub async fn insert_user_permissions(
        &self,
        grants: &[(UserId, PermissionId)],
    ) -> Result<Vec<UserPermissionRow>, PipelineError> {
        let rows = self.store.insert_user_permissions(grants)?;
        self.hooks
            .user_permissions_changed(&RowChange::committed(rows.clone()))
            .await?;
        Ok(rows)
    }

    pub async fn update_user_permission(
        &self,
        id: RowId,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> Result<UserPermissionRow, PipelineError> {
        let (row, old) = self.store.update_user_permission(id, user_id, permission_id)?;
        self.hooks
            .user_permissions_changed(&RowChange::updated(vec![row.clone()], vec![old]))
            .await?;
        Ok(row)
    }

    pub async fn delete_user_permission(
        &self,
        id: RowId,
    ) -> Result<UserPermissionRow, PipelineError> {
        let row = self.store.delete_user_permission(id)?;
        self.hooks
            .user_permissions_changed(&RowChange::committed(vec![row.clone()]))
            .await?;
        Ok(row)
    }

    pub async fn insert_user_roles(
        &self,
        memberships: &[(UserId, RoleId)],
    ) -> Result<Vec<UserRoleRow>, PipelineError> {
        let rows = self.store.insert_user_roles(memberships)?;
        self.hooks
            .user_roles_changed(&RowChange::committed(rows.clone()))
            .await?;
        Ok(rows)
    }

    pub async fn update_user_role(
        &self,
        id: RowId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<UserRoleRow, PipelineError> {
        let (row, old) = self.store.update_user_role(id, user_id, role_id)?;
        self.hooks
            .user_roles_changed(&RowChange::updated(vec![row.clone()], vec![old]))
            .await?;
        Ok(row)
    }

    pub async fn delete_user_role(&self, id: RowId) -> Result<UserRoleRow, PipelineError> {
        let row = self.store.delete_user_role(id)?;
        self.hooks
            .user_roles_changed(&RowChange::committed(vec![row.clone()]))
            .await?;
        Ok(row)
    }

    pub async fn insert_role_permissions(
        &self,
        grants: &[(RoleId, PermissionId)],
    ) -> Result<Vec<RolePermissionRow>, PipelineError> {
        let rows = self.store.insert_role_permissions(grants)?;
        self.hooks
            .role_permissions_changed(&RowChange::committed(rows.clone()))
            .await?;
        Ok(rows)
    }

    pub async fn update_role_permission(
        &self,
        id: RowId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<RolePermissionRow, PipelineError> {
        let (row, old) = self.store.update_role_permission(id, role_id, permission_id)?;
        self.hooks
            .role_permissions_changed(&RowChange::updated(vec![row.clone()], vec![old]))
            .await?;
        Ok(row)
    }

    pub async fn delete_role_permission(
        &self,
        id: RowId,
    ) -> Result<RolePermissionRow, PipelineError> {
        let row = self.store.delete_role_permission(id)?;
        self.hooks
            .role_permissions_changed(&RowChange::committed(vec![row.clone()]))
            .await?;
        Ok(row)
    }
}
