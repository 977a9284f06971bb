use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use rolemap_core::model::{
    PermissionId, RoleId, RolePermissionRow, RoleSet, RowId, UserId, UserPermissionRow,
    UserRoleRow,
};
use rolemap_core::resolver::{AssignmentReader, QueryError};

use crate::catalog::{NewPermission, Permission, Role, User};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("user with email '{0}' already exists")]
    DuplicateUserEmail(String),

    #[error("role named '{0}' already exists")]
    DuplicateRoleName(String),

    #[error("permission named '{0}' already exists")]
    DuplicatePermissionName(String),

    #[error("user {0} already holds permission {1}")]
    DuplicateUserPermission(UserId, PermissionId),

    #[error("user {0} is already a member of role {1}")]
    DuplicateUserRole(UserId, RoleId),

    #[error("role {0} is already granted permission {1}")]
    DuplicateRolePermission(RoleId, PermissionId),

    #[error("unknown user id {0}")]
    UnknownUser(UserId),

    #[error("unknown role id {0}")]
    UnknownRole(RoleId),

    #[error("unknown permission id {0}")]
    UnknownPermission(PermissionId),

    #[error("no assignment row with id {0}")]
    UnknownRow(RowId),
}

#[derive(Debug, Default)]
struct Tables {
    next_user_id: i32,
    next_role_id: i32,
    next_permission_id: i32,
    next_row_id: i32,
    users: Vec<User>,
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    user_permissions: Vec<UserPermissionRow>,
    user_roles: Vec<UserRoleRow>,
    role_permissions: Vec<RolePermissionRow>,
}

impl Tables {
    fn next_row_id(&mut self) -> RowId {
        self.next_row_id += 1;
        RowId::new(self.next_row_id)
    }

    fn check_user(&self, user_id: UserId) -> Result<(), StoreError> {
        if self.users.iter().any(|u| u.id == user_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownUser(user_id))
        }
    }

    fn check_role(&self, role_id: RoleId) -> Result<(), StoreError> {
        if self.roles.iter().any(|r| r.id == role_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownRole(role_id))
        }
    }

    fn check_permission(&self, permission_id: PermissionId) -> Result<(), StoreError> {
        if self.permissions.iter().any(|p| p.id == permission_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownPermission(permission_id))
        }
    }

    fn permission_name(&self, permission_id: PermissionId) -> Option<String> {
        self.permissions
            .iter()
            .find(|p| p.id == permission_id)
            .map(|p| p.name.clone())
    }
}

/// In-memory assignment directory: the entity catalog plus the three
/// junction tables, with the same uniqueness rules a relational backend
/// would enforce. Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssignmentStore {
    state: Arc<Mutex<Tables>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(
        &self,
        email: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Result<User, StoreError> {
        let email = email.into();
        let mut tables = self.state.lock().unwrap();

        if tables.users.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateUserEmail(email));
        }

        tables.next_user_id += 1;
        let user = User {
            id: UserId::new(tables.next_user_id),
            email,
            full_name: full_name.into(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    pub fn insert_role(&self, name: impl Into<String>) -> Result<Role, StoreError> {
        let name = name.into();
        let mut tables = self.state.lock().unwrap();

        if tables.roles.iter().any(|r| r.name == name) {
            return Err(StoreError::DuplicateRoleName(name));
        }

        tables.next_role_id += 1;
        let role = Role {
            id: RoleId::new(tables.next_role_id),
            name,
        };
        tables.roles.push(role.clone());
        Ok(role)
    }

    pub fn insert_permission(&self, draft: NewPermission) -> Result<Permission, StoreError> {
        let mut tables = self.state.lock().unwrap();

        if tables.permissions.iter().any(|p| p.name == draft.name) {
            return Err(StoreError::DuplicatePermissionName(draft.name));
        }

        tables.next_permission_id += 1;
        let permission = Permission {
            id: PermissionId::new(tables.next_permission_id),
            name: draft.name,
            description: draft.description,
            object_type: draft.object_type,
            object_label: draft.object_label,
        };
        tables.permissions.push(permission.clone());
        Ok(permission)
    }

    pub fn insert_user_permissions(
        &self,
        grants: &[(UserId, PermissionId)],
    ) -> Result<Vec<UserPermissionRow>, StoreError> {
        let mut tables = self.state.lock().unwrap();

        for (i, (user_id, permission_id)) in grants.iter().enumerate() {
            tables.check_user(*user_id)?;
            tables.check_permission(*permission_id)?;
            let duplicate_in_store = tables
                .user_permissions
                .iter()
                .any(|row| row.user_id == *user_id && row.permission_id == *permission_id);
            let duplicate_in_batch = grants[..i].contains(&(*user_id, *permission_id));
            if duplicate_in_store || duplicate_in_batch {
                return Err(StoreError::DuplicateUserPermission(*user_id, *permission_id));
            }
        }

        let rows: Vec<UserPermissionRow> = grants
            .iter()
            .map(|(user_id, permission_id)| {
                let id = tables.next_row_id();
                UserPermissionRow::new(id, *user_id, *permission_id)
            })
            .collect();
        tables.user_permissions.extend(rows.iter().cloned());
        Ok(rows)
    }

    pub fn update_user_permission(
        &self,
        id: RowId,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> Result<(UserPermissionRow, UserPermissionRow), StoreError> {
        let mut tables = self.state.lock().unwrap();
        tables.check_user(user_id)?;
        tables.check_permission(permission_id)?;

        let conflict = tables.user_permissions.iter().any(|row| {
            row.id != id && row.user_id == user_id && row.permission_id == permission_id
        });
        if conflict {
            return Err(StoreError::DuplicateUserPermission(user_id, permission_id));
        }

        let row = tables
            .user_permissions
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::UnknownRow(id))?;

        let old = row.clone();
        row.user_id = user_id;
        row.permission_id = permission_id;
        Ok((row.clone(), old))
    }

    pub fn delete_user_permission(&self, id: RowId) -> Result<UserPermissionRow, StoreError> {
        let mut tables = self.state.lock().unwrap();
        let index = tables
            .user_permissions
            .iter()
            .position(|row| row.id == id)
            .ok_or(StoreError::UnknownRow(id))?;
        Ok(tables.user_permissions.remove(index))
    }

    pub fn insert_user_roles(
        &self,
        memberships: &[(UserId, RoleId)],
    ) -> Result<Vec<UserRoleRow>, StoreError> {
        let mut tables = self.state.lock().unwrap();

        for (i, (user_id, role_id)) in memberships.iter().enumerate() {
            tables.check_user(*user_id)?;
            tables.check_role(*role_id)?;
            let duplicate_in_store = tables
                .user_roles
                .iter()
                .any(|row| row.user_id == *user_id && row.role_id == *role_id);
            let duplicate_in_batch = memberships[..i].contains(&(*user_id, *role_id));
            if duplicate_in_store || duplicate_in_batch {
                return Err(StoreError::DuplicateUserRole(*user_id, *role_id));
            }
        }

        let rows: Vec<UserRoleRow> = memberships
            .iter()
            .map(|(user_id, role_id)| {
                let id = tables.next_row_id();
                UserRoleRow::new(id, *user_id, *role_id)
            })
            .collect();
        tables.user_roles.extend(rows.iter().cloned());
        Ok(rows)
    }

    pub fn update_user_role(
        &self,
        id: RowId,
        user_id: UserId,
        role_id: RoleId,
    ) -> Result<(UserRoleRow, UserRoleRow), StoreError> {
        let mut tables = self.state.lock().unwrap();
        tables.check_user(user_id)?;
        tables.check_role(role_id)?;

        let conflict = tables
            .user_roles
            .iter()
            .any(|row| row.id != id && row.user_id == user_id && row.role_id == role_id);
        if conflict {
            return Err(StoreError::DuplicateUserRole(user_id, role_id));
        }

        let row = tables
            .user_roles
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::UnknownRow(id))?;

        let old = row.clone();
        row.user_id = user_id;
        row.role_id = role_id;
        Ok((row.clone(), old))
    }

    pub fn delete_user_role(&self, id: RowId) -> Result<UserRoleRow, StoreError> {
        let mut tables = self.state.lock().unwrap();
        let index = tables
            .user_roles
            .iter()
            .position(|row| row.id == id)
            .ok_or(StoreError::UnknownRow(id))?;
        Ok(tables.user_roles.remove(index))
    }

    pub fn insert_role_permissions(
        &self,
        grants: &[(RoleId, PermissionId)],
    ) -> Result<Vec<RolePermissionRow>, StoreError> {
        let mut tables = self.state.lock().unwrap();

        for (i, (role_id, permission_id)) in grants.iter().enumerate() {
            tables.check_role(*role_id)?;
            tables.check_permission(*permission_id)?;
            let duplicate_in_store = tables
                .role_permissions
                .iter()
                .any(|row| row.role_id == *role_id && row.permission_id == *permission_id);
            let duplicate_in_batch = grants[..i].contains(&(*role_id, *permission_id));
            if duplicate_in_store || duplicate_in_batch {
                return Err(StoreError::DuplicateRolePermission(*role_id, *permission_id));
            }
        }

        let rows: Vec<RolePermissionRow> = grants
            .iter()
            .map(|(role_id, permission_id)| {
                let id = tables.next_row_id();
                RolePermissionRow::new(id, *role_id, *permission_id)
            })
            .collect();
        tables.role_permissions.extend(rows.iter().cloned());
        Ok(rows)
    }

    pub fn update_role_permission(
        &self,
        id: RowId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<(RolePermissionRow, RolePermissionRow), StoreError> {
        let mut tables = self.state.lock().unwrap();
        tables.check_role(role_id)?;
        tables.check_permission(permission_id)?;

        let conflict = tables.role_permissions.iter().any(|row| {
            row.id != id && row.role_id == role_id && row.permission_id == permission_id
        });
        if conflict {
            return Err(StoreError::DuplicateRolePermission(role_id, permission_id));
        }

        let row = tables
            .role_permissions
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::UnknownRow(id))?;

        let old = row.clone();
        row.role_id = role_id;
        row.permission_id = permission_id;
        Ok((row.clone(), old))
    }

    pub fn delete_role_permission(&self, id: RowId) -> Result<RolePermissionRow, StoreError> {
        let mut tables = self.state.lock().unwrap();
        let index = tables
            .role_permissions
            .iter()
            .position(|row| row.id == id)
            .ok_or(StoreError::UnknownRow(id))?;
        Ok(tables.role_permissions.remove(index))
    }
}

impl AssignmentReader for InMemoryAssignmentStore {
    async fn role_permission_names_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<String>, QueryError> {
        let tables = self.state.lock().unwrap();
        let role_ids: BTreeSet<RoleId> = tables
            .user_roles
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.role_id)
            .collect();

        Ok(tables
            .role_permissions
            .iter()
            .filter(|row| role_ids.contains(&row.role_id))
            .filter_map(|row| tables.permission_name(row.permission_id))
            .collect())
    }

    async fn direct_permission_names_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<String>, QueryError> {
        let tables = self.state.lock().unwrap();
        Ok(tables
            .user_permissions
            .iter()
            .filter(|row| row.user_id == user_id)
            .filter_map(|row| tables.permission_name(row.permission_id))
            .collect())
    }

    async fn permission_names_for_roles(
        &self,
        role_ids: &RoleSet,
    ) -> Result<Vec<String>, QueryError> {
        let tables = self.state.lock().unwrap();
        Ok(tables
            .role_permissions
            .iter()
            .filter(|row| role_ids.contains(&row.role_id))
            .filter_map(|row| tables.permission_name(row.permission_id))
            .collect())
    }

    async fn user_ids_holding_roles(
        &self,
        role_ids: &BTreeSet<RoleId>,
    ) -> Result<Vec<UserId>, QueryError> {
        let tables = self.state.lock().unwrap();
        Ok(tables
            .user_roles
            .iter()
            .filter(|row| role_ids.contains(&row.role_id))
            .map(|row| row.user_id)
            .collect())
    }
}
