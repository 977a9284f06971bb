use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(i32);

impl UserId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoleId(i32);

impl RoleId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for RoleId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionId(i32);

impl PermissionId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for PermissionId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(i32);

impl RowId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl From<i32> for RowId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical role-id-set key: a `BTreeSet` is sorted and deduplicated, so
/// equality and hashing are structural and order-independent.
pub type RoleSet = BTreeSet<RoleId>;

pub type PermissionSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPermissionRow {
    pub id: RowId,
    pub user_id: UserId,
    pub permission_id: PermissionId,
}

impl UserPermissionRow {
    pub fn new(id: RowId, user_id: UserId, permission_id: PermissionId) -> Self {
        Self {
            id,
            user_id,
            permission_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRoleRow {
    pub id: RowId,
    pub user_id: UserId,
    pub role_id: RoleId,
}

impl UserRoleRow {
    pub fn new(id: RowId, user_id: UserId, role_id: RoleId) -> Self {
        Self {
            id,
            user_id,
            role_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionRow {
    pub id: RowId,
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

impl RolePermissionRow {
    pub fn new(id: RowId, role_id: RoleId, permission_id: PermissionId) -> Self {
        Self {
            id,
            role_id,
            permission_id,
        }
    }
}

/// A batch of committed junction rows handed to a post-commit hook.
///
/// `rows` holds new-state rows (for deletes, the rows as they existed
/// before removal). `previous` is set only for updates and carries the
/// prior values of the same rows, so a hook can see both sides of a
/// reassignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange<R> {
    pub rows: Vec<R>,
    pub previous: Option<Vec<R>>,
}

impl<R> RowChange<R> {
    pub fn committed(rows: Vec<R>) -> Self {
        Self {
            rows,
            previous: None,
        }
    }

    pub fn updated(rows: Vec<R>, previous: Vec<R>) -> Self {
        Self {
            rows,
            previous: Some(previous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_set_equality_is_order_independent() {
        let a: RoleSet = [RoleId::new(3), RoleId::new(1), RoleId::new(2)]
            .into_iter()
            .collect();
        let b: RoleSet = [RoleId::new(2), RoleId::new(3), RoleId::new(1)]
            .into_iter()
            .collect();

        assert_eq!(a, b);
    }

    #[test]
    fn role_set_collapses_duplicate_members() {
        let a: RoleSet = [RoleId::new(1), RoleId::new(1), RoleId::new(2)]
            .into_iter()
            .collect();

        assert_eq!(a.len(), 2);
    }

    #[test]
    fn ids_display_as_bare_integers() {
        assert_eq!(UserId::new(42).to_string(), "42");
        assert_eq!(RoleId::new(7).to_string(), "7");
        assert_eq!(PermissionId::new(9).to_string(), "9");
        assert_eq!(RowId::new(1).to_string(), "1");
    }

    #[test]
    fn row_change_updated_carries_previous_rows() {
        let row = UserPermissionRow::new(RowId::new(1), UserId::new(1), PermissionId::new(2));
        let old = UserPermissionRow::new(RowId::new(1), UserId::new(9), PermissionId::new(2));

        let change = RowChange::updated(vec![row.clone()], vec![old.clone()]);

        assert_eq!(change.rows, vec![row]);
        assert_eq!(change.previous, Some(vec![old]));
    }
}
