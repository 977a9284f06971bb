pub mod cache;
pub mod invalidation;
pub mod model;
pub mod resolver;
pub mod service;

pub use cache::{CacheConfig, PermissionCache};
pub use invalidation::{AssignmentHooks, InvalidationCoordinator, InvalidationError};
pub use model::{
    PermissionId, PermissionSet, RoleId, RolePermissionRow, RoleSet, RowChange, RowId, UserId,
    UserPermissionRow, UserRoleRow,
};
pub use resolver::{AssignmentReader, EffectivePermissionResolver, QueryError};
pub use service::{PermissionService, ResolveError};
