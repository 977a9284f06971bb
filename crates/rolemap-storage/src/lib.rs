pub mod catalog;
pub mod memory;
pub mod pipeline;

pub use catalog::{NewPermission, Permission, PermissionObjectType, Role, User};
pub use memory::{InMemoryAssignmentStore, StoreError};
pub use pipeline::{AssignmentPipeline, PipelineError};
