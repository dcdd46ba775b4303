//! Role Aggregate
//!
//! Roles with unique name/label and one-level sub-role composition.

pub mod api;
pub mod entity;
pub mod in_memory_repository;
pub mod repository;
pub mod service;

pub use api::{roles_router, RolesState};
pub use entity::{Role, RoleObject};
pub use in_memory_repository::InMemoryRoleRepository;
pub use repository::{MongoRoleRepository, RoleRepository};
pub use service::{DeletedRole, RolePage, RoleService, RoleServiceConfig, UniquenessCheck};
