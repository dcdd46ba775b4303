//! Rolekeeper Platform
//!
//! Role management: hierarchical roles identified by a unique name and a
//! unique label, composed of sub-roles, stored in MongoDB.
//!
//! - [`role`]: entity, repository (MongoDB and in-memory), service and REST API
//! - [`shared`]: errors, common API types, index creation and health probes

pub mod role;
pub mod router;
pub mod shared;

pub use role::{
    InMemoryRoleRepository, MongoRoleRepository, Role, RoleObject, RoleRepository, RoleService,
    RoleServiceConfig, RolesState, UniquenessCheck,
};
pub use router::platform_router;
pub use shared::error::{PlatformError, Result};
pub use shared::health_api::HealthState;
