//! In-memory Role Repository
//!
//! Process-local store with the same uniqueness and conditional-update
//! semantics as the MongoDB repository.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::role::entity::Role;
use crate::role::repository::RoleRepository;
use crate::shared::error::{PlatformError, Result};

#[derive(Default)]
pub struct InMemoryRoleRepository {
    roles: RwLock<Vec<Role>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Unique-index check over every role except `skip`.
fn check_unique(roles: &[Role], candidate: &Role, skip: Option<&ObjectId>) -> Result<()> {
    for existing in roles.iter().filter(|r| Some(&r.id) != skip) {
        if existing.name == candidate.name {
            return Err(PlatformError::duplicate_key("name", &candidate.name));
        }
        if existing.label == candidate.label {
            return Err(PlatformError::duplicate_key("label", &candidate.label));
        }
    }
    Ok(())
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn insert(&self, role: Role) -> Result<Role> {
        let mut roles = self.roles.write().await;
        if roles.iter().any(|r| r.id == role.id) {
            return Err(PlatformError::duplicate_key("_id", role.id.to_hex()));
        }
        check_unique(&roles, &role, None)?;
        roles.push(role.clone());
        Ok(role)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.iter().find(|r| &r.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.iter().find(|r| r.name == name).cloned())
    }

    async fn find_by_label(&self, label: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.iter().find(|r| r.label == label).cloned())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.roles.read().await.len() as u64)
    }

    async fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<Role>> {
        let roles = self.roles.read().await;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(roles.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn save(&self, role: Role) -> Result<Role> {
        let mut roles = self.roles.write().await;
        check_unique(&roles, &role, Some(&role.id))?;
        let slot = roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| PlatformError::not_found("Role not found."))?;
        *slot = role.clone();
        Ok(role)
    }

    async fn update_info(
        &self,
        id: &ObjectId,
        name: Option<&str>,
        label: Option<&str>,
    ) -> Result<Option<Role>> {
        let mut roles = self.roles.write().await;
        let Some(index) = roles.iter().position(|r| &r.id == id) else {
            return Ok(None);
        };

        let mut candidate = roles[index].clone();
        if let Some(name) = name {
            candidate.name = name.to_string();
        }
        if let Some(label) = label {
            candidate.label = label.to_string();
        }
        candidate.updated_at = Utc::now();
        check_unique(&roles, &candidate, Some(id))?;

        roles[index] = candidate.clone();
        Ok(Some(candidate))
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<bool> {
        let mut roles = self.roles.write().await;
        let before = roles.len();
        roles.retain(|r| &r.id != id);
        Ok(roles.len() != before)
    }

    async fn add_sub_role(&self, parent: &ObjectId, sub: &ObjectId) -> Result<Option<Role>> {
        let mut roles = self.roles.write().await;
        Ok(roles
            .iter_mut()
            .find(|r| &r.id == parent)
            .filter(|r| !r.has_sub_role(sub))
            .map(|r| {
                r.add_sub_role(*sub);
                r.clone()
            }))
    }

    async fn remove_sub_role(&self, parent: &ObjectId, sub: &ObjectId) -> Result<Option<Role>> {
        let mut roles = self.roles.write().await;
        Ok(roles
            .iter_mut()
            .find(|r| &r.id == parent)
            .filter(|r| r.has_sub_role(sub))
            .map(|r| {
                r.remove_sub_role(sub);
                r.clone()
            }))
    }

    async fn remove_sub_role_everywhere(&self, sub: &ObjectId) -> Result<u64> {
        let mut roles = self.roles.write().await;
        let now = Utc::now();
        let mut touched = 0;
        for role in roles.iter_mut().filter(|r| r.has_sub_role(sub)) {
            role.sub_roles.retain(|id| id != sub);
            role.updated_at = now;
            touched += 1;
        }
        Ok(touched)
    }
}
