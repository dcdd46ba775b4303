//! Role Service
//!
//! Business rules over the role repository: input validation, uniqueness,
//! existence checks and sub-role membership.

use std::collections::{HashSet, VecDeque};
use std::str::FromStr;
use std::sync::Arc;

use bson::oid::ObjectId;
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::role::entity::{parse_role_id, Role, RoleObject};
use crate::role::repository::RoleRepository;
use crate::shared::error::{PlatformError, Result};

/// How name/label uniqueness is enforced on create and update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniquenessCheck {
    /// Query the store first and fail with a 409 when taken.
    #[default]
    PreCheck,
    /// Rely on the store's unique indexes; violations surface unclassified.
    StoreIndex,
}

impl FromStr for UniquenessCheck {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "precheck" => Ok(Self::PreCheck),
            "store" => Ok(Self::StoreIndex),
            other => Err(format!("unknown uniqueness check: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoleServiceConfig {
    pub uniqueness: UniquenessCheck,
    /// Pull a deleted role from every other role's sub-roles.
    pub cascade_delete: bool,
    /// Refuse sub-role links that would close a cycle.
    pub reject_cycles: bool,
}

/// One page of roles.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RolePage {
    pub roles: Vec<RoleObject>,
    pub page_count: u64,
}

/// Result of a delete.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRole {
    pub role_id: String,
}

pub struct RoleService {
    repo: Arc<dyn RoleRepository>,
    config: RoleServiceConfig,
}

/// Reject missing or whitespace-only required input.
fn require(value: &str) -> Result<&str> {
    if value.trim().is_empty() {
        Err(PlatformError::bad_arguments())
    } else {
        Ok(value)
    }
}

/// Optional input that is blank counts as not supplied.
fn supplied(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl RoleService {
    pub fn new(repo: Arc<dyn RoleRepository>, config: RoleServiceConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &RoleServiceConfig {
        &self.config
    }

    async fn load(&self, role_id: &str) -> Result<Option<Role>> {
        match parse_role_id(role_id) {
            Some(id) => self.repo.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn ensure_name_free(&self, name: &str) -> Result<()> {
        if self.repo.find_by_name(name).await?.is_some() {
            debug!(name = %name, "Role name already taken");
            return Err(PlatformError::conflict(format!("Role {} already exists", name)));
        }
        Ok(())
    }

    async fn ensure_label_free(&self, label: &str) -> Result<()> {
        if self.repo.find_by_label(label).await?.is_some() {
            debug!(label = %label, "Role label already taken");
            return Err(PlatformError::conflict(format!(
                "Role with label {} already exists",
                label
            )));
        }
        Ok(())
    }

    pub async fn create_role(&self, name: &str, label: &str) -> Result<RoleObject> {
        let name = require(name)?;
        let label = require(label)?;
        debug!(name = %name, label = %label, "Creating role");

        if self.config.uniqueness == UniquenessCheck::PreCheck {
            self.ensure_name_free(name).await?;
            self.ensure_label_free(label).await?;
        }

        let role = self.repo.insert(Role::new(name, label)).await?;
        info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role.into())
    }

    pub async fn get_role(&self, role_id: &str) -> Result<RoleObject> {
        let role_id = require(role_id)?;
        self.load(role_id)
            .await?
            .map(RoleObject::from)
            .ok_or_else(|| PlatformError::not_found("Role not found."))
    }

    pub async fn find_role_by_name(&self, name: &str) -> Result<RoleObject> {
        let name = require(name)?;
        self.repo
            .find_by_name(name)
            .await?
            .map(RoleObject::from)
            .ok_or_else(|| PlatformError::not_found("Could not find Role"))
    }

    pub async fn find_role_by_label(&self, label: &str) -> Result<RoleObject> {
        let label = require(label)?;
        self.repo
            .find_by_label(label)
            .await?
            .map(RoleObject::from)
            .ok_or_else(|| PlatformError::not_found("Could not find Role"))
    }

    /// List roles one page at a time. `page` is 1-based; the last page may be
    /// partial. A page whose offset is negative or at/after the end is rejected.
    pub async fn get_roles(&self, page: i64, per_page: i64) -> Result<RolePage> {
        if per_page < 1 {
            return Err(PlatformError::bad_arguments());
        }

        let out_of_bounds = || PlatformError::bad_request("Pagination out of bounds.");
        let count = self.repo.count().await?;
        let offset = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(per_page))
            .ok_or_else(out_of_bounds)?;
        let offset = u64::try_from(offset).map_err(|_| out_of_bounds())?;
        if offset >= count {
            debug!(page, per_page, count, "Requested page is out of bounds");
            return Err(out_of_bounds());
        }

        let per_page = per_page as u64;
        let roles = self.repo.find_page(offset, per_page).await?;
        Ok(RolePage {
            roles: roles.into_iter().map(RoleObject::from).collect(),
            page_count: count.div_ceil(per_page),
        })
    }

    pub async fn delete_role(&self, role_id: &str) -> Result<DeletedRole> {
        let role_id = require(role_id)?;
        let not_found = || PlatformError::not_found("Could not find role.");

        let role = self.load(role_id).await?.ok_or_else(not_found)?;
        if !self.repo.delete_by_id(&role.id).await? {
            return Err(not_found());
        }
        info!(role_id = %role.id, name = %role.name, "Role deleted");

        if self.config.cascade_delete {
            let touched = self.repo.remove_sub_role_everywhere(&role.id).await?;
            if touched > 0 {
                info!(role_id = %role.id, touched, "Removed deleted role from parent roles");
            }
        }

        Ok(DeletedRole { role_id: role.id.to_hex() })
    }

    /// Partial update: only supplied, non-blank fields are written and the
    /// sub-roles are never rewritten. When nothing changes the stored role is
    /// returned without a write.
    pub async fn update_role_informations(
        &self,
        role_id: &str,
        name: Option<&str>,
        label: Option<&str>,
    ) -> Result<RoleObject> {
        let role_id = require(role_id)?;
        let role = self
            .load(role_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Role not found."))?;

        let name = supplied(name).filter(|n| *n != role.name);
        let label = supplied(label).filter(|l| *l != role.label);
        if name.is_none() && label.is_none() {
            debug!(role_id = %role.id, "Role update changes nothing");
            return Ok(role.into());
        }

        if self.config.uniqueness == UniquenessCheck::PreCheck {
            if let Some(name) = name {
                self.ensure_name_free(name).await?;
            }
            if let Some(label) = label {
                self.ensure_label_free(label).await?;
            }
        }

        let role = self
            .repo
            .update_info(&role.id, name, label)
            .await?
            .ok_or_else(|| PlatformError::not_found("Role not found."))?;
        info!(role_id = %role.id, name = %role.name, "Role updated");
        Ok(role.into())
    }

    pub async fn add_sub_role_to_role(
        &self,
        parent_role_id: &str,
        sub_role_id: &str,
    ) -> Result<RoleObject> {
        let parent_role_id = require(parent_role_id)?;
        let sub_role_id = require(sub_role_id)?;

        let parent = self
            .load(parent_role_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Could not find parent role."))?;
        let sub = self
            .load(sub_role_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Could not find subRole."))?;

        if parent.has_sub_role(&sub.id) {
            return Err(PlatformError::bad_request("Role already in role."));
        }
        if self.config.reject_cycles && self.reaches(&sub.id, &parent.id).await? {
            warn!(role_id = %parent.id, sub_role_id = %sub.id, "Rejected sub-role that would create a cycle");
            return Err(PlatformError::bad_request(
                "Adding this sub-role would create a cycle.",
            ));
        }

        match self.repo.add_sub_role(&parent.id, &sub.id).await? {
            Some(updated) => {
                info!(role_id = %parent.id, sub_role_id = %sub.id, "Sub-role added");
                Ok(updated.into())
            }
            None => Err(self.classify_miss(&parent.id, "Role already in role.").await),
        }
    }

    pub async fn remove_sub_role_from_role(
        &self,
        parent_role_id: &str,
        sub_role_id: &str,
    ) -> Result<RoleObject> {
        let parent_role_id = require(parent_role_id)?;
        let sub_role_id = require(sub_role_id)?;

        let parent = self
            .load(parent_role_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Could not find parent role."))?;
        let sub = self
            .load(sub_role_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Could not find sub role."))?;

        if !parent.has_sub_role(&sub.id) {
            return Err(PlatformError::bad_request("Role not in role."));
        }

        match self.repo.remove_sub_role(&parent.id, &sub.id).await? {
            Some(updated) => {
                info!(role_id = %parent.id, sub_role_id = %sub.id, "Sub-role removed");
                Ok(updated.into())
            }
            None => Err(self.classify_miss(&parent.id, "Role not in role.").await),
        }
    }

    /// A conditional membership update matched nothing after the checks
    /// passed: either the parent vanished or a concurrent call got there first.
    async fn classify_miss(&self, parent: &ObjectId, membership_message: &str) -> PlatformError {
        match self.repo.find_by_id(parent).await {
            Ok(Some(_)) => PlatformError::bad_request(membership_message),
            Ok(None) => PlatformError::not_found("Could not find parent role."),
            Err(e) => e,
        }
    }

    /// Whether `target` is `from` or reachable from it through sub-role links.
    /// Dangling references are skipped.
    async fn reaches(&self, from: &ObjectId, target: &ObjectId) -> Result<bool> {
        let mut seen = HashSet::from([*from]);
        let mut queue = VecDeque::from([*from]);

        while let Some(id) = queue.pop_front() {
            if &id == target {
                return Ok(true);
            }
            let Some(role) = self.repo.find_by_id(&id).await? else {
                continue;
            };
            for next in role.sub_roles {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(false)
    }
}
