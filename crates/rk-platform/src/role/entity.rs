//! Role Entity
//!
//! A role is identified by a unique name and a unique label and may
//! reference other roles as sub-roles, one level per link.

use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role document as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    /// Globally unique name
    pub name: String,

    /// Globally unique label
    pub label: String,

    /// Direct sub-role references, in insertion order. May reference roles
    /// that were deleted after being linked.
    #[serde(default)]
    pub sub_roles: Vec<ObjectId>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// New role with a freshly minted id and no sub-roles.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            name: name.into(),
            label: label.into(),
            sub_roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_sub_role(&self, sub_role_id: &ObjectId) -> bool {
        self.sub_roles.contains(sub_role_id)
    }

    /// Append `sub_role_id` unless already present. Returns whether it was added.
    pub fn add_sub_role(&mut self, sub_role_id: ObjectId) -> bool {
        if self.has_sub_role(&sub_role_id) {
            return false;
        }
        self.sub_roles.push(sub_role_id);
        self.updated_at = Utc::now();
        true
    }

    /// Remove `sub_role_id` if present. Returns whether it was removed.
    pub fn remove_sub_role(&mut self, sub_role_id: &ObjectId) -> bool {
        let before = self.sub_roles.len();
        self.sub_roles.retain(|id| id != sub_role_id);
        let removed = self.sub_roles.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}

/// Boundary representation of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleObject {
    pub role_id: String,
    pub name: String,
    pub label: String,
    /// Sub-role ids as stored, not expanded
    pub sub_roles: Vec<String>,
}

impl From<Role> for RoleObject {
    fn from(r: Role) -> Self {
        Self {
            role_id: r.id.to_hex(),
            name: r.name,
            label: r.label,
            sub_roles: r.sub_roles.iter().map(|id| id.to_hex()).collect(),
        }
    }
}

/// Parse a boundary role id. Anything that is not a 24-char hex ObjectId
/// cannot name a stored role.
pub fn parse_role_id(value: &str) -> Option<ObjectId> {
    ObjectId::parse_str(value.trim()).ok()
}
