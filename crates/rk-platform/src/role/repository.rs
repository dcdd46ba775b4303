//! Role Repository
//!
//! Persistence boundary for roles. No business rules live here, only store
//! access and translation of store failures into [`PlatformError`].

use async_trait::async_trait;
use bson::oid::ObjectId;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ReturnDocument;
use mongodb::{
    bson::{doc, Document},
    Collection, Database,
};
use tracing::info;

use crate::role::entity::Role;
use crate::shared::error::{PlatformError, Result};

/// MongoDB server code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Persist a new role. Fails with `DuplicateKey` when name or label is taken.
    async fn insert(&self, role: Role) -> Result<Role>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn find_by_label(&self, label: &str) -> Result<Option<Role>>;

    /// Total number of stored roles.
    async fn count(&self) -> Result<u64>;

    /// Roles in insertion order, skipping `offset` and returning at most `limit`.
    async fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<Role>>;

    /// Persist changes to an already loaded role.
    async fn save(&self, role: Role) -> Result<Role>;

    /// Set only the supplied name and/or label, leaving sub-roles untouched.
    /// Returns the updated role, or `None` when it does not exist.
    async fn update_info(
        &self,
        id: &ObjectId,
        name: Option<&str>,
        label: Option<&str>,
    ) -> Result<Option<Role>>;

    /// Returns true if a role was removed.
    async fn delete_by_id(&self, id: &ObjectId) -> Result<bool>;

    /// Append `sub` to `parent.subRoles` only if `parent` exists and does not
    /// already reference it. Returns the updated parent, or `None` when the
    /// condition did not match.
    async fn add_sub_role(&self, parent: &ObjectId, sub: &ObjectId) -> Result<Option<Role>>;

    /// Remove `sub` from `parent.subRoles` only if it is referenced there.
    async fn remove_sub_role(&self, parent: &ObjectId, sub: &ObjectId) -> Result<Option<Role>>;

    /// Pull `sub` from every role referencing it. Returns the number of roles touched.
    async fn remove_sub_role_everywhere(&self, sub: &ObjectId) -> Result<u64>;
}

pub struct MongoRoleRepository {
    collection: Collection<Role>,
}

impl MongoRoleRepository {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        info!(collection = %collection_name, "Using MongoDB role repository");
        Self {
            collection: db.collection(collection_name),
        }
    }
}

#[async_trait]
impl RoleRepository for MongoRoleRepository {
    async fn insert(&self, role: Role) -> Result<Role> {
        self.collection
            .insert_one(&role)
            .await
            .map_err(|e| {
                classify_write_error(e, Some(role.name.as_str()), Some(role.label.as_str()))
            })?;
        Ok(role)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Role>> {
        Ok(self.collection.find_one(doc! { "_id": *id }).await?)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.collection.find_one(doc! { "name": name }).await?)
    }

    async fn find_by_label(&self, label: &str) -> Result<Option<Role>> {
        Ok(self.collection.find_one(doc! { "label": label }).await?)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn find_page(&self, offset: u64, limit: u64) -> Result<Vec<Role>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let cursor = self.collection
            .find(doc! {})
            .skip(offset)
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn save(&self, role: Role) -> Result<Role> {
        let result = self.collection
            .replace_one(doc! { "_id": role.id }, &role)
            .await
            .map_err(|e| {
                classify_write_error(e, Some(role.name.as_str()), Some(role.label.as_str()))
            })?;
        if result.matched_count == 0 {
            return Err(PlatformError::not_found("Role not found."));
        }
        Ok(role)
    }

    async fn update_info(
        &self,
        id: &ObjectId,
        name: Option<&str>,
        label: Option<&str>,
    ) -> Result<Option<Role>> {
        let updated = self.collection
            .find_one_and_update(doc! { "_id": *id }, set_info(name, label, bson::DateTime::now()))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| classify_write_error(e, name, label))?;
        Ok(updated)
    }

    async fn delete_by_id(&self, id: &ObjectId) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_sub_role(&self, parent: &ObjectId, sub: &ObjectId) -> Result<Option<Role>> {
        let updated = self.collection
            .find_one_and_update(
                missing_sub_role(parent, sub),
                push_sub_role(sub, bson::DateTime::now()),
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn remove_sub_role(&self, parent: &ObjectId, sub: &ObjectId) -> Result<Option<Role>> {
        let updated = self.collection
            .find_one_and_update(
                holding_sub_role(parent, sub),
                pull_sub_role(sub, bson::DateTime::now()),
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn remove_sub_role_everywhere(&self, sub: &ObjectId) -> Result<u64> {
        let result = self.collection
            .update_many(doc! { "subRoles": *sub }, pull_sub_role(sub, bson::DateTime::now()))
            .await?;
        Ok(result.modified_count)
    }
}

/// Matches `parent` only while it does not reference `sub`.
fn missing_sub_role(parent: &ObjectId, sub: &ObjectId) -> Document {
    doc! { "_id": *parent, "subRoles": { "$ne": *sub } }
}

/// Matches `parent` only while it references `sub`.
fn holding_sub_role(parent: &ObjectId, sub: &ObjectId) -> Document {
    doc! { "_id": *parent, "subRoles": *sub }
}

fn push_sub_role(sub: &ObjectId, now: bson::DateTime) -> Document {
    doc! {
        "$push": { "subRoles": *sub },
        "$set": { "updatedAt": now },
    }
}

fn pull_sub_role(sub: &ObjectId, now: bson::DateTime) -> Document {
    doc! {
        "$pull": { "subRoles": *sub },
        "$set": { "updatedAt": now },
    }
}

/// `$set` of the supplied fields only, so `subRoles` is never rewritten.
fn set_info(name: Option<&str>, label: Option<&str>, now: bson::DateTime) -> Document {
    let mut fields = doc! { "updatedAt": now };
    if let Some(name) = name {
        fields.insert("name", name);
    }
    if let Some(label) = label {
        fields.insert("label", label);
    }
    doc! { "$set": fields }
}

/// Message of a duplicate-key failure, if `err` is one.
fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE => {
            Some(e.message.as_str())
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY_CODE => Some(e.message.as_str()),
        _ => None,
    }
}

fn classify_write_error(
    err: mongodb::error::Error,
    name: Option<&str>,
    label: Option<&str>,
) -> PlatformError {
    match duplicate_key_message(&err) {
        Some(message) => duplicate_key_for(message, name, label),
        None => PlatformError::Database(err),
    }
}

/// Map a server duplicate-key message to the offending field. The server
/// names the violated index (`name_1` / `label_1`) in the message.
fn duplicate_key_for(message: &str, name: Option<&str>, label: Option<&str>) -> PlatformError {
    if message.contains("label_1") || message.contains("label:") {
        PlatformError::duplicate_key("label", label.unwrap_or_default())
    } else {
        PlatformError::duplicate_key("name", name.unwrap_or_default())
    }
}
