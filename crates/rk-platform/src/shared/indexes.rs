//! MongoDB Index Initialization
//!
//! Creates the unique indexes backing role name/label uniqueness.

use mongodb::{bson::doc, options::IndexOptions, Database, IndexModel};
use tracing::info;

/// Initialize the role collection indexes.
pub async fn initialize_indexes(db: &Database, collection: &str) -> Result<(), mongodb::error::Error> {
    info!(collection = %collection, "Initializing MongoDB indexes...");

    create_role_indexes(db, collection).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

async fn create_role_indexes(db: &Database, collection: &str) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<mongodb::bson::Document>(collection);

    // Name uniqueness
    collection.create_index(
        IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build(),
    ).await?;

    // Label uniqueness
    collection.create_index(
        IndexModel::builder()
            .keys(doc! { "label": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build(),
    ).await?;

    // Parent lookup for cascading sub-role removal
    collection.create_index(
        IndexModel::builder()
            .keys(doc! { "subRoles": 1 })
            .build(),
    ).await?;

    Ok(())
}
