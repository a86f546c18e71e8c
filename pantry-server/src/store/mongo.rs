use super::RecordStore;
use super::memory::not_found;
use crate::core::{NewRecipe, PantryError, Recipe, RecipePatch, RecordId, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc};
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Collection holding one document per recipe
pub const COLLECTION: &str = "recipes";

/// Recipe as stored in MongoDB
///
/// The record id is the document `_id` (hyphenated UUID string) and the publish
/// time is a native BSON date, so listing can sort server-side. BSON dates
/// carry millisecond precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    ingredients: Vec<String>,
    #[serde(default)]
    instructions: String,
    published_at: bson::DateTime,
}

impl From<&Recipe> for RecipeDocument {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.to_string(),
            name: recipe.name.clone(),
            tags: recipe.tags.clone(),
            ingredients: recipe.ingredients.clone(),
            instructions: recipe.instructions.clone(),
            published_at: bson::DateTime::from_millis(recipe.published_at.timestamp_millis()),
        }
    }
}

impl TryFrom<RecipeDocument> for Recipe {
    type Error = PantryError;

    fn try_from(document: RecipeDocument) -> Result<Self> {
        let id = document
            .id
            .parse::<RecordId>()
            .map_err(|_| PantryError::store(format!("document has malformed _id {:?}", document.id)))?;
        let millis = document.published_at.timestamp_millis();
        let published_at = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| PantryError::store(format!("document {id} has out-of-range publishedAt")))?;

        Ok(Self {
            id,
            name: document.name,
            tags: document.tags,
            ingredients: document.ingredients,
            instructions: document.instructions,
            published_at,
        })
    }
}

fn by_id(id: RecordId) -> Document {
    doc! { "_id": id.to_string() }
}

/// `$set` update touching only the fields present in the patch
fn set_document(patch: &RecipePatch) -> Document {
    let mut set = Document::new();
    if let Some(name) = &patch.name {
        set.insert("name", name.as_str());
    }
    if let Some(instructions) = &patch.instructions {
        set.insert("instructions", instructions.as_str());
    }
    if let Some(ingredients) = &patch.ingredients {
        set.insert("ingredients", ingredients.clone());
    }
    if let Some(tags) = &patch.tags {
        set.insert("tags", tags.clone());
    }
    doc! { "$set": set }
}

fn map_mongo_err(err: mongodb::error::Error) -> PantryError {
    PantryError::store(err.to_string())
}

/// Record store backed by a MongoDB collection
pub struct MongoRecordStore {
    client: Client,
    database: Database,
    recipes: Collection<RecipeDocument>,
}

impl MongoRecordStore {
    /// Build a client from a `mongodb://` connection string
    ///
    /// The driver connects lazily; callers ping before first use.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await.map_err(map_mongo_err)?;
        let database = client.database(database);
        let recipes = database.collection::<RecipeDocument>(COLLECTION);

        info!(
            "Using MongoDB record store (database={}, collection={})",
            database.name(),
            COLLECTION
        );

        Ok(Self {
            client,
            database,
            recipes,
        })
    }

    async fn find(&self, filter: Document) -> Result<Vec<Recipe>> {
        let cursor = self
            .recipes
            .find(filter)
            .sort(doc! { "publishedAt": 1, "_id": 1 })
            .await
            .map_err(map_mongo_err)?;
        let documents: Vec<RecipeDocument> = cursor.try_collect().await.map_err(map_mongo_err)?;
        documents.into_iter().map(Recipe::try_from).collect()
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn create(&self, recipe: NewRecipe) -> Result<Recipe> {
        let document = RecipeDocument::from(&Recipe::from_new(recipe));
        debug!("insertOne _id={}", document.id);
        self.recipes
            .insert_one(&document)
            .await
            .map_err(map_mongo_err)?;
        // Round-trip through the stored form so callers see what reads return
        Recipe::try_from(document)
    }

    async fn get(&self, id: RecordId) -> Result<Recipe> {
        let document = self
            .recipes
            .find_one(by_id(id))
            .await
            .map_err(map_mongo_err)?
            .ok_or_else(|| not_found(id))?;
        Recipe::try_from(document)
    }

    async fn scan_all(&self) -> Result<Vec<Recipe>> {
        self.find(doc! {}).await
    }

    async fn scan_by_tag(&self, tag: &str) -> Result<Vec<Recipe>> {
        self.find(doc! { "tags": tag }).await
    }

    async fn update(&self, id: RecordId, patch: RecipePatch) -> Result<()> {
        debug!("updateOne _id={}", id);
        let result = self
            .recipes
            .update_one(by_id(id), set_document(&patch))
            .await
            .map_err(map_mongo_err)?;
        if result.matched_count == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        debug!("deleteOne _id={}", id);
        let result = self
            .recipes
            .delete_one(by_id(id))
            .await
            .map_err(map_mongo_err)?;
        if result.deleted_count == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let count = self
            .recipes
            .count_documents(doc! {})
            .await
            .map_err(map_mongo_err)?;
        usize::try_from(count).map_err(|_| PantryError::store(format!("document count {count} overflows")))
    }

    async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_mongo_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing MongoDB client");
        self.client.clone().shutdown().await;
        Ok(())
    }
}
