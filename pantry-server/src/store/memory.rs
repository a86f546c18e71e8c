use super::RecordStore;
use crate::core::{NewRecipe, PantryError, Recipe, RecipePatch, RecordId, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Record store kept entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<RecordId, Recipe>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with existing documents
    pub fn from_records(records: Vec<Recipe>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// All documents in listing order
    pub fn snapshot(&self) -> Vec<Recipe> {
        let records = self.records.read();
        sorted(records.values().cloned().collect())
    }

    pub(crate) fn lookup(&self, id: RecordId) -> Result<Recipe> {
        self.records
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    pub(crate) fn put(&self, recipe: Recipe) {
        self.records.write().insert(recipe.id, recipe);
    }

    pub(crate) fn remove(&self, id: RecordId) -> Result<Recipe> {
        self.records.write().remove(&id).ok_or_else(|| not_found(id))
    }
}

pub(crate) fn not_found(id: RecordId) -> PantryError {
    PantryError::NotFound(format!("recipe {id}"))
}

/// Listing order: oldest first, id as tie-breaker
pub(crate) fn sorted(mut recipes: Vec<Recipe>) -> Vec<Recipe> {
    recipes.sort_by(|a, b| {
        a.published_at
            .cmp(&b.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    recipes
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, recipe: NewRecipe) -> Result<Recipe> {
        let recipe = Recipe::from_new(recipe);
        debug!("INSERT id={}", recipe.id);
        self.put(recipe.clone());
        Ok(recipe)
    }

    async fn get(&self, id: RecordId) -> Result<Recipe> {
        self.lookup(id)
    }

    async fn scan_all(&self) -> Result<Vec<Recipe>> {
        Ok(self.snapshot())
    }

    async fn scan_by_tag(&self, tag: &str) -> Result<Vec<Recipe>> {
        let records = self.records.read();
        let matching = records
            .values()
            .filter(|r| r.has_tag(tag))
            .cloned()
            .collect();
        Ok(sorted(matching))
    }

    async fn update(&self, id: RecordId, patch: RecipePatch) -> Result<()> {
        debug!("UPDATE id={}", id);
        let mut records = self.records.write();
        let recipe = records.get_mut(&id).ok_or_else(|| not_found(id))?;
        recipe.apply(patch);
        Ok(())
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        debug!("DELETE id={}", id);
        self.remove(id).map(|_| ())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
