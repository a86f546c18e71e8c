use super::RecordStore;
use crate::core::{NewRecipe, PantryError, Result};
use std::path::Path;
use tracing::info;

/// Load recipes from a JSON array file into an empty store
///
/// Returns how many recipes were inserted. A store that already holds data is
/// left untouched. Entries are validated like API input; extra fields such as
/// `id` or `publishedAt` in the file are ignored because the store assigns
/// them.
pub async fn populate_if_empty(store: &dyn RecordStore, path: &Path) -> Result<usize> {
    let existing = store.count().await?;
    if existing > 0 {
        info!(
            "Record store already contains {} recipes, skipping seed",
            existing
        );
        return Ok(0);
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PantryError::Config(format!("cannot read seed file {}: {e}", path.display())))?;
    let recipes: Vec<NewRecipe> = serde_json::from_slice(&bytes)
        .map_err(|e| PantryError::Config(format!("invalid seed file {}: {e}", path.display())))?;

    // Nothing is inserted unless every entry is valid
    let recipes = recipes
        .into_iter()
        .map(NewRecipe::validated)
        .collect::<Result<Vec<_>>>()?;

    let mut inserted = 0;
    for recipe in recipes {
        store.create(recipe).await?;
        inserted += 1;
    }

    info!("Inserted {} recipes from {}", inserted, path.display());
    Ok(inserted)
}
