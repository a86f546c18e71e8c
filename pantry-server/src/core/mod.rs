pub mod error;
pub mod query;
pub mod recipe;
pub mod types;

pub use error::{PantryError, Result};
pub use query::RecipeQuery;
pub use recipe::{NewRecipe, Recipe, RecipePatch, RecordId};
pub use types::{CacheBackendKind, CacheStats, StoredValue};
