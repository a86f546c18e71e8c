//! Typed read queries.
//!
//! Every read the catalog supports is one variant of [`RecipeQuery`], and the
//! cache key is derived from the variant alone. Adding a query shape means
//! adding a variant, which forces a key for it.

use super::error::{PantryError, Result};
use super::recipe::RecordId;

const ALL_KEY: &str = "all";
const ITEM_PREFIX: &str = "item:";
const SEARCH_PREFIX: &str = "search:";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecipeQuery {
    All,
    ById(RecordId),
    ByTag(String),
}

impl RecipeQuery {
    pub fn all() -> Self {
        Self::All
    }

    pub fn by_id(id: RecordId) -> Self {
        Self::ById(id)
    }

    /// Tag search; the tag is trimmed and must not be blank
    pub fn by_tag(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(PantryError::Validation("tag must not be blank".to_string()));
        }
        Ok(Self::ByTag(tag.to_string()))
    }

    /// Cache key for this query shape
    pub fn cache_key(&self) -> String {
        match self {
            Self::All => ALL_KEY.to_string(),
            Self::ById(id) => format!("{ITEM_PREFIX}{id}"),
            Self::ByTag(tag) => format!("{SEARCH_PREFIX}{tag}"),
        }
    }

    /// Keys a write to `id` can make stale. Tag searches are left to TTL.
    pub fn invalidation_keys(id: Option<RecordId>) -> Vec<String> {
        let mut keys = vec![Self::All.cache_key()];
        if let Some(id) = id {
            keys.push(Self::ById(id).cache_key());
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys() {
        let id: RecordId = "6f1c2a3e-0000-4000-8000-000000000001".parse().unwrap();

        assert_eq!(RecipeQuery::all().cache_key(), "all");
        assert_eq!(
            RecipeQuery::by_id(id).cache_key(),
            "item:6f1c2a3e-0000-4000-8000-000000000001"
        );
        assert_eq!(
            RecipeQuery::by_tag("drink").unwrap().cache_key(),
            "search:drink"
        );
    }

    #[test]
    fn test_equivalent_queries_share_key() {
        let a = RecipeQuery::by_tag("drink").unwrap();
        let b = RecipeQuery::by_tag("  drink ").unwrap();
        assert_eq!(a.cache_key(), b.cache_key());

        let id = RecordId::new();
        assert_eq!(
            RecipeQuery::by_id(id).cache_key(),
            RecipeQuery::by_id(id).cache_key()
        );
    }

    #[test]
    fn test_distinct_shapes_never_collide() {
        let id = RecordId::new();
        let keys = [
            RecipeQuery::all().cache_key(),
            RecipeQuery::by_id(id).cache_key(),
            RecipeQuery::by_tag(&id.to_string()).unwrap().cache_key(),
            RecipeQuery::by_tag("all").unwrap().cache_key(),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_blank_tag_rejected() {
        assert!(RecipeQuery::by_tag("   ").is_err());
    }

    #[test]
    fn test_invalidation_keys() {
        assert_eq!(RecipeQuery::invalidation_keys(None), vec!["all"]);

        let id = RecordId::new();
        let keys = RecipeQuery::invalidation_keys(Some(id));
        assert_eq!(keys, vec!["all".to_string(), format!("item:{id}")]);
    }
}
