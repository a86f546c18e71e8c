use super::error::{PantryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Store-assigned recipe identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Allocate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| PantryError::Validation(format!("malformed recipe id: {s:?}")))
    }
}

/// A recipe as persisted and served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecordId,
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub published_at: DateTime<Utc>,
}

impl Recipe {
    /// Materialize a new recipe with a fresh id and creation timestamp
    pub fn from_new(new: NewRecipe) -> Self {
        Self {
            id: RecordId::new(),
            name: new.name,
            tags: new.tags,
            ingredients: new.ingredients,
            instructions: new.instructions,
            published_at: Utc::now(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Apply a validated patch; id and published_at never change
    pub fn apply(&mut self, patch: RecipePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(instructions) = patch.instructions {
            self.instructions = instructions;
        }
        if let Some(ingredients) = patch.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
    }
}

/// Create payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewRecipe {
    /// Check required fields and normalize tags
    pub fn validated(mut self) -> Result<Self> {
        self.name = validate_name(&self.name)?;
        self.tags = normalize_tags(self.tags)?;
        Ok(self)
    }
}

/// Partial update payload; absent fields stay as they are
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub instructions: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl RecipePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.instructions.is_none()
            && self.ingredients.is_none()
            && self.tags.is_none()
    }

    pub fn validated(mut self) -> Result<Self> {
        if self.is_empty() {
            return Err(PantryError::Validation(
                "update must set at least one field".to_string(),
            ));
        }
        if let Some(name) = self.name.as_deref() {
            self.name = Some(validate_name(name)?);
        }
        if let Some(tags) = self.tags.take() {
            self.tags = Some(normalize_tags(tags)?);
        }
        Ok(self)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PantryError::Validation("name must not be blank".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Trim, reject blanks and drop duplicates keeping first occurrence
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(PantryError::Validation("tags must not be blank".to_string()));
        }
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    Ok(out)
}
