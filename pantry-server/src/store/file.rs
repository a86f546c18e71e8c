use super::RecordStore;
use super::memory::MemoryRecordStore;
use crate::core::{NewRecipe, PantryError, Recipe, RecipePatch, RecordId, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Document store persisted as one JSON file
///
/// Reads are served from memory. Each mutation is staged, written to disk with
/// a temp-file rename, and only then made visible, so a failed write leaves
/// both the file and the served state untouched. Writers are serialized by
/// `write_lock` so the file always reflects the latest commit.
pub struct FileRecordStore {
    path: PathBuf,
    records: MemoryRecordStore,
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Open the document file, creating an empty collection when it is missing
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<Recipe>>(&bytes).map_err(|e| {
                PantryError::store(format!("corrupt document file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(PantryError::store(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        info!(
            "Opened document file {} ({} recipes)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            records: MemoryRecordStore::from_records(records),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, documents: &[Recipe]) -> Result<()> {
        let body = serde_json::to_vec_pretty(documents)?;
        let tmp = temp_path(&self.path);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PantryError::store(format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| PantryError::store(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PantryError::store(format!("cannot commit {}: {e}", self.path.display())))?;

        debug!("Persisted {} recipes to {}", documents.len(), self.path.display());
        Ok(())
    }

    /// Persist the collection with `recipe` upserted, then expose it
    async fn commit_put(&self, recipe: Recipe) -> Result<()> {
        let mut documents = self.records.snapshot();
        match documents.iter_mut().find(|r| r.id == recipe.id) {
            Some(existing) => *existing = recipe.clone(),
            None => documents.push(recipe.clone()),
        }
        self.persist(&documents).await?;
        self.records.put(recipe);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn create(&self, recipe: NewRecipe) -> Result<Recipe> {
        let _guard = self.write_lock.lock().await;
        let recipe = Recipe::from_new(recipe);
        self.commit_put(recipe.clone()).await?;
        Ok(recipe)
    }

    async fn get(&self, id: RecordId) -> Result<Recipe> {
        self.records.get(id).await
    }

    async fn scan_all(&self) -> Result<Vec<Recipe>> {
        self.records.scan_all().await
    }

    async fn scan_by_tag(&self, tag: &str) -> Result<Vec<Recipe>> {
        self.records.scan_by_tag(tag).await
    }

    async fn update(&self, id: RecordId, patch: RecipePatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut recipe = self.records.lookup(id)?;
        recipe.apply(patch);
        self.commit_put(recipe).await
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.records.lookup(id)?;

        let mut documents = self.records.snapshot();
        documents.retain(|r| r.id != id);
        self.persist(&documents).await?;
        self.records.remove(id).map(|_| ())
    }

    async fn count(&self) -> Result<usize> {
        self.records.count().await
    }

    async fn ping(&self) -> Result<()> {
        match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) if !dir.exists() => Err(PantryError::store(format!(
                "data directory {} is missing",
                dir.display()
            ))),
            _ => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        info!("Closing document file {}", self.path.display());
        Ok(())
    }
}

/// Sibling staging file: the full file name with `.tmp` appended
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
