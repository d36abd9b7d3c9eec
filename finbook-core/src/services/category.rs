//! Category service - category management

use std::sync::Arc;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::Category;

/// Category management
pub struct CategoryService {
    repository: Arc<DuckDbRepository>,
}

impl CategoryService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// All categories, ordered by name
    pub fn list(&self) -> Result<Vec<Category>> {
        self.repository.get_categories()
    }

    /// Create a category; an existing name returns the existing row
    pub fn create(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Name is required"));
        }
        self.repository.upsert_category(name)
    }

    /// Rename a category. Unknown id is NotFound; taking another
    /// category's name surfaces as Conflict from the unique constraint.
    pub fn rename(&self, id: i64, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name is required"));
        }
        self.repository
            .rename_category(id, name)?
            .ok_or_else(|| Error::not_found(format!("Category {} not found", id)))
    }

    /// Delete a category.
    ///
    /// Its reference mappings go with it and dependent transactions are
    /// left uncategorized (category_id nulled out).
    pub fn delete(&self, id: i64) -> Result<()> {
        if !self.repository.delete_category(id)? {
            return Err(Error::not_found(format!("Category {} not found", id)));
        }
        tracing::info!(category_id = id, "deleted category");
        Ok(())
    }
}
