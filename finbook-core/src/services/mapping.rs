//! Mapping service - reference-to-category assignment and retroactive
//! recategorization

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::normalize_reference;
use crate::domain::result::{Error, Result};
use crate::domain::ReferenceMapping;

/// Outcome of assigning a category to a reference
#[derive(Debug, Clone, Serialize)]
pub struct MappingResult {
    pub normalized_reference: String,
    pub category_id: i64,
    /// Historical transaction rows whose category actually changed
    pub updated: usize,
}

/// Mapping service: owns the reference-to-category association table
pub struct MappingService {
    repository: Arc<DuckDbRepository>,
}

impl MappingService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Assign a category to a bank reference.
    ///
    /// Upserts the mapping under the normalized key (last-write-wins) and
    /// retroactively applies the category to every historical transaction
    /// sharing that normalized reference, both inside one storage
    /// transaction. Safe to repeat: the second call updates zero rows.
    pub fn assign_category(&self, reference: &str, category_id: i64) -> Result<MappingResult> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::validation("reference is required"));
        }
        if !self.repository.category_exists(category_id)? {
            return Err(Error::not_found(format!("Category {} not found", category_id)));
        }

        let normalized = normalize_reference(reference);
        let updated = self
            .repository
            .upsert_mapping_and_recategorize(&normalized, category_id)?;

        tracing::info!(
            normalized_reference = %normalized,
            category_id,
            updated,
            "assigned category to reference"
        );

        Ok(MappingResult {
            normalized_reference: normalized,
            category_id,
            updated,
        })
    }

    /// Re-apply a mapping's category to matching historical transactions.
    ///
    /// Never invents associations - it only propagates the given one.
    /// Idempotent and monotonic: repeated calls update zero rows, and a
    /// category is only ever assigned, never removed.
    pub fn reapply(&self, normalized_reference: &str, category_id: i64) -> Result<usize> {
        self.repository
            .recategorize_by_reference(normalized_reference, category_id)
    }

    /// All stored mappings, ordered by normalized reference
    pub fn list(&self) -> Result<Vec<ReferenceMapping>> {
        self.repository.get_mappings()
    }
}
