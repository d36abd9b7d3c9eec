//! Reference service - unmapped-reference listing

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::domain::UnmappedReference;

/// Hard cap on page size
pub const MAX_PAGE_LIMIT: i64 = 100;

/// One page of results plus the pagination envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// 1-indexed page number
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Assemble a page from data and counts.
    /// total_pages = max(1, ceil(total / limit)); has_more = page < total_pages.
    pub fn new(data: Vec<T>, page: i64, limit: i64, total: i64) -> Self {
        let total_pages = std::cmp::max(1, (total + limit - 1) / limit);
        Self {
            data,
            page,
            limit,
            total,
            total_pages,
            has_more: page < total_pages,
        }
    }
}

/// Clamp raw pagination parameters: 1-indexed page, limit in [1, 100]
pub fn clamp_pagination(page: i64, limit: i64) -> (i64, i64) {
    (page.max(1), limit.clamp(1, MAX_PAGE_LIMIT))
}

/// Read-only queries over distinct bank references
pub struct ReferenceService {
    repository: Arc<DuckDbRepository>,
}

impl ReferenceService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// List distinct references that have no category mapping yet.
    ///
    /// Transactions are grouped by normalized reference; each group is
    /// represented by its lexicographically smallest raw form, and groups
    /// whose key has a mapping are excluded. The optional search filters
    /// case-insensitively on the representative sample. Ordered by sample
    /// ascending.
    pub fn list_unmapped(
        &self,
        page: i64,
        limit: i64,
        search: Option<&str>,
    ) -> Result<Page<UnmappedReference>> {
        let (page, limit) = clamp_pagination(page, limit);
        let offset = (page - 1) * limit;

        let like = search
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));

        let total = self.repository.count_unmapped_references(like.as_deref())?;
        let data = self
            .repository
            .list_unmapped_references(like.as_deref(), limit, offset)?;

        Ok(Page::new(data, page, limit, total))
    }
}
