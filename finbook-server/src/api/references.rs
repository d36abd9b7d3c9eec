//! Unmapped reference listing endpoint

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use finbook_core::services::Page;
use finbook_core::{Error, UnmappedReference};

use crate::error::ApiResult;
use super::AppState;

#[derive(Deserialize)]
pub struct ReferencesQuery {
    pub unmapped: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
}

/// GET /references?unmapped=true&page&limit&q
///
/// Only the unmapped listing is supported; anything else is a 400.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReferencesQuery>,
) -> ApiResult<Json<Page<UnmappedReference>>> {
    if query.unmapped.as_deref() != Some("true") {
        return Err(Error::validation("Only unmapped=true is supported").into());
    }

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(state.config.default_page_limit);

    let result = state
        .reference_service
        .list_unmapped(page, limit, query.q.as_deref())?;
    Ok(Json(result))
}
