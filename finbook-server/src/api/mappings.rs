//! Reference-to-category mapping endpoint

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use finbook_core::services::MappingResult;

use crate::error::ApiResult;
use super::AppState;

#[derive(Deserialize)]
pub struct CreateMapping {
    pub reference: String,
    pub category_id: i64,
}

/// POST /reference-mappings
///
/// Upserts the mapping and retroactively recategorizes every stored
/// transaction whose normalized reference matches.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateMapping>,
) -> ApiResult<Json<MappingResult>> {
    let result = state
        .mapping_service
        .assign_category(&body.reference, body.category_id)?;
    Ok(Json(result))
}
