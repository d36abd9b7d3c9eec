//! Category CRUD endpoints

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use finbook_core::Category;

use crate::error::ApiResult;
use super::AppState;

#[derive(Deserialize)]
pub struct CreateCategory {
    pub name: String,
}

#[derive(Deserialize)]
pub struct RenameCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Deserialize)]
pub struct DeleteCategory {
    pub id: i64,
}

/// GET /categories
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.category_service.list()?))
}

/// POST /categories - create, or return the existing row for the name
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateCategory>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.category_service.create(&body.name)?))
}

/// PATCH /categories
pub async fn rename(
    State(state): State<AppState>,
    Json(body): Json<RenameCategory>,
) -> ApiResult<Json<Category>> {
    Ok(Json(state.category_service.rename(body.id, &body.name)?))
}

/// DELETE /categories
///
/// Removes the category's reference mappings and leaves its
/// transactions uncategorized.
pub async fn remove(
    State(state): State<AppState>,
    Json(body): Json<DeleteCategory>,
) -> ApiResult<Json<JsonValue>> {
    state.category_service.delete(body.id)?;
    Ok(Json(json!({ "deleted": true })))
}
