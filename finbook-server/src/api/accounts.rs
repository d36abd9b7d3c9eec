//! Account CRUD endpoints

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use finbook_core::Account;

use crate::error::ApiResult;
use super::AppState;

#[derive(Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct RenameAccount {
    pub id: i64,
    pub name: String,
}

#[derive(Deserialize)]
pub struct DeleteAccount {
    pub id: i64,
}

/// GET /accounts - each account carries its latest recorded amount
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(state.account_service.list()?))
}

/// POST /accounts
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAccount>,
) -> ApiResult<Json<JsonValue>> {
    let id = state
        .account_service
        .create(&body.name, body.color.as_deref())?;
    Ok(Json(json!({ "id": id })))
}

/// PUT /accounts
pub async fn rename(
    State(state): State<AppState>,
    Json(body): Json<RenameAccount>,
) -> ApiResult<Json<JsonValue>> {
    state.account_service.rename(body.id, &body.name)?;
    Ok(Json(json!({ "updated": true })))
}

/// DELETE /accounts - the amount history goes with the account
pub async fn remove(
    State(state): State<AppState>,
    Json(body): Json<DeleteAccount>,
) -> ApiResult<Json<JsonValue>> {
    state.account_service.delete(body.id)?;
    Ok(Json(json!({ "deleted": true })))
}
