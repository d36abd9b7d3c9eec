//! Amount history endpoints

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use finbook_core::services::{AmountListing, AmountQuery};
use finbook_core::Error;

use crate::error::ApiResult;
use super::AppState;

#[derive(Deserialize)]
pub struct ListAmounts {
    /// Comma-separated account ids, e.g. `fk_accounts=1,3`
    pub fk_accounts: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// `asc` or `desc` (default)
    pub order: Option<String>,
    pub grouped: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateAmount {
    pub amount: Decimal,
    pub date: NaiveDate,
    pub fk_account: i64,
}

#[derive(Deserialize)]
pub struct DeleteAmount {
    pub id: i64,
}

fn parse_account_ids(raw: &str) -> Result<Vec<i64>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::validation(format!("Invalid account id '{}'", s)))
        })
        .collect()
}

/// GET /amounts
///
/// Unpaginated unless both `page` and `limit` are given; `grouped=true`
/// sums per date across the selected accounts.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListAmounts>,
) -> ApiResult<Response> {
    let account_ids = query
        .fk_accounts
        .as_deref()
        .map(parse_account_ids)
        .transpose()?
        .filter(|ids| !ids.is_empty());

    let amount_query = AmountQuery {
        account_ids,
        from: query.from,
        to: query.to,
        ascending: query.order.as_deref() == Some("asc"),
        grouped: query.grouped.unwrap_or(false),
        page: query.page,
        limit: query.limit,
    };

    let response = match state.account_service.list_amounts(&amount_query)? {
        AmountListing::Plain(rows) => Json(rows).into_response(),
        AmountListing::Paged(page) => Json(page).into_response(),
    };
    Ok(response)
}

/// POST /amounts
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAmount>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state
        .account_service
        .add_amount(body.amount, body.date, body.fk_account)?;
    Ok(Json(json!({ "id": id })))
}

/// DELETE /amounts
pub async fn remove(
    State(state): State<AppState>,
    Json(body): Json<DeleteAmount>,
) -> ApiResult<Json<serde_json::Value>> {
    state.account_service.delete_amount(body.id)?;
    Ok(Json(json!({ "deleted": true })))
}
