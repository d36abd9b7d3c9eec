//! Income/expense flow summary endpoint

use axum::extract::State;
use axum::Json;

use finbook_core::services::FlowSummary;

use crate::error::ApiResult;
use super::AppState;

/// GET /flow - sankey nodes and links through the Total Income center
pub async fn summary(State(state): State<AppState>) -> ApiResult<Json<FlowSummary>> {
    Ok(Json(state.flow_service.summary()?))
}
