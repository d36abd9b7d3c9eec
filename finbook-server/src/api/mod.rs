//! HTTP API surface
//!
//! Thin axum handlers: deserialize the request, call the matching core
//! service, map errors to statuses. No business logic lives here.

pub mod accounts;
pub mod amounts;
pub mod categories;
pub mod flow;
pub mod mappings;
pub mod references;
pub mod transactions;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use finbook_core::FinbookContext;

pub type AppState = Arc<FinbookContext>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/transactions", post(transactions::upload))
        .route("/reference-mappings", post(mappings::create))
        .route("/references", get(references::list))
        .route(
            "/categories",
            get(categories::list)
                .post(categories::create)
                .patch(categories::rename)
                .delete(categories::remove),
        )
        .route(
            "/accounts",
            get(accounts::list)
                .post(accounts::create)
                .put(accounts::rename)
                .delete(accounts::remove),
        )
        .route(
            "/amounts",
            get(amounts::list).post(amounts::create).delete(amounts::remove),
        )
        .route("/flow", get(flow::summary))
        .with_state(state)
}
