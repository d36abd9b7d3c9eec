//! Bank statement upload endpoint

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use finbook_core::config::ColumnMappings;
use finbook_core::services::{build_records, parse_csv_rows, UploadResult};
use finbook_core::{Error, TransactionRecord};

use crate::error::ApiResult;
use super::AppState;

/// Upload body: pre-parsed records, raw CSV rows (header -> value
/// maps), or CSV text. The latter two take an optional saved import
/// profile name for the column mapping.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum UploadBody {
    Records {
        records: Vec<TransactionRecord>,
    },
    Rows {
        rows: Vec<HashMap<String, JsonValue>>,
        profile: Option<String>,
    },
    Csv {
        csv: String,
        profile: Option<String>,
    },
}

fn profile_mappings(state: &AppState, profile: Option<&str>) -> Result<ColumnMappings, Error> {
    match profile {
        Some(name) => state
            .config
            .import_profiles
            .get(name)
            .map(|p| p.column_mappings.clone())
            .ok_or_else(|| Error::not_found(format!("Import profile '{}' not found", name))),
        None => Ok(ColumnMappings::default()),
    }
}

/// POST /transactions
pub async fn upload(
    State(state): State<AppState>,
    Json(body): Json<UploadBody>,
) -> ApiResult<Json<UploadResult>> {
    let records = match body {
        UploadBody::Records { records } => records,
        UploadBody::Rows { rows, profile } => {
            let mappings = profile_mappings(&state, profile.as_deref())?;
            from_rows(&rows, &mappings)
        }
        UploadBody::Csv { csv, profile } => {
            let mappings = profile_mappings(&state, profile.as_deref())?;
            let rows = parse_csv_rows(&csv)?;
            from_rows(&rows, &mappings)
        }
    };

    let result = state.ingest_service.ingest(&records)?;
    Ok(Json(result))
}

fn from_rows(
    rows: &[HashMap<String, JsonValue>],
    mappings: &ColumnMappings,
) -> Vec<TransactionRecord> {
    let (records, invalid) = build_records(rows, mappings);
    if invalid > 0 {
        tracing::warn!(invalid, "dropped rows without a usable date or amount");
    }
    records
}
