//! Ingest service - bulk, deduplicated transaction upload

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::adapters::duckdb::DuckDbRepository;
use crate::config::ColumnMappings;
use crate::domain::result::{Error, Result};
use crate::domain::TransactionRecord;

/// Outcome of a bulk upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    /// Rows newly persisted
    pub inserted: usize,
    /// Rows skipped because their content hash already existed
    pub skipped: usize,
    /// Input record count
    pub total: usize,
}

/// Ingest service for bank statement uploads
pub struct IngestService {
    repository: Arc<DuckDbRepository>,
}

impl IngestService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Ingest a batch of transaction records.
    ///
    /// Each record is normalized (trimmed reference, trimmed optional
    /// description) and content-hashed; the batch goes to storage in one
    /// transaction with skip-on-hash-conflict per row. Re-uploading the
    /// same or an overlapping CSV therefore inserts only new rows, and
    /// any storage fault commits nothing.
    pub fn ingest(&self, records: &[TransactionRecord]) -> Result<UploadResult> {
        if records.is_empty() {
            return Err(Error::validation("No records provided"));
        }

        let hashed: Vec<(TransactionRecord, String)> = records
            .iter()
            .map(|r| {
                let mut record = r.clone();
                record.reference = record.reference.trim().to_string();
                record.description = record
                    .description
                    .as_deref()
                    .map(|d| d.trim().to_string());
                let hash = record.unique_hash();
                (record, hash)
            })
            .collect();

        let total = hashed.len();
        let inserted = self.repository.insert_transactions_dedup(&hashed)?;
        let skipped = total - inserted;

        tracing::info!(inserted, skipped, total, "ingested transaction batch");

        Ok(UploadResult {
            inserted,
            skipped,
            total,
        })
    }
}

/// Parse CSV text into header->value row maps.
///
/// Headers come from the first record; empty cells become Null so the
/// record builder treats them as absent.
pub fn parse_csv_rows(content: &str) -> Result<Vec<HashMap<String, JsonValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::validation(format!("Invalid CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::validation(format!("Invalid CSV row: {}", e)))?;
        let mut row = HashMap::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            let cell = if value.is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(value.to_string())
            };
            row.insert(header.clone(), cell);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Build transaction records from parsed CSV rows and a column mapping.
///
/// Rows come from the CSV collaborator as header->value maps; the user
/// supplies which column holds which field. Rows without a parseable
/// date or amount are dropped and counted as skipped. A timestamp in the
/// date column is truncated at 'T'.
pub fn build_records(
    rows: &[HashMap<String, JsonValue>],
    mapping: &ColumnMappings,
) -> (Vec<TransactionRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0;

    let cell = |row: &HashMap<String, JsonValue>, key: Option<&String>| -> Option<String> {
        let key = key?;
        match row.get(key) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(v) => Some(v.to_string()),
        }
    };

    for row in rows {
        let date_raw = cell(row, Some(&mapping.date)).unwrap_or_default();
        let date_part = date_raw.split('T').next().unwrap_or("");
        let Some(date) = parse_date(date_part) else {
            skipped += 1;
            continue;
        };

        let Some(amount) = cell(row, Some(&mapping.amount)).and_then(|s| parse_amount(&s)) else {
            skipped += 1;
            continue;
        };

        let reference = cell(row, Some(&mapping.reference)).unwrap_or_default();
        let description = cell(row, mapping.description.as_ref());
        let balance = cell(row, mapping.balance.as_ref()).and_then(|s| parse_amount(&s));

        let mut record = TransactionRecord::new(date, reference, amount);
        record.description = description;
        record.balance = balance;
        records.push(record);
    }

    (records, skipped)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Try common statement formats
    let formats = [
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%d/%m/%Y",
        "%m-%d-%Y",
        "%d-%m-%Y",
        "%Y/%m/%d",
    ];

    for fmt in &formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();

    // Parentheses notation for negative numbers: (100.00) -> -100.00
    let (is_negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };

    // Remove currency symbols, thousands separators, whitespace
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let mut amount: Decimal = cleaned.parse().ok()?;

    if is_negative && amount > Decimal::ZERO {
        amount = -amount;
    }

    Some(amount)
}
