//! Bank transaction domain model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical lookup key for a bank reference string: trimmed, lower-cased.
///
/// This must be applied identically everywhere a reference is matched -
/// mapping-key storage, ingestion-time lookups, and recategorization.
/// The SQL side uses `lower(trim(reference))`, which agrees with this.
pub fn normalize_reference(reference: &str) -> String {
    reference.trim().to_lowercase()
}

/// A single transaction row parsed from a bank statement CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    /// Free-text reference from the bank statement; not unique
    pub reference: String,
    pub description: Option<String>,
    /// Signed amount: positive = income, negative = expense
    pub amount: Decimal,
    /// Running balance after the transaction, when the statement has one
    pub balance: Option<Decimal>,
    pub category_id: Option<i64>,
}

impl TransactionRecord {
    pub fn new(date: NaiveDate, reference: String, amount: Decimal) -> Self {
        Self {
            date,
            reference,
            description: None,
            amount,
            balance: None,
            category_id: None,
        }
    }

    /// Calculate the content hash used for upload deduplication
    ///
    /// Two records with identical (reference, description, date, amount)
    /// collapse to the same hash and only one survives in storage.
    /// Missing description contributes an empty string so the digest is
    /// stable; the amount is pinned to two decimal places for the same
    /// reason ("4.5" and "4.50" are the same transaction).
    pub fn unique_hash(&self) -> String {
        let input = format!(
            "{}|{}|{}|{:.2}",
            self.reference.trim(),
            self.description.as_deref().unwrap_or(""),
            self.date.format("%Y-%m-%d"),
            self.amount,
        );

        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Normalized reference of this record (see [`normalize_reference`])
    pub fn normalized_reference(&self) -> String {
        normalize_reference(&self.reference)
    }
}

/// A stored transaction row, as read back from the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub date: NaiveDate,
    pub reference: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub balance: Option<Decimal>,
    pub category_id: Option<i64>,
    pub unique_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(reference: &str, amount: Decimal) -> TransactionRecord {
        TransactionRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            reference.to_string(),
            amount,
        )
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_reference(" Foo BAR "), "foo bar");
        assert_eq!(normalize_reference("foo bar"), "foo bar");
        assert_eq!(normalize_reference(""), "");
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = record("Coffee Shop", Decimal::new(-450, 2));
        let b = record("Coffee Shop", Decimal::new(-450, 2));
        assert_eq!(a.unique_hash(), b.unique_hash());
    }

    #[test]
    fn test_hash_changes_with_any_field() {
        let base = record("Coffee Shop", Decimal::new(-450, 2));

        let mut other_ref = base.clone();
        other_ref.reference = "Tea Shop".to_string();
        assert_ne!(base.unique_hash(), other_ref.unique_hash());

        let mut other_desc = base.clone();
        other_desc.description = Some("card payment".to_string());
        assert_ne!(base.unique_hash(), other_desc.unique_hash());

        let mut other_date = base.clone();
        other_date.date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_ne!(base.unique_hash(), other_date.unique_hash());

        let mut other_amount = base.clone();
        other_amount.amount = Decimal::new(-451, 2);
        assert_ne!(base.unique_hash(), other_amount.unique_hash());
    }

    #[test]
    fn test_hash_treats_missing_description_as_empty() {
        let without = record("Coffee Shop", Decimal::new(-450, 2));
        let mut with_empty = without.clone();
        with_empty.description = Some(String::new());
        assert_eq!(without.unique_hash(), with_empty.unique_hash());
    }

    #[test]
    fn test_hash_pins_amount_scale() {
        let a = record("Coffee Shop", Decimal::new(-45, 1)); // -4.5
        let b = record("Coffee Shop", Decimal::new(-450, 2)); // -4.50
        assert_eq!(a.unique_hash(), b.unique_hash());
    }
}
