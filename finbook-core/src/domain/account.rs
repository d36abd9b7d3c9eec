//! Account and amount-history domain models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tracked account (checking, savings, broker...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    /// Display color used by the dashboard chips
    pub color: Option<String>,
    /// Latest recorded amount, 0 when no history exists yet
    pub amount: Decimal,
}

/// One periodic balance reading for an account
///
/// `id` is None for grouped rows (sums across accounts per date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub account_name: String,
    pub account_color: Option<String>,
}
