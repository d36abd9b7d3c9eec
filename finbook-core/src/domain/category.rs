//! Category domain model

use serde::{Deserialize, Serialize};

/// A user-defined transaction category
///
/// Names are unique, case-sensitive as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}
