//! Reference-to-category mapping domain model

use serde::{Deserialize, Serialize};

/// Persistent association from a normalized bank reference to a category
///
/// The mapping table is the sole authority for these associations; the
/// recategorizer only propagates them onto historical rows, it never
/// invents new ones. At most one mapping exists per normalized reference
/// (upsert replaces, never duplicates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMapping {
    pub normalized_reference: String,
    pub category_id: i64,
}

/// One distinct reference with no mapping yet, as shown to the user
///
/// `reference` is the representative raw sample for the group: the
/// lexicographically smallest raw form sharing the normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedReference {
    pub reference: String,
}
