//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod category;
mod mapping;
mod transaction;
pub mod result;

pub use account::{Account, AmountEntry};
pub use category::Category;
pub use mapping::{ReferenceMapping, UnmappedReference};
pub use transaction::{normalize_reference, StoredTransaction, TransactionRecord};
