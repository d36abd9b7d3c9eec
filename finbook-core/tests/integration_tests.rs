//! Integration tests for finbook-core services
//!
//! These tests verify the ingestion/mapping data integrity scenarios
//! using real DuckDB. Run with: cargo test --test integration_tests

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use finbook_core::adapters::duckdb::DuckDbRepository;
use finbook_core::services::{
    AccountService, AmountListing, AmountQuery, CategoryService, FlowService, IngestService,
    MappingService, ReferenceService,
};
use finbook_core::{Error, TransactionRecord};

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn record(date: (i32, u32, u32), reference: &str, cents: i64) -> TransactionRecord {
    TransactionRecord::new(
        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        reference.to_string(),
        Decimal::new(cents, 2),
    )
}

// ============================================================================
// Bulk Ingestion Tests
// ============================================================================

#[test]
fn test_ingest_empty_batch_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));

    let err = ingest.ingest(&[]).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_ingest_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));

    let batch = vec![
        record((2024, 1, 5), " Coffee Shop ", -450),
        record((2024, 1, 6), "Salary", 250_000),
    ];

    let first = ingest.ingest(&batch).unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.skipped, 0);
    assert_eq!(first.total, 2);

    // Re-uploading the same batch inserts nothing new
    let second = ingest.ingest(&batch).unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.total, 2);

    assert_eq!(repo.get_transaction_count().unwrap(), 2);
}

#[test]
fn test_ingest_overlapping_batch_inserts_only_new_rows() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));

    ingest
        .ingest(&[record((2024, 1, 5), "Coffee Shop", -450)])
        .unwrap();

    let overlapping = vec![
        record((2024, 1, 5), "Coffee Shop", -450),
        record((2024, 1, 7), "Grocer", -3200),
    ];
    let result = ingest.ingest(&overlapping).unwrap();
    assert_eq!(result.inserted, 1);
    assert_eq!(result.skipped, 1);
}

#[test]
fn test_ingest_trims_reference_before_hashing() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));

    // Same logical record, differing only in surrounding whitespace
    ingest
        .ingest(&[record((2024, 1, 5), " Coffee Shop ", -450)])
        .unwrap();
    let result = ingest
        .ingest(&[record((2024, 1, 5), "Coffee Shop", -450)])
        .unwrap();
    assert_eq!(result.inserted, 0);
    assert_eq!(result.skipped, 1);
}

#[test]
fn test_ingest_duplicate_rows_within_one_batch_collapse() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));

    let batch = vec![
        record((2024, 1, 5), "Coffee Shop", -450),
        record((2024, 1, 5), "Coffee Shop", -450),
    ];
    let result = ingest.ingest(&batch).unwrap();
    assert_eq!(result.inserted, 1);
    assert_eq!(result.skipped, 1);
}

#[test]
fn test_ingested_rows_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));

    let mut rec = record((2024, 1, 5), "Coffee Shop", -450);
    rec.description = Some("card payment".to_string());
    rec.balance = Some(Decimal::new(102_550, 2));
    ingest.ingest(&[rec]).unwrap();

    let stored = repo.get_transactions().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].reference, "Coffee Shop");
    assert_eq!(stored[0].description.as_deref(), Some("card payment"));
    assert_eq!(stored[0].amount, Decimal::new(-450, 2));
    assert_eq!(stored[0].balance, Some(Decimal::new(102_550, 2)));
    assert_eq!(stored[0].category_id, None);
    assert_eq!(stored[0].unique_hash.len(), 64);
}

// ============================================================================
// Mapping / Recategorization Tests
// ============================================================================

#[test]
fn test_assign_category_recategorizes_history() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));

    ingest
        .ingest(&[
            record((2024, 1, 5), " Coffee Shop ", -450),
            record((2024, 1, 8), "coffee shop", -500),
            record((2024, 1, 9), "Grocer", -3200),
        ])
        .unwrap();

    let eating_out = categories.create("Eating Out").unwrap();
    let result = mappings.assign_category("Coffee Shop", eating_out.id).unwrap();

    assert_eq!(result.normalized_reference, "coffee shop");
    assert_eq!(result.updated, 2);

    // Matching rows got the category; others are untouched
    let stored = repo.get_transactions().unwrap();
    for tx in &stored {
        if tx.reference.trim().to_lowercase() == "coffee shop" {
            assert_eq!(tx.category_id, Some(eating_out.id));
        } else {
            assert_eq!(tx.category_id, None);
        }
    }
}

#[test]
fn test_recategorization_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));

    ingest
        .ingest(&[record((2024, 1, 5), "Coffee Shop", -450)])
        .unwrap();
    let cat = categories.create("Eating Out").unwrap();

    let first = mappings.assign_category("Coffee Shop", cat.id).unwrap();
    assert_eq!(first.updated, 1);

    // Second identical assignment changes nothing
    let second = mappings.assign_category("Coffee Shop", cat.id).unwrap();
    assert_eq!(second.updated, 0);

    assert_eq!(mappings.reapply("coffee shop", cat.id).unwrap(), 0);
}

#[test]
fn test_mapping_upsert_is_last_write_wins() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));

    ingest
        .ingest(&[record((2024, 1, 5), "Coffee Shop", -450)])
        .unwrap();
    let eating_out = categories.create("Eating Out").unwrap();
    let treats = categories.create("Treats").unwrap();

    mappings.assign_category("Coffee Shop", eating_out.id).unwrap();
    let reassigned = mappings.assign_category("Coffee Shop", treats.id).unwrap();
    assert_eq!(reassigned.updated, 1);

    // Still exactly one mapping for the key
    let all = mappings.list().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].normalized_reference, "coffee shop");
    assert_eq!(all[0].category_id, treats.id);
}

#[test]
fn test_assign_category_validates_input() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));

    let err = mappings.assign_category("   ", 1).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Unknown category id
    let err = mappings.assign_category("Coffee Shop", 999).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let cat = categories.create("Eating Out").unwrap();
    assert!(mappings.assign_category("Coffee Shop", cat.id).is_ok());
}

// ============================================================================
// Unmapped Reference Listing Tests
// ============================================================================

#[test]
fn test_unmapped_listing_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));
    let references = ReferenceService::new(Arc::clone(&repo));

    ingest
        .ingest(&[
            record((2024, 1, 5), "Coffee Shop", -450),
            record((2024, 1, 6), "Grocer", -3200),
        ])
        .unwrap();

    let before = references.list_unmapped(1, 10, None).unwrap();
    assert_eq!(before.total, 2);
    assert!(before
        .data
        .iter()
        .any(|r| r.reference == "Coffee Shop"));

    let cat = categories.create("Eating Out").unwrap();
    mappings.assign_category("Coffee Shop", cat.id).unwrap();

    // Mapped group disappears from the listing
    let after = references.list_unmapped(1, 10, None).unwrap();
    assert_eq!(after.total, 1);
    assert!(!after.data.iter().any(|r| r.reference == "Coffee Shop"));
}

#[test]
fn test_unmapped_listing_groups_by_normalized_key() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let references = ReferenceService::new(Arc::clone(&repo));

    // Three raw spellings of one normalized key
    ingest
        .ingest(&[
            record((2024, 1, 5), "coffee shop", -450),
            record((2024, 1, 6), "Coffee Shop", -460),
            record((2024, 1, 7), "COFFEE SHOP", -470),
        ])
        .unwrap();

    let page = references.list_unmapped(1, 10, None).unwrap();
    assert_eq!(page.total, 1);
    // Representative sample is the lexicographically smallest raw form
    assert_eq!(page.data[0].reference, "COFFEE SHOP");
}

#[test]
fn test_unmapped_listing_search_and_ordering() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let references = ReferenceService::new(Arc::clone(&repo));

    ingest
        .ingest(&[
            record((2024, 1, 5), "Zebra Cafe", -450),
            record((2024, 1, 6), "Acme Corp", -3200),
            record((2024, 1, 7), "Acme Stores", -900),
        ])
        .unwrap();

    let all = references.list_unmapped(1, 10, None).unwrap();
    let names: Vec<&str> = all.data.iter().map(|r| r.reference.as_str()).collect();
    assert_eq!(names, vec!["Acme Corp", "Acme Stores", "Zebra Cafe"]);

    // Case-insensitive substring match
    let filtered = references.list_unmapped(1, 10, Some("acme")).unwrap();
    assert_eq!(filtered.total, 2);

    let filtered = references.list_unmapped(1, 10, Some("ZEBRA")).unwrap();
    assert_eq!(filtered.total, 1);
}

#[test]
fn test_unmapped_listing_pagination() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let references = ReferenceService::new(Arc::clone(&repo));

    let batch: Vec<TransactionRecord> = (0..5)
        .map(|i| record((2024, 1, 5 + i), &format!("Merchant {}", i), -100 - i64::from(i)))
        .collect();
    ingest.ingest(&batch).unwrap();

    let page1 = references.list_unmapped(1, 2, None).unwrap();
    assert_eq!(page1.data.len(), 2);
    assert_eq!(page1.total, 5);
    assert_eq!(page1.total_pages, 3);
    assert!(page1.has_more);

    let page3 = references.list_unmapped(3, 2, None).unwrap();
    assert_eq!(page3.data.len(), 1);
    assert!(!page3.has_more);

    // Out-of-range parameters are clamped rather than rejected
    let clamped = references.list_unmapped(0, 500, None).unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.limit, 100);
}

// ============================================================================
// Category Management Tests
// ============================================================================

#[test]
fn test_category_create_is_upsert_on_name() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let categories = CategoryService::new(Arc::clone(&repo));

    let first = categories.create("Groceries").unwrap();
    let second = categories.create("Groceries").unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(categories.list().unwrap().len(), 1);
}

#[test]
fn test_category_rename_errors() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let categories = CategoryService::new(Arc::clone(&repo));

    let groceries = categories.create("Groceries").unwrap();
    categories.create("Rent").unwrap();

    let err = categories.rename(999, "Whatever").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Taking an existing name violates the unique constraint
    let err = categories.rename(groceries.id, "Rent").unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let renamed = categories.rename(groceries.id, "Food").unwrap();
    assert_eq!(renamed.name, "Food");
}

#[test]
fn test_category_delete_cascades_to_mappings_and_unsets_transactions() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));
    let references = ReferenceService::new(Arc::clone(&repo));

    ingest
        .ingest(&[record((2024, 1, 5), "Coffee Shop", -450)])
        .unwrap();
    let cat = categories.create("Eating Out").unwrap();
    mappings.assign_category("Coffee Shop", cat.id).unwrap();

    categories.delete(cat.id).unwrap();

    // Mapping removed, transaction left uncategorized, reference unmapped again
    assert!(mappings.list().unwrap().is_empty());
    let stored = repo.get_transactions().unwrap();
    assert_eq!(stored[0].category_id, None);
    assert_eq!(references.list_unmapped(1, 10, None).unwrap().total, 1);

    let err = categories.delete(cat.id).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ============================================================================
// Account / Amount History Tests
// ============================================================================

#[test]
fn test_accounts_list_latest_amount() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let accounts = AccountService::new(Arc::clone(&repo));

    let id = accounts.create("Checking", Some("primary")).unwrap();

    // No history yet: latest amount is zero
    let listed = accounts.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].amount, Decimal::ZERO);

    accounts
        .add_amount(
            Decimal::new(100_000, 2),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            id,
        )
        .unwrap();
    accounts
        .add_amount(
            Decimal::new(125_000, 2),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            id,
        )
        .unwrap();

    let listed = accounts.list().unwrap();
    assert_eq!(listed[0].amount, Decimal::new(125_000, 2));
}

#[test]
fn test_amount_listing_filters_and_grouping() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let accounts = AccountService::new(Arc::clone(&repo));

    let checking = accounts.create("Checking", None).unwrap();
    let savings = accounts.create("Savings", None).unwrap();
    let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

    accounts.add_amount(Decimal::new(10_000, 2), jan, checking).unwrap();
    accounts.add_amount(Decimal::new(20_000, 2), jan, savings).unwrap();
    accounts.add_amount(Decimal::new(15_000, 2), feb, checking).unwrap();

    // Filter by account
    let query = AmountQuery {
        account_ids: Some(vec![checking]),
        ascending: true,
        ..Default::default()
    };
    let AmountListing::Plain(rows) = accounts.list_amounts(&query).unwrap() else {
        panic!("expected unpaginated listing");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, jan);
    assert_eq!(rows[0].account_name, "Checking");

    // Grouped: one summed row per date
    let query = AmountQuery {
        grouped: true,
        ascending: true,
        ..Default::default()
    };
    let AmountListing::Plain(rows) = accounts.list_amounts(&query).unwrap() else {
        panic!("expected unpaginated listing");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].amount, Decimal::new(30_000, 2));
    assert_eq!(rows[0].account_name, "All");
    assert_eq!(rows[0].id, None);

    // Date range filter
    let query = AmountQuery {
        from: Some(feb),
        ..Default::default()
    };
    let AmountListing::Plain(rows) = accounts.list_amounts(&query).unwrap() else {
        panic!("expected unpaginated listing");
    };
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_amount_listing_pagination() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let accounts = AccountService::new(Arc::clone(&repo));

    let id = accounts.create("Checking", None).unwrap();
    for month in 1..=6 {
        accounts
            .add_amount(
                Decimal::new(1000 * i64::from(month), 2),
                NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
                id,
            )
            .unwrap();
    }

    let query = AmountQuery {
        page: Some(2),
        limit: Some(4),
        ..Default::default()
    };
    let AmountListing::Paged(page) = accounts.list_amounts(&query).unwrap() else {
        panic!("expected paginated listing");
    };
    assert_eq!(page.total, 6);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.data.len(), 2);
    assert!(!page.has_more);
}

#[test]
fn test_account_delete_removes_history() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let accounts = AccountService::new(Arc::clone(&repo));

    let id = accounts.create("Checking", None).unwrap();
    accounts
        .add_amount(
            Decimal::new(100, 2),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            id,
        )
        .unwrap();

    accounts.delete(id).unwrap();
    assert!(accounts.list().unwrap().is_empty());

    let AmountListing::Plain(rows) = accounts
        .list_amounts(&AmountQuery::default())
        .unwrap()
    else {
        panic!("expected unpaginated listing");
    };
    assert!(rows.is_empty());

    // Recording against the deleted account fails
    let err = accounts
        .add_amount(
            Decimal::new(100, 2),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            id,
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ============================================================================
// Flow Summary Tests
// ============================================================================

#[test]
fn test_flow_summary_builds_nodes_and_links() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let categories = CategoryService::new(Arc::clone(&repo));
    let mappings = MappingService::new(Arc::clone(&repo));
    let flow = FlowService::new(Arc::clone(&repo));

    ingest
        .ingest(&[
            record((2024, 1, 1), "Employer", 500_000),
            record((2024, 1, 5), "Coffee Shop", -450),
            record((2024, 1, 6), "Grocer", -3200),
        ])
        .unwrap();
    let salary = categories.create("Salary").unwrap();
    let food = categories.create("Food").unwrap();
    mappings.assign_category("Employer", salary.id).unwrap();
    mappings.assign_category("Grocer", food.id).unwrap();

    let summary = flow.summary().unwrap();

    // Income link into the center, expense links out of it
    assert!(summary
        .links
        .iter()
        .any(|l| l.source == "Salary" && l.target == "Total Income"));
    assert!(summary
        .links
        .iter()
        .any(|l| l.source == "Total Income" && l.target == "Food"));
    // Uncategorized expense (the coffee) shows up too
    assert!(summary
        .links
        .iter()
        .any(|l| l.source == "Total Income" && l.target == "Uncategorized"));

    // Income exceeds expenses, so an Excess node absorbs the rest
    let excess = summary
        .links
        .iter()
        .find(|l| l.target == "Excess")
        .expect("excess link");
    assert_eq!(excess.value, Decimal::new(500_000 - 450 - 3200, 2));
}

#[test]
fn test_flow_summary_disambiguates_two_sided_category() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let ingest = IngestService::new(Arc::clone(&repo));
    let flow = FlowService::new(Arc::clone(&repo));

    // Uncategorized appears on both sides: income node gets a suffix
    ingest
        .ingest(&[
            record((2024, 1, 1), "Refund", 1000),
            record((2024, 1, 2), "Shop", -500),
        ])
        .unwrap();

    let summary = flow.summary().unwrap();
    assert!(summary
        .links
        .iter()
        .any(|l| l.source == "Uncategorized (Income)" && l.target == "Total Income"));
    assert!(summary
        .links
        .iter()
        .any(|l| l.source == "Total Income" && l.target == "Uncategorized"));
}
