//! Finbook Core - Business logic for personal finance tracking
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (TransactionRecord, Category, ...)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB repository)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use domain::result::Result;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    normalize_reference, Account, AmountEntry, Category, ReferenceMapping, StoredTransaction,
    TransactionRecord, UnmappedReference,
};

/// Main context for Finbook operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct FinbookContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub ingest_service: IngestService,
    pub mapping_service: MappingService,
    pub reference_service: ReferenceService,
    pub category_service: CategoryService,
    pub account_service: AccountService,
    pub flow_service: FlowService,
}

impl FinbookContext {
    /// Create a new Finbook context rooted at the given data directory
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join("finbook.duckdb");
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);

        // Initialize schema
        repository.ensure_schema()?;

        let ingest_service = IngestService::new(Arc::clone(&repository));
        let mapping_service = MappingService::new(Arc::clone(&repository));
        let reference_service = ReferenceService::new(Arc::clone(&repository));
        let category_service = CategoryService::new(Arc::clone(&repository));
        let account_service = AccountService::new(Arc::clone(&repository));
        let flow_service = FlowService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            repository,
            ingest_service,
            mapping_service,
            reference_service,
            category_service,
            account_service,
            flow_service,
        })
    }
}
