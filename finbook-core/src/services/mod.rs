//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and repository interactions. Each
//! service focuses on a specific use case or feature area.

mod account;
mod category;
mod flow;
mod ingest;
mod mapping;
pub mod migration;
mod reference;

pub use account::{AccountService, AmountListing, AmountQuery};
pub use category::CategoryService;
pub use flow::{CategoryFlowTotal, FlowLink, FlowNode, FlowService, FlowSummary};
pub use ingest::{build_records, parse_csv_rows, IngestService, UploadResult};
pub use mapping::{MappingResult, MappingService};
pub use migration::{MigrationResult, MigrationService};
pub use reference::{clamp_pagination, Page, ReferenceService, MAX_PAGE_LIMIT};
