//! DuckDB repository implementation

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, AmountEntry, Category, ReferenceMapping, StoredTransaction, TransactionRecord,
    UnmappedReference,
};
use crate::services::{CategoryFlowTotal, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Filter and pagination arguments for the amounts history query
#[derive(Debug, Default, Clone)]
pub struct AmountFilter {
    pub account_ids: Option<Vec<i64>>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Sort by date ascending instead of the default descending
    pub ascending: bool,
    /// Sum amounts per date across all matching accounts
    pub grouped: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// DuckDB repository implementation
///
/// A single connection behind a mutex; the database's uniqueness
/// constraints (unique_hash, normalized_reference) are the only
/// synchronization the ingestion and mapping paths rely on.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Create a new DuckDB repository
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process still holds the database file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            "database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Disable extension autoloading to avoid macOS code signing issues
        // (cached extensions in ~/.duckdb/extensions may have different Team IDs)
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.conn.lock().unwrap();
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Transaction operations ===

    /// Insert a batch of transactions, skipping rows whose content hash
    /// already exists. Returns the number of rows actually inserted.
    ///
    /// The whole batch runs inside one storage transaction: either every
    /// row is processed (with per-row skip-on-duplicate) or nothing is
    /// committed. This is what makes re-uploading a CSV idempotent.
    pub fn insert_transactions_dedup(
        &self,
        records: &[(TransactionRecord, String)],
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = (|| -> Result<usize> {
            let mut stmt = conn.prepare(
                "INSERT INTO transactions (date, reference, description, amount, balance, unique_hash)
                 VALUES (?, ?, ?, ?, ?, ?)
                 ON CONFLICT (unique_hash) DO NOTHING",
            )?;

            let mut inserted = 0;
            for (record, hash) in records {
                let changed = stmt.execute(params![
                    record.date.to_string(),
                    record.reference,
                    record.description,
                    record.amount.to_string().parse::<f64>().unwrap_or(0.0),
                    record
                        .balance
                        .map(|b| b.to_string().parse::<f64>().unwrap_or(0.0)),
                    hash,
                ])?;
                inserted += changed;
            }
            Ok(inserted)
        })();

        match outcome {
            Ok(inserted) => {
                conn.execute_batch("COMMIT")?;
                Ok(inserted)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    pub fn get_transactions(&self) -> Result<Vec<StoredTransaction>> {
        let conn = self.conn.lock().unwrap();
        // Cast DATE and DECIMAL columns to VARCHAR so they round-trip with
        // full precision through the Rust binding.
        let mut stmt = conn.prepare(
            "SELECT id, date::VARCHAR, reference, description, amount::VARCHAR,
                    balance::VARCHAR, category_id, unique_hash
             FROM transactions
             ORDER BY date DESC, id DESC",
        )?;

        let transactions = stmt
            .query_map([], |row| Ok(row_to_transaction(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(transactions)
    }

    pub fn get_transaction_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Reference mapping operations ===

    /// Upsert a reference mapping and retroactively recategorize matching
    /// historical transactions, in a single storage transaction.
    ///
    /// Returns the number of transaction rows whose category changed.
    pub fn upsert_mapping_and_recategorize(
        &self,
        normalized_reference: &str,
        category_id: i64,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = (|| -> Result<usize> {
            conn.execute(
                "INSERT INTO reference_mappings (normalized_reference, category_id)
                 VALUES (?, ?)
                 ON CONFLICT (normalized_reference) DO UPDATE SET category_id = EXCLUDED.category_id",
                params![normalized_reference, category_id],
            )?;
            Self::recategorize_with_conn(&conn, normalized_reference, category_id)
        })();

        match outcome {
            Ok(updated) => {
                conn.execute_batch("COMMIT")?;
                Ok(updated)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Re-apply a category to every transaction matching the normalized
    /// reference whose category differs. Idempotent: a second call with
    /// the same arguments updates zero rows.
    pub fn recategorize_by_reference(
        &self,
        normalized_reference: &str,
        category_id: i64,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Self::recategorize_with_conn(&conn, normalized_reference, category_id)
    }

    fn recategorize_with_conn(
        conn: &Connection,
        normalized_reference: &str,
        category_id: i64,
    ) -> Result<usize> {
        let updated = conn.execute(
            "UPDATE transactions
             SET category_id = ?
             WHERE lower(trim(reference)) = ?
               AND category_id IS DISTINCT FROM ?",
            params![category_id, normalized_reference, category_id],
        )?;
        Ok(updated)
    }

    pub fn get_mappings(&self) -> Result<Vec<ReferenceMapping>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT normalized_reference, category_id
             FROM reference_mappings
             ORDER BY normalized_reference",
        )?;

        let mappings = stmt
            .query_map([], |row| {
                Ok(ReferenceMapping {
                    normalized_reference: row.get(0)?,
                    category_id: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(mappings)
    }

    /// Count distinct normalized references with no mapping entry
    pub fn count_unmapped_references(&self, like: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = if let Some(pattern) = like {
            conn.query_row(
                "WITH grouped AS (
                    SELECT lower(trim(reference)) AS key, min(reference) AS sample
                    FROM transactions
                    GROUP BY lower(trim(reference))
                )
                SELECT COUNT(*)
                FROM grouped g
                LEFT JOIN reference_mappings rm ON g.key = rm.normalized_reference
                WHERE rm.normalized_reference IS NULL
                  AND g.sample ILIKE ?",
                params![pattern],
                |row| row.get(0),
            )?
        } else {
            conn.query_row(
                "WITH grouped AS (
                    SELECT lower(trim(reference)) AS key, min(reference) AS sample
                    FROM transactions
                    GROUP BY lower(trim(reference))
                )
                SELECT COUNT(*)
                FROM grouped g
                LEFT JOIN reference_mappings rm ON g.key = rm.normalized_reference
                WHERE rm.normalized_reference IS NULL",
                [],
                |row| row.get(0),
            )?
        };
        Ok(count)
    }

    /// Page through distinct unmapped references, ordered by their
    /// representative sample (lexicographically smallest raw form).
    pub fn list_unmapped_references(
        &self,
        like: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UnmappedReference>> {
        let conn = self.conn.lock().unwrap();

        let collect = |stmt: &mut duckdb::Statement<'_>,
                       params: &[&dyn duckdb::ToSql]|
         -> Result<Vec<UnmappedReference>> {
            let rows = stmt
                .query_map(params, |row| {
                    Ok(UnmappedReference {
                        reference: row.get(0)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            Ok(rows)
        };

        if let Some(pattern) = like {
            let mut stmt = conn.prepare(
                "WITH grouped AS (
                    SELECT lower(trim(reference)) AS key, min(reference) AS sample
                    FROM transactions
                    GROUP BY lower(trim(reference))
                )
                SELECT g.sample
                FROM grouped g
                LEFT JOIN reference_mappings rm ON g.key = rm.normalized_reference
                WHERE rm.normalized_reference IS NULL
                  AND g.sample ILIKE ?
                ORDER BY g.sample ASC
                LIMIT ? OFFSET ?",
            )?;
            collect(&mut stmt, &[&pattern, &limit, &offset])
        } else {
            let mut stmt = conn.prepare(
                "WITH grouped AS (
                    SELECT lower(trim(reference)) AS key, min(reference) AS sample
                    FROM transactions
                    GROUP BY lower(trim(reference))
                )
                SELECT g.sample
                FROM grouped g
                LEFT JOIN reference_mappings rm ON g.key = rm.normalized_reference
                WHERE rm.normalized_reference IS NULL
                ORDER BY g.sample ASC
                LIMIT ? OFFSET ?",
            )?;
            collect(&mut stmt, &[&limit, &offset])
        }
    }

    // === Category operations ===

    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;

        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(categories)
    }

    pub fn category_exists(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE id = ?",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a category, or return the existing row on a name collision
    pub fn upsert_category(&self, name: &str) -> Result<Category> {
        let conn = self.conn.lock().unwrap();
        let category = conn.query_row(
            "INSERT INTO categories (name) VALUES (?)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name",
            params![name],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?;
        Ok(category)
    }

    /// Rename a category. Returns None when the id does not exist;
    /// a duplicate name surfaces as a Conflict error.
    pub fn rename_category(&self, id: i64, name: &str) -> Result<Option<Category>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("UPDATE categories SET name = ? WHERE id = ? RETURNING id, name")?;
        let mut rows = stmt.query(params![name, id])?;

        match rows.next()? {
            Some(row) => Ok(Some(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    /// Delete a category and clean up its dependents.
    ///
    /// DuckDB does not run ON DELETE actions, so the cascade is done in
    /// ordered statements inside one transaction: mappings are removed,
    /// transactions are left uncategorized, then the category goes.
    /// Returns false when the id does not exist.
    pub fn delete_category(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = (|| -> Result<bool> {
            conn.execute(
                "DELETE FROM reference_mappings WHERE category_id = ?",
                params![id],
            )?;
            conn.execute(
                "UPDATE transactions SET category_id = NULL WHERE category_id = ?",
                params![id],
            )?;
            let deleted = conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
            Ok(deleted > 0)
        })();

        match outcome {
            Ok(deleted) => {
                conn.execute_batch("COMMIT")?;
                Ok(deleted)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    // === Account operations ===

    pub fn get_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn.lock().unwrap();
        // Latest amount per account via a correlated subquery
        let mut stmt = conn.prepare(
            "SELECT a.id, a.name, a.color,
                    COALESCE((SELECT am.amount FROM amounts am
                              WHERE am.account_id = a.id
                              ORDER BY am.date DESC, am.id DESC LIMIT 1), 0)::VARCHAR AS amount
             FROM accounts a
             ORDER BY a.id",
        )?;

        let accounts = stmt
            .query_map([], |row| {
                let amount_str: String = row.get(3)?;
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    amount: Decimal::from_str_exact(&amount_str).unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(accounts)
    }

    pub fn account_exists(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE id = ?",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_account(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let id: i64 = conn.query_row(
            "INSERT INTO accounts (name, color) VALUES (?, ?) RETURNING id",
            params![name, color],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn rename_account(&self, id: i64, name: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE accounts SET name = ? WHERE id = ?",
            params![name, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete an account and its amount history (ordered, no DB cascade)
    pub fn delete_account(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("BEGIN TRANSACTION")?;

        let outcome = (|| -> Result<bool> {
            conn.execute("DELETE FROM amounts WHERE account_id = ?", params![id])?;
            let deleted = conn.execute("DELETE FROM accounts WHERE id = ?", params![id])?;
            Ok(deleted > 0)
        })();

        match outcome {
            Ok(deleted) => {
                conn.execute_batch("COMMIT")?;
                Ok(deleted)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    // === Amount history operations ===

    pub fn insert_amount(&self, amount: Decimal, date: NaiveDate, account_id: i64) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let id: i64 = conn.query_row(
            "INSERT INTO amounts (amount, date, account_id) VALUES (?, ?, ?) RETURNING id",
            params![
                amount.to_string().parse::<f64>().unwrap_or(0.0),
                date.to_string(),
                account_id,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn delete_amount(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM amounts WHERE id = ?", params![id])?;
        Ok(changed > 0)
    }

    /// Amount history rows matching the filter
    pub fn query_amounts(&self, filter: &AmountFilter) -> Result<Vec<AmountEntry>> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params_vec) = Self::amount_where_clause(filter);
        let order = if filter.ascending {
            "ORDER BY am.date ASC"
        } else {
            "ORDER BY am.date DESC"
        };
        let limit_offset = match (filter.limit, filter.offset) {
            (Some(limit), Some(offset)) => format!("LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => format!("LIMIT {}", limit),
            _ => String::new(),
        };

        let sql = if filter.grouped {
            format!(
                "SELECT NULL, am.date::VARCHAR, SUM(am.amount)::VARCHAR, 'All', NULL
                 FROM amounts am JOIN accounts a ON a.id = am.account_id
                 {} GROUP BY am.date {} {}",
                where_clause, order, limit_offset
            )
        } else {
            format!(
                "SELECT am.id, am.date::VARCHAR, am.amount::VARCHAR, a.name, a.color
                 FROM amounts am JOIN accounts a ON a.id = am.account_id
                 {} {} {}",
                where_clause, order, limit_offset
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn duckdb::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

        let entries = stmt
            .query_map(param_refs.as_slice(), |row| {
                let date_str: String = row.get(1)?;
                let amount_str: String = row.get(2)?;
                Ok(AmountEntry {
                    id: row.get(0)?,
                    date: parse_date(&date_str),
                    amount: Decimal::from_str_exact(&amount_str).unwrap_or_default(),
                    account_name: row.get(3)?,
                    account_color: row.get(4)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Total row count for the filter (grouped counts distinct dates)
    pub fn count_amounts(&self, filter: &AmountFilter) -> Result<i64> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params_vec) = Self::amount_where_clause(filter);
        let sql = if filter.grouped {
            format!(
                "SELECT COUNT(*) FROM (
                    SELECT am.date
                    FROM amounts am JOIN accounts a ON a.id = am.account_id
                    {} GROUP BY am.date
                 ) t",
                where_clause
            )
        } else {
            format!(
                "SELECT COUNT(*)
                 FROM amounts am JOIN accounts a ON a.id = am.account_id
                 {}",
                where_clause
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn duckdb::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let count: i64 = stmt.query_row(param_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Build the shared WHERE clause for the amounts queries.
    /// Account ids are validated i64s, so inlining them is safe.
    fn amount_where_clause(filter: &AmountFilter) -> (String, Vec<Box<dyn duckdb::ToSql>>) {
        let mut parts: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn duckdb::ToSql>> = Vec::new();

        if let Some(ids) = &filter.account_ids {
            if !ids.is_empty() {
                let list = ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                parts.push(format!("am.account_id IN ({})", list));
            }
        }
        if let Some(from) = filter.from {
            parts.push("am.date >= ?".to_string());
            params_vec.push(Box::new(from.to_string()));
        }
        if let Some(to) = filter.to {
            parts.push("am.date <= ?".to_string());
            params_vec.push(Box::new(to.to_string()));
        }

        let clause = if parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", parts.join(" AND "))
        };
        (clause, params_vec)
    }

    // === Flow summary operations ===

    /// Income/expense totals per category, 'Uncategorized' for NULL
    pub fn get_category_flow_totals(&self) -> Result<Vec<CategoryFlowTotal>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(c.name, 'Uncategorized') AS name,
                    t.amount >= 0 AS is_income,
                    SUM(ABS(t.amount))::VARCHAR AS value
             FROM transactions t
             LEFT JOIN categories c ON t.category_id = c.id
             GROUP BY name, is_income
             ORDER BY name, is_income",
        )?;

        let totals = stmt
            .query_map([], |row| {
                let value_str: String = row.get(2)?;
                Ok(CategoryFlowTotal {
                    name: row.get(0)?,
                    is_income: row.get(1)?,
                    value: Decimal::from_str_exact(&value_str).unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(totals)
    }
}

fn row_to_transaction(row: &duckdb::Row) -> StoredTransaction {
    let date_str: String = row.get(1).unwrap_or_default();
    let amount_str: String = row.get(4).unwrap_or_default();
    let balance_str: Option<String> = row.get(5).ok();

    StoredTransaction {
        id: row.get(0).unwrap_or_default(),
        date: parse_date(&date_str),
        reference: row.get(2).unwrap_or_default(),
        description: row.get(3).ok(),
        amount: Decimal::from_str_exact(&amount_str).unwrap_or_default(),
        balance: balance_str.and_then(|s| Decimal::from_str_exact(&s).ok()),
        category_id: row.get(6).ok().flatten(),
        unique_hash: row.get(7).unwrap_or_default(),
    }
}

/// Parse a DuckDB DATE rendered as VARCHAR (YYYY-MM-DD)
fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap())
}
