//! Account service - accounts and their periodic amount history

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::adapters::duckdb::{AmountFilter, DuckDbRepository};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, AmountEntry};
use crate::services::reference::{clamp_pagination, Page};

/// Query parameters for the amount history listing
#[derive(Debug, Default, Clone)]
pub struct AmountQuery {
    pub account_ids: Option<Vec<i64>>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub ascending: bool,
    /// Sum amounts per date across the matching accounts
    pub grouped: bool,
    /// Pagination only applies when both are present
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Amount history listing: paginated only when the caller asked for it
#[derive(Debug)]
pub enum AmountListing {
    Plain(Vec<AmountEntry>),
    Paged(Page<AmountEntry>),
}

/// Accounts and amount history
pub struct AccountService {
    repository: Arc<DuckDbRepository>,
}

impl AccountService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// All accounts with their latest recorded amount (0 when none)
    pub fn list(&self) -> Result<Vec<Account>> {
        self.repository.get_accounts()
    }

    pub fn create(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name is required"));
        }
        self.repository.insert_account(name, color)
    }

    pub fn rename(&self, id: i64, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name is required"));
        }
        if !self.repository.rename_account(id, name)? {
            return Err(Error::not_found(format!("Account {} not found", id)));
        }
        Ok(())
    }

    /// Delete an account together with its amount history
    pub fn delete(&self, id: i64) -> Result<()> {
        if !self.repository.delete_account(id)? {
            return Err(Error::not_found(format!("Account {} not found", id)));
        }
        Ok(())
    }

    /// Record one periodic amount reading for an account
    pub fn add_amount(&self, amount: Decimal, date: NaiveDate, account_id: i64) -> Result<i64> {
        if !self.repository.account_exists(account_id)? {
            return Err(Error::not_found(format!("Account {} not found", account_id)));
        }
        self.repository.insert_amount(amount, date, account_id)
    }

    pub fn delete_amount(&self, id: i64) -> Result<()> {
        if !self.repository.delete_amount(id)? {
            return Err(Error::not_found(format!("Amount {} not found", id)));
        }
        Ok(())
    }

    /// List amount history with optional filters, ordering, grouping and
    /// pagination. Without both page and limit, all matching rows come
    /// back unpaginated (the dashboard charts consume the full series).
    pub fn list_amounts(&self, query: &AmountQuery) -> Result<AmountListing> {
        let mut filter = AmountFilter {
            account_ids: query.account_ids.clone(),
            from: query.from,
            to: query.to,
            ascending: query.ascending,
            grouped: query.grouped,
            limit: None,
            offset: None,
        };

        let (Some(page), Some(limit)) = (query.page, query.limit) else {
            return Ok(AmountListing::Plain(self.repository.query_amounts(&filter)?));
        };

        let (page, limit) = clamp_pagination(page, limit);
        filter.limit = Some(limit);
        filter.offset = Some((page - 1) * limit);

        let total = self.repository.count_amounts(&filter)?;
        let data = self.repository.query_amounts(&filter)?;
        Ok(AmountListing::Paged(Page::new(data, page, limit, total)))
    }
}
