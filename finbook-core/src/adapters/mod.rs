//! Concrete adapter implementations

pub mod duckdb;
