//! Finbook HTTP server library
//!
//! The router and error mapping live here so integration tests can
//! mount the API without binding a socket.

pub mod api;
pub mod error;
