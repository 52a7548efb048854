//! NimbusData - an HTTP data gateway over relational stores.
//!
//! This library exposes the core modules for use by the server binary and
//! integration tests.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod server;
