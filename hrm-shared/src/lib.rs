//! # HRM Shared Library
//!
//! Domain types, persistence and business rules for the HRM backend. The
//! HTTP layer in `hrm-api` is a thin shell over [`services`].
//!
//! ## Module Organization
//!
//! - `models`: records, filters and their SQL
//! - `store`: persistence traits with PostgreSQL and in-memory backends
//! - `services`: team roster, holidays, departments, users
//! - `auth`: passwords, JWTs, bearer authentication, the permission table
//! - `db`: connection pool and migrations
//! - `error`: the business error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
