//! # keeper-postgres
//!
//! Implements the catalog, backend and archive seams against a live
//! PostgreSQL server. The engine is synchronous, so the adapter drives a
//! `tokio-postgres` client on a private current-thread runtime.

pub mod bounds;
pub mod catalog;
pub mod ddl;
pub mod session;
pub mod sqlstate;
pub mod store;

pub use store::PgStore;
