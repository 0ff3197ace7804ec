//! # keeper-storage
//!
//! SQLite persistence for keeper's own state. The managed store keeps no
//! record of keeper's activity; everything keeper needs to remember between
//! runs lives here.

pub mod connection;
pub mod engine;
pub mod migrations;
pub mod queries;
pub mod retention;

pub use connection::DatabaseManager;
pub use engine::SqliteStateStore;
