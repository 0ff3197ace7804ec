//! Observability for keeper.
//! `tracing` with `EnvFilter`, per-subsystem log levels, named structured events.

pub mod events;
pub mod setup;

pub use setup::{init_tracing, init_tracing_json};
