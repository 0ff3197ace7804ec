//! Run lifecycle events for embedders.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::MaintenanceEventHandler;
pub use types::*;
