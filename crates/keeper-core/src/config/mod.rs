//! Configuration system for keeper.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod bloat_config;
pub mod health_config;
pub mod keeper_config;
pub mod state_config;
pub mod store_config;
pub mod timeout_config;
pub mod view_config;

pub use bloat_config::{BloatConfig, RebuildStrategy};
pub use health_config::HealthConfig;
pub use keeper_config::{CliOverrides, KeeperConfig};
pub use state_config::StateConfig;
pub use store_config::StoreConfig;
pub use timeout_config::TimeoutConfig;
pub use view_config::{TrackedView, ViewConfig};
