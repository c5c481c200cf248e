//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Gatekeeper::reload swaps the rule set atomically
//! ```
//!
//! # Design Decisions
//! - Every field has a default; an empty file is the stock deployment
//! - Rate-limit counters live outside the config and survive reloads

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AccessLogConfig, AdminConfig, BlockedPathsConfig, ExclusionsConfig, GatekeeperConfig,
    ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig, RedirectGuardConfig,
    UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
