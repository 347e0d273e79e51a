//! # Runtime Constants
//!
//! Reserved keys, attribute spellings and defaults shared across the runtime.

/// Reserved registry key for the init lifecycle slot
pub const INIT_KEY: &str = "init";

/// Reserved registry key for the wrapup lifecycle slot
pub const WRAPUP_KEY: &str = "wrapup";

/// Registry key of the catch-all fire handler list
pub const FIRE_KEY: &str = "_fire";

/// Port attribute spellings as they appear in accessor descriptions
pub mod attributes {
    pub const READ: &str = "read";
    pub const WRITE: &str = "write";
    pub const EVENT: &str = "event";
    pub const EVENT_PERIODIC: &str = "eventPeriodic";
    pub const EVENT_CHANGE: &str = "eventChange";
}

/// Environment variables consulted by configuration and logging
pub mod env {
    /// Deployment environment (development, test, production)
    pub const ENVIRONMENT: &str = "ACCESSOR_ENV";

    /// Prefix for configuration overrides, e.g. `ACCESSOR_DISPATCH_TIMEOUT_MS`
    pub const CONFIG_PREFIX: &str = "ACCESSOR";

    /// Optional path of the runtime configuration file
    pub const CONFIG_FILE: &str = "ACCESSOR_CONFIG_FILE";
}

/// Default runtime configuration values
pub mod defaults {
    pub const ENVIRONMENT: &str = "development";
    pub const OBSERVER_CHANNEL_CAPACITY: usize = 64;
    pub const CONFIG_FILE_STEM: &str = "config/accessor-runtime";
}

/// Returns true when `name` is one of the reserved lifecycle keys
pub fn is_lifecycle_key(name: &str) -> bool {
    name == INIT_KEY || name == WRAPUP_KEY
}
