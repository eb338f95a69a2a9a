//! Workdeck core: context tracking domain logic.
//!
//! Business invariants live in this crate. CLI, formatting, and
//! integration layers sit on top of the [`ContextManager`] API and never
//! reach into the dataset directly.

pub mod logging;
pub mod manager;
pub mod model;
pub mod plugin;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use manager::{ContextManager, ManagerError, ManagerResult};
pub use model::context::{Context, ContextState, JsonMap, Note, DEFAULT_RECENT_NOTES};
pub use model::dataset::Dataset;
pub use model::stack::{ContextStack, DEFAULT_STACK_CAPACITY};
pub use plugin::protocol::{CommandSpec, Plugin, PluginError, PluginResult};
pub use plugin::registry::PluginRegistry;
pub use plugin::sprint::{SprintPlugin, SPRINT_PLUGIN};
pub use store::{DatasetStore, JsonStore, SqliteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
