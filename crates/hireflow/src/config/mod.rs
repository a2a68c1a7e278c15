pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, config_from_env, load_config, load_config_from_str,
    load_config_from_yaml,
};
pub use schema::{Config, DatabaseConfig, OrchestratorConfig, RetentionConfig};
