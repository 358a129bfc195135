//! Server configuration
/// Environment loader
mod loader;
/// Settings and errors
mod types;

pub use loader::{
    CLIENT_ORIGIN_VAR,
    HOST_VAR,
    PORT_VAR,
    TRANSLATIONS_PATH_VAR,
    load_from_env,
    load_with,
};
pub use types::{
    ConfigError,
    ServerSettings,
    ValidationError,
};
