//! Configuration merge system
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in router defaults
//! 2. Host/user config (~/.config/earcheo/cache.toml)
//! 3. Project config (.earcheo/cache.toml)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

use std::path::PathBuf;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use settings::{NetworkConfig, RouterConfig, Settings};

/// Project config path, relative to the working directory.
pub const PROJECT_CONFIG_PATH: &str = ".earcheo/cache.toml";

/// `~/.config/earcheo/cache.toml`, if a home directory is known.
pub fn default_host_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("earcheo").join("cache.toml"))
}

/// Where the disk cache lives when neither `--cache-dir` nor `cache.dir` is set.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("earcheo"))
        .unwrap_or_else(|| PathBuf::from(".earcheo").join("cache"))
}
