//! Configuration system for the compbridge component preview tool.
//!
//! Provides TOML-based configuration with:
//! - Preview engine tuning (`[preview]`: settle delays, clear-on-edit policy,
//!   entry-point resolution mode, call depth limit)
//! - Watch mode debouncing (`[watch]`)
//! - Snippet store location (`[store]`)
//! - Logging output (`[logging]`)
//!
//! Config files are layered: the user config directory first, then a
//! project-local `compbridge.toml`. Later layers override earlier ones
//! section by section.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path, ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE,
};
pub use error::{ConfigError, Result};
pub use types::*;
