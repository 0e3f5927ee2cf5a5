//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Root configuration, one optional table per concern.
///
/// ```toml
/// [preview]
/// settle_delay_ms = 100
///
/// [watch]
/// debounce_ms = 150
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompbridgeConfig {
    /// Preview engine configuration.
    pub preview: Option<PreviewSection>,

    /// Watch mode configuration.
    pub watch: Option<WatchSection>,

    /// Snippet store configuration.
    pub store: Option<StoreSection>,

    /// Logging configuration.
    pub logging: Option<LoggingSection>,
}

impl CompbridgeConfig {
    /// Create an empty configuration (all sections at defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: CompbridgeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: CompbridgeConfig) {
        if other.preview.is_some() {
            self.preview = other.preview;
        }
        if other.watch.is_some() {
            self.watch = other.watch;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Preview section, or defaults when absent.
    pub fn preview(&self) -> PreviewSection {
        self.preview.clone().unwrap_or_default()
    }

    /// Watch section, or defaults when absent.
    pub fn watch(&self) -> WatchSection {
        self.watch.clone().unwrap_or_default()
    }

    /// Store section, or defaults when absent.
    pub fn store(&self) -> StoreSection {
        self.store.clone().unwrap_or_default()
    }

    /// Logging section, or defaults when absent.
    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref preview) = self.preview
            && preview.max_call_depth == 0
        {
            return Err(ConfigError::InvalidValue {
                field: "preview.max_call_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview
// ─────────────────────────────────────────────────────────────────────────────

/// How the component entry point is picked out of free-form source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryMode {
    /// First `const`, `function` or `class` declaration in the source.
    #[default]
    FirstDeclaration,
    /// The identifier named by `export default <name>`.
    DefaultExport,
}

/// Preview engine configuration.
///
/// ```toml
/// [preview]
/// settle_delay_ms = 100
/// export_settle_delay_ms = 300
/// clear_on_edit = true
/// entry = "first-declaration"
/// max_call_depth = 256
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSection {
    /// Delay after the render call before judging the output empty.
    pub settle_delay_ms: u64,
    /// Delay before an export inspects the mounted output.
    pub export_settle_delay_ms: u64,
    /// Clear the error console on every source edit.
    pub clear_on_edit: bool,
    /// Entry-point resolution mode.
    pub entry: EntryMode,
    /// Maximum nested call depth inside the sandbox.
    pub max_call_depth: usize,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            export_settle_delay_ms: 300,
            clear_on_edit: true,
            entry: EntryMode::FirstDeclaration,
            max_call_depth: 256,
        }
    }
}

impl PreviewSection {
    /// Settle delay as a `Duration`.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Export settle delay as a `Duration`.
    pub fn export_settle_delay(&self) -> Duration {
        Duration::from_millis(self.export_settle_delay_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watch
// ─────────────────────────────────────────────────────────────────────────────

/// Watch mode configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Debounce window for file-system events.
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: 150 }
    }
}

impl WatchSection {
    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Snippet store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Path to the snippets JSON file.
    /// Defaults to `<data dir>/compbridge/snippets.json`.
    pub path: Option<PathBuf>,
}

impl StoreSection {
    /// Resolve the snippet file path.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(ref path) = self.path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("compbridge"))
            .unwrap_or_else(|| PathBuf::from(".compbridge"))
            .join("snippets.json")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Console log level for compbridge crates.
    pub level: String,
    /// Also write a rolling JSON log file under the config directory.
    pub file: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CompbridgeConfig::from_toml("").unwrap();
        assert!(config.preview.is_none());

        let preview = config.preview();
        assert_eq!(preview.settle_delay(), Duration::from_millis(100));
        assert_eq!(preview.export_settle_delay(), Duration::from_millis(300));
        assert!(preview.clear_on_edit);
        assert_eq!(preview.entry, EntryMode::FirstDeclaration);
        assert_eq!(config.watch().debounce_ms, 150);
        assert_eq!(config.logging().level, "info");
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = CompbridgeConfig::from_toml(
            r#"
[preview]
settle_delay_ms = 250
entry = "default-export"
"#,
        )
        .unwrap();
        let preview = config.preview();
        assert_eq!(preview.settle_delay_ms, 250);
        assert_eq!(preview.entry, EntryMode::DefaultExport);
        assert_eq!(preview.max_call_depth, 256);
    }

    #[test]
    fn test_zero_call_depth_rejected() {
        let err = CompbridgeConfig::from_toml("[preview]\nmax_call_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_merge_overrides_by_section() {
        let mut base = CompbridgeConfig::from_toml(
            "[preview]\nsettle_delay_ms = 50\n[watch]\ndebounce_ms = 10\n",
        )
        .unwrap();
        let layer = CompbridgeConfig::from_toml("[preview]\nclear_on_edit = false\n").unwrap();
        base.merge(layer);

        // Whole section replaced, so the base delay is gone.
        assert_eq!(base.preview().settle_delay_ms, 100);
        assert!(!base.preview().clear_on_edit);
        assert_eq!(base.watch().debounce_ms, 10);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = CompbridgeConfig::new();
        config.store = Some(StoreSection {
            path: Some(PathBuf::from("/tmp/snippets.json")),
        });
        let text = config.to_toml().unwrap();
        let parsed = CompbridgeConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_store_path_override() {
        let section = StoreSection {
            path: Some(PathBuf::from("/data/mine.json")),
        };
        assert_eq!(section.resolved_path(), PathBuf::from("/data/mine.json"));
        assert!(StoreSection::default().resolved_path().ends_with("snippets.json"));
    }
}
