//! CLI command handlers.

pub mod config;
pub mod export;
pub mod output;
pub mod preview;
pub mod snippets;
pub mod templates;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use compbridge_config::CompbridgeConfig;
use compbridge_store::SnippetStore;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Merged configuration.
    pub config: CompbridgeConfig,
}

impl Context {
    /// Open the snippet store named by `[store]`.
    pub fn open_store(&self) -> Result<SnippetStore> {
        Ok(SnippetStore::open(self.config.store().resolved_path())?)
    }
}

/// Where the component's input data comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Input data as inline JSON
    #[arg(long, conflicts_with_all = ["data_file", "sample"])]
    pub data: Option<String>,

    /// Read input data from a JSON file
    #[arg(long, conflicts_with = "sample")]
    pub data_file: Option<PathBuf>,

    /// Use the built-in sample data
    #[arg(long)]
    pub sample: bool,
}

impl InputArgs {
    /// Raw input text, or `None` when no input was given.
    pub fn read(&self) -> Result<Option<String>> {
        if let Some(ref data) = self.data {
            return Ok(Some(data.clone()));
        }
        if let Some(ref path) = self.data_file {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input data {}", path.display()))?;
            return Ok(Some(raw));
        }
        if self.sample {
            return Ok(Some(compbridge_preview::sample_input()));
        }
        Ok(None)
    }
}

/// Read a component source file.
pub fn read_source(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read component source {}", path.display()))
}
