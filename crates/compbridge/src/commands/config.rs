//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show resolved configuration and the files it came from
    Show,

    /// Show configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./compbridge.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
        ConfigCommand::Init { local } => cmd_init(local),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = compbridge_config::load_config(None)?;

    if ctx.json_output {
        let sources: Vec<_> = loaded
            .sources
            .iter()
            .map(|s| serde_json::json!({ "path": s.path, "loaded": s.loaded }))
            .collect();
        let out = serde_json::json!({
            "sources": sources,
            "warnings": loaded.warnings,
            "preview": ctx.config.preview(),
            "watch": ctx.config.watch(),
            "store": { "path": ctx.config.store().resolved_path() },
            "logging": ctx.config.logging(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("# compbridge Configuration\n");

    println!("Config file search order (later overrides earlier):");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }
    println!();

    let preview = ctx.config.preview();
    println!("Preview:");
    println!("  settle delay:        {} ms", preview.settle_delay_ms);
    println!("  export settle delay: {} ms", preview.export_settle_delay_ms);
    println!("  clear on edit:       {}", preview.clear_on_edit);
    println!("  entry:               {:?}", preview.entry);
    println!("  max call depth:      {}", preview.max_call_depth);
    println!();
    println!("Watch:");
    println!("  debounce: {} ms", ctx.config.watch().debounce_ms);
    println!();
    println!("Store:");
    println!("  path: {}", ctx.config.store().resolved_path().display());
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = ctx.config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    if let Some(path) = compbridge_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(compbridge_config::PROJECT_CONFIG_FILE)
    } else {
        compbridge_config::xdg_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let template = r#"# compbridge Configuration

[preview]
# Delay after render before judging the output empty
settle_delay_ms = 100
# Delay before export inspects the rendered output
export_settle_delay_ms = 300
# Clear the error console on every source edit
clear_on_edit = true
# How the component is found: "first-declaration" or "default-export"
entry = "first-declaration"
max_call_depth = 256

[watch]
debounce_ms = 150

# [store]
# path = "/path/to/snippets.json"

[logging]
level = "info"
file = true
"#;

    std::fs::write(&path, template)?;
    println!("Created config file: {}", path.display());

    Ok(())
}
