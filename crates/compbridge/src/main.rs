//! compbridge - live preview and fault console for JSX components
//!
//! Main entry point for the compbridge CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, export, preview, snippets, templates, watch};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// compbridge - live preview and fault console for JSX components
#[derive(Parser)]
#[command(name = "compbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a component once and report faults
    Preview(preview::PreviewArgs),

    /// Re-render a component whenever its file changes
    Watch(watch::WatchArgs),

    /// Manage saved snippets
    Snippets(snippets::SnippetsArgs),

    /// Browse built-in templates
    Templates(templates::TemplatesArgs),

    /// Export a rendered component as SVG
    Export(export::ExportArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = compbridge_config::load_config(None)?;
    let logging = loaded.config.logging();

    // Console (human-readable) + rotating JSON file
    let level = if cli.verbose { "debug" } else { logging.level.as_str() };
    let filter = format!(
        "compbridge={level},compbridge_preview={level},compbridge_script={level},\
         compbridge_store={level},compbridge_config={level},warn"
    );

    use tracing_subscriber::prelude::*;
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(filter));

    let mut _guard = None;
    let file_layer = if logging.file {
        let log_dir = compbridge_config::xdg_config_dir()
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| std::path::PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "compbridge.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        _guard = Some(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "compbridge=trace,compbridge_preview=trace,compbridge_script=trace,\
                     compbridge_store=trace,compbridge_config=trace,info",
                )),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config: loaded.config,
    };

    match cli.command {
        Commands::Preview(args) => preview::run(args, &ctx).await,
        Commands::Watch(args) => watch::run(args, &ctx).await,
        Commands::Snippets(args) => snippets::run(args, &ctx).await,
        Commands::Templates(args) => templates::run(args, &ctx).await,
        Commands::Export(args) => export::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
