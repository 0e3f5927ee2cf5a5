//! Watch command - re-render on every debounced file change.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use compbridge_preview::PreviewSession;
use console::Style;
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::output::Report;
use super::{Context, read_source};

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Component source file
    pub file: PathBuf,

    /// Input data file, also watched
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

/// Which watched file a debounced batch touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Changes {
    source: bool,
    data: bool,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let source_path = canonical(&args.file)?;
    let data_path = args.data_file.as_deref().map(canonical).transpose()?;

    let mut session = PreviewSession::new(ctx.config.preview());
    if let Some(ref path) = data_path {
        session.set_input(std::fs::read_to_string(path)?)?;
    }
    session.set_source(read_source(&source_path)?)?;
    session.settled().await;
    print(&session, ctx)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Changes>();
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(ctx.config.watch().debounce(), notify_tx)
        .map_err(|e| anyhow::anyhow!("watcher init: {e}"))?;

    let mut dirs: Vec<&Path> = Vec::new();
    for path in std::iter::once(&source_path).chain(data_path.as_ref()) {
        if let Some(dir) = path.parent()
            && !dirs.contains(&dir)
        {
            debouncer
                .watcher()
                .watch(dir, notify::RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
            dirs.push(dir);
        }
    }

    let watched = (source_path.clone(), data_path.clone());
    std::thread::spawn(move || {
        let _debouncer = debouncer;
        while let Ok(result) = notify_rx.recv() {
            let events = match result {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "watch error");
                    continue;
                }
            };
            let mut changes = Changes::default();
            for event in events.iter().filter(|e| e.kind == DebouncedEventKind::Any) {
                changes.source |= event.path == watched.0;
                changes.data |= watched.1.as_ref() == Some(&event.path);
            }
            if changes != Changes::default() && tx.send(changes).is_err() {
                break;
            }
        }
    });

    let dim = Style::new().dim();
    if !ctx.json_output {
        println!("{}", dim.apply_to(format!("Watching {} (Ctrl-C to stop)", source_path.display())));
    }

    loop {
        tokio::select! {
            changes = rx.recv() => {
                let Some(changes) = changes else { break };
                debug!(?changes, "file change");
                if apply(&mut session, changes, &source_path, data_path.as_deref())? {
                    session.settled().await;
                    print(&session, ctx)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown();
    Ok(())
}

/// Reload whatever `changes` touched. Returns whether the session changed.
fn apply(
    session: &mut PreviewSession,
    changes: Changes,
    source_path: &Path,
    data_path: Option<&Path>,
) -> Result<bool> {
    let mut reloaded = false;
    if changes.data
        && let Some(path) = data_path
        && let Some(raw) = read_watched(path)
    {
        session.set_input(raw)?;
        reloaded = true;
    }
    if changes.source
        && let Some(code) = read_watched(source_path)
    {
        session.set_source(code)?;
        reloaded = true;
    }
    Ok(reloaded)
}

/// Editors may delete and recreate a file on save, so a failed read only
/// skips this change.
fn read_watched(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable watched file");
            None
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))
}

fn print(session: &PreviewSession, ctx: &Context) -> Result<()> {
    if !ctx.json_output {
        println!("{}", Style::new().dim().apply_to("─".repeat(60)));
    }
    Report::capture(session).print(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compbridge_config::PreviewSection;

    const SOURCE: Changes = Changes {
        source: true,
        data: false,
    };

    #[tokio::test]
    async fn test_missing_file_skips_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.jsx");
        std::fs::write(&path, "const A = () => <p>a</p>;").unwrap();
        let mut session = PreviewSession::new(PreviewSection::default());

        assert!(apply(&mut session, SOURCE, &path, None).unwrap());
        assert_eq!(session.source(), "const A = () => <p>a</p>;");

        std::fs::remove_file(&path).unwrap();
        assert!(!apply(&mut session, SOURCE, &path, None).unwrap());
        assert_eq!(session.source(), "const A = () => <p>a</p>;");

        std::fs::write(&path, "const B = () => <p>b</p>;").unwrap();
        assert!(apply(&mut session, SOURCE, &path, None).unwrap());
        assert_eq!(session.source(), "const B = () => <p>b</p>;");
    }

    #[tokio::test]
    async fn test_missing_data_file_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("card.jsx");
        let data = dir.path().join("card.json");
        std::fs::write(&source, "const A = ({ n }) => <p>{n}</p>;").unwrap();
        std::fs::write(&data, r#"{"n": 1}"#).unwrap();
        let mut session = PreviewSession::new(PreviewSection::default());
        let both = Changes {
            source: true,
            data: true,
        };
        assert!(apply(&mut session, both, &source, Some(&data)).unwrap());

        std::fs::remove_file(&data).unwrap();
        let data_only = Changes {
            source: false,
            data: true,
        };
        assert!(!apply(&mut session, data_only, &source, Some(&data)).unwrap());
        assert_eq!(session.input_raw(), r#"{"n": 1}"#);
    }
}
