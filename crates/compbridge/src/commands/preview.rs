//! Preview command - render a component once.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use compbridge_preview::{PreviewSession, Synthesizer, resolve};

use super::output::Report;
use super::{Context, InputArgs, read_source};

/// Arguments for the preview command.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Component source file
    pub file: PathBuf,

    #[command(flatten)]
    pub input: InputArgs,

    /// Print the standalone browser page instead of rendering
    #[arg(long)]
    pub html: bool,

    /// How long to wait for the component to settle
    #[arg(long)]
    pub wait_ms: Option<u64>,
}

/// Run the preview command.
pub async fn run(args: PreviewArgs, ctx: &Context) -> Result<()> {
    let code = read_source(&args.file)?;
    let input = args.input.read()?;

    if args.html {
        let synthesizer = Synthesizer::from_config(&ctx.config.preview());
        let parsed = resolve(input.as_deref().unwrap_or_default()).parsed;
        print!("{}", synthesizer.synthesize(&code, &parsed).to_html());
        return Ok(());
    }

    let session = render(ctx, &code, input, args.wait_ms.map(Duration::from_millis)).await?;
    finish(&session, ctx)
}

/// Mount `code` with `input` and wait for it to settle.
pub async fn render(
    ctx: &Context,
    code: &str,
    input: Option<String>,
    wait: Option<Duration>,
) -> Result<PreviewSession> {
    let mut session = PreviewSession::new(ctx.config.preview());
    if let Some(raw) = input {
        session.set_input(raw)?;
    }
    session.set_source(code)?;
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => session.settled().await,
    }
    Ok(session)
}

/// Print the settled session and fail if it reported errors.
pub fn finish(session: &PreviewSession, ctx: &Context) -> Result<()> {
    let report = Report::capture(session);
    report.print(ctx)?;
    match report.error_count() {
        0 => Ok(()),
        n => anyhow::bail!("preview reported {n} error(s)"),
    }
}
