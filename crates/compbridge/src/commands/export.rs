//! Export command - render a component and write it as SVG.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use compbridge_preview::{PreviewSession, write_svg};
use console::Style;

use super::{Context, InputArgs, read_source};

/// Arguments for the export command.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Component source file
    pub file: PathBuf,

    #[command(flatten)]
    pub input: InputArgs,

    /// Write the SVG here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Run the export command.
pub async fn run(args: ExportArgs, ctx: &Context) -> Result<()> {
    let mut session = PreviewSession::new(ctx.config.preview());
    if let Some(raw) = args.input.read()? {
        session.set_input(raw)?;
    }
    session.set_source(read_source(&args.file)?)?;
    let svg = session.export_svg().await?;

    match args.out {
        Some(path) => {
            write_svg(&svg, &path)?;
            if ctx.json_output {
                println!("{}", serde_json::json!({ "path": path }));
            } else {
                println!(
                    "{} Exported to {}",
                    Style::new().green().apply_to("✓"),
                    path.display()
                );
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(svg.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
