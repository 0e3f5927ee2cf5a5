//! Templates command - built-in component catalog.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use compbridge_store::catalog;
use compbridge_types::Template;
use console::Style;

use super::{Context, preview};

/// Arguments for the templates command.
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    pub command: TemplatesCommand,
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// List templates by category
    List,

    /// Show a template's code and sample data
    Show {
        /// Template name
        name: String,
    },

    /// Render a template with its sample data
    Preview {
        /// Template name
        name: String,
    },
}

/// Run the templates command.
pub async fn run(args: TemplatesArgs, ctx: &Context) -> Result<()> {
    match args.command {
        TemplatesCommand::List => {
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(catalog::list())?);
                return Ok(());
            }
            let bold = Style::new().bold();
            let dim = Style::new().dim();
            for category in catalog::categories() {
                println!("{}", bold.apply_to(category));
                for template in catalog::list().iter().filter(|t| t.category == category) {
                    println!("  {:<20} {}", template.name, dim.apply_to(template.description));
                }
            }
            Ok(())
        }
        TemplatesCommand::Show { name } => {
            let template = find(&name)?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(template)?);
                return Ok(());
            }
            println!("{}", template.code);
            if let Some(data) = template.sample_data {
                println!();
                println!("{}", Style::new().dim().apply_to("Sample data:"));
                println!("{data}");
            }
            Ok(())
        }
        TemplatesCommand::Preview { name } => {
            let template = find(&name)?;
            let input = template.sample_data.map(str::to_string);
            let session = preview::render(ctx, template.code, input, None).await?;
            preview::finish(&session, ctx)
        }
    }
}

fn find(name: &str) -> Result<&'static Template> {
    catalog::find(name).ok_or_else(|| anyhow!("Template not found: {name}"))
}
