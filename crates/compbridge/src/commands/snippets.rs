//! Snippets command - saved component management.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use compbridge_store::NewSnippet;
use compbridge_types::Snippet;
use console::Style;

use super::{Context, preview, read_source};

/// Arguments for the snippets command.
#[derive(Args, Debug)]
pub struct SnippetsArgs {
    #[command(subcommand)]
    pub command: SnippetsCommand,
}

#[derive(Subcommand, Debug)]
pub enum SnippetsCommand {
    /// List saved snippets
    List,

    /// Show a snippet's code and input data
    Show {
        /// Snippet ID
        id: u64,
    },

    /// Save a component file as a snippet
    Save {
        /// Component source file
        file: PathBuf,

        /// Snippet name
        #[arg(long)]
        name: String,

        /// Category
        #[arg(long)]
        category: Option<String>,

        /// Tags for the snippet
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Description
        #[arg(long)]
        description: Option<String>,

        /// Input data file to store with the snippet
        #[arg(long)]
        data_file: Option<PathBuf>,
    },

    /// Delete a snippet
    Delete {
        /// Snippet ID
        id: u64,
    },

    /// Search snippets by name, category, tag or description
    Search {
        /// Search query
        query: String,
    },

    /// Preview a saved snippet with its stored input data
    Open {
        /// Snippet ID
        id: u64,
    },
}

/// Run the snippets command.
pub async fn run(args: SnippetsArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let green = Style::new().green();
    let dim = Style::new().dim();

    match args.command {
        SnippetsCommand::List => print_list(store.list().iter(), ctx),
        SnippetsCommand::Search { query } => print_list(store.search(&query).into_iter(), ctx),
        SnippetsCommand::Show { id } => {
            let snippet = store.get(id).ok_or_else(|| not_found(id))?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(snippet)?);
                return Ok(());
            }
            println!("{} {}", snippet.name, dim.apply_to(format!("#{}", snippet.id)));
            if let Some(ref description) = snippet.description {
                println!("{description}");
            }
            println!();
            println!("{}", snippet.code);
            if let Some(ref data) = snippet.input_data {
                println!();
                println!("{}", dim.apply_to("Input data:"));
                println!("{data}");
            }
            Ok(())
        }
        SnippetsCommand::Save {
            file,
            name,
            category,
            tags,
            description,
            data_file,
        } => {
            let input_data = data_file.map(std::fs::read_to_string).transpose()?;
            let snippet = store.save(NewSnippet {
                name,
                code: read_source(&file)?,
                category,
                tags,
                description,
                input_data,
            })?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&snippet)?);
            } else {
                println!(
                    "{} Saved {} {}",
                    green.apply_to("✓"),
                    snippet.name,
                    dim.apply_to(format!("#{}", snippet.id))
                );
            }
            Ok(())
        }
        SnippetsCommand::Delete { id } => {
            if !store.delete(id)? {
                return Err(not_found(id));
            }
            if ctx.json_output {
                println!("{}", serde_json::json!({ "deleted": id }));
            } else {
                println!("{} Deleted #{id}", green.apply_to("✓"));
            }
            Ok(())
        }
        SnippetsCommand::Open { id } => {
            let snippet = store.get(id).ok_or_else(|| not_found(id))?;
            let session =
                preview::render(ctx, &snippet.code, snippet.input_data.clone(), None).await?;
            preview::finish(&session, ctx)
        }
    }
}

fn not_found(id: u64) -> anyhow::Error {
    anyhow!("Snippet not found: {id}")
}

fn print_list<'a>(snippets: impl Iterator<Item = &'a Snippet>, ctx: &Context) -> Result<()> {
    let snippets: Vec<&Snippet> = snippets.collect();
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&snippets)?);
        return Ok(());
    }
    if snippets.is_empty() {
        println!("No snippets found.");
        return Ok(());
    }
    let dim = Style::new().dim();
    for snippet in snippets {
        let category = snippet.category.as_deref().unwrap_or("-");
        println!(
            "{:>14}  {:<24} {:<12} {}",
            snippet.id,
            snippet.name,
            category,
            dim.apply_to(&snippet.created_at)
        );
    }
    Ok(())
}
