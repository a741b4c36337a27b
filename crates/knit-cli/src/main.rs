mod demo;
mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knit_core::{AppBuilder, Document, RuntimeApp};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "knit")]
#[command(about = "Resolve an application document into live, wired components")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, start, and keep the application running until Ctrl-C
    Run {
        /// Application document (JSON)
        file: PathBuf,

        /// Override the document's maximum dependency depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Close right after starting instead of waiting for Ctrl-C
        #[arg(long)]
        once: bool,
    },

    /// Validate a document and print the creation order without building anything
    Check {
        /// Application document (JSON)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            max_depth,
            once,
        } => run(file, max_depth, once).await,
        Commands::Check { file } => check(file),
    }
}

fn load(file: &Path, max_depth: Option<usize>) -> Result<Document> {
    let mut document =
        Document::load(file).with_context(|| format!("loading {}", file.display()))?;
    if let Some(depth) = max_depth {
        document.options.max_depth = depth;
    }
    Ok(document)
}

fn print_status(runtime: &RuntimeApp) -> Result<()> {
    let status = serde_json::to_string_pretty(&runtime.status())?;
    println!("{status}");
    Ok(())
}

async fn run(file: PathBuf, max_depth: Option<usize>, once: bool) -> Result<()> {
    let document = load(&file, max_depth)?;
    let app = AppBuilder::new()
        .with_registry(demo::registry()?)
        .build()?;

    let mut runtime = app
        .launch_document(&document)
        .with_context(|| format!("resolving {}", document.application.id()))?;
    info!(run = %runtime.run_id(), objects = runtime.len(), "resolved");

    runtime.run().context("starting components")?;
    print_status(&runtime)?;

    if !once {
        info!("running, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?;
        info!("shutting down");
    }

    if let Err(err) = runtime.close() {
        for failure in err.suppressed() {
            warn!(block = %failure.block, error = %failure.source, "close failed");
        }
        return Err(err).context("closing components");
    }
    Ok(())
}

fn check(file: PathBuf) -> Result<()> {
    let document = load(&file, None)?;
    let registry = demo::registry()?;
    let resolver = knit_core::Resolver::new(&registry).with_options(document.options.clone());

    let order = resolver
        .plan_order(&document.application)
        .with_context(|| format!("checking {}", document.application.id()))?;
    let order: Vec<String> = order.iter().map(ToString::to_string).collect();
    println!("{}", order.join(" "));
    Ok(())
}
