use anyhow::{Context, Result};
use clap::Parser;
use searcher::{open_index, run_session};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Answer boolean and proximity queries against a saved index", long_about = None)]
struct Args {
    /// Index file written by the indexer
    index: PathBuf,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
    let args = Args::parse();
    let index = open_index(&args.index)
        .with_context(|| format!("error while loading index {}", args.index.display()))?;

    println!(
        "You can use english letters 'a'-'z', 'A'-'Z', russian letters 'а'-'я', 'А'-'Я', \
         brackets '(' and ')', logical operators ' AND ', ' OR ' and distances ' /N ', ' /+N ', ' /-N '."
    );
    let stdin = io::stdin();
    let stdout = io::stdout();
    let answered = run_session(&index, stdin.lock(), stdout.lock())?;
    tracing::info!(answered, "search session finished");
    Ok(())
}
