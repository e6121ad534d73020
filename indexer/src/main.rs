use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use search_core::language::Languages;
use search_core::persist::{save_index_file, save_meta, MetaFile, FORMAT_VERSION};
use search_core::IndexBuilder;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a positional inverted index over Russian and English text files", long_about = None)]
#[command(override_usage = "indexer [-jN] [-f <index file>] <paths>...")]
struct Cli {
    /// Count of worker threads, e.g. -j4
    #[arg(short = 'j', value_name = "N", default_value_t = 2)]
    jobs: usize,
    /// Output index file
    #[arg(short = 'f', value_name = "INDEX_FILE", default_value = "index.ser")]
    file: PathBuf,
    /// Directories or files to be indexed
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
    if std::env::args_os().len() <= 1 {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }
    let cli = Cli::parse();
    build_index(&cli)
}

fn build_index(cli: &Cli) -> Result<()> {
    let files = collect_files(&cli.paths);
    tracing::info!(workers = cli.jobs, output = %cli.file.display(), files = files.len(), "building index");

    let languages = Languages::default();
    let output = IndexBuilder::new(languages.clone())
        .workers(cli.jobs)
        .build(files.into_iter().collect());
    for failure in &output.failures {
        tracing::warn!(path = %failure.path.display(), error = %failure.error, "document indexed partially");
    }
    let secs = output.elapsed.as_secs();
    tracing::info!(
        "index was built in {} ms = {} min {} s",
        output.elapsed.as_millis(),
        secs / 60,
        secs % 60
    );

    save_index_file(&cli.file, &output.index)?;
    let meta = MetaFile {
        num_docs: document_count(output.documents)?,
        num_forms: output.index.num_forms() as u64,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
        languages: languages.codes(),
    };
    save_meta(&cli.file, &meta)?;

    tracing::info!(output = %cli.file.display(), "index saved");
    Ok(())
}

fn document_count(documents: usize) -> Result<u32> {
    u32::try_from(documents).with_context(|| format!("{documents} documents do not fit the index metadata"))
}

/// Files under the given paths, each labelled by its path string.
fn collect_files(paths: &[PathBuf]) -> BTreeMap<PathBuf, String> {
    let mut files = BTreeMap::new();
    for path in paths {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "no such file or directory, skipping");
        } else if path.is_file() {
            files.insert(path.clone(), path.display().to_string());
        } else {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() {
                    files.insert(p.to_path_buf(), p.display().to_string());
                }
            }
        }
    }
    files
}
