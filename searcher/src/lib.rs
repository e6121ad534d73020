use anyhow::Result;
use search_core::language::Languages;
use search_core::persist::{load_index_file, load_meta};
use search_core::{DocumentId, InvertedIndex, Occurrence, QueryEvaluator};
use std::collections::HashSet;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Instant;

pub const PROMPT: &str = "Enter query:";

/// Load an index built by the indexer, with the default Russian + English profiles.
pub fn open_index(path: &Path) -> Result<InvertedIndex<String>> {
    match load_meta(path) {
        Ok(meta) => tracing::info!(
            num_docs = meta.num_docs,
            num_forms = meta.num_forms,
            created_at = %meta.created_at,
            "index metadata"
        ),
        Err(err) => tracing::debug!(%err, "no index metadata"),
    }
    load_index_file(path, Languages::default())
}

/// Answer one query per input line until a blank line or end of input.
/// A malformed query is reported and the session goes on. Returns the
/// number of queries answered.
pub fn run_session<D, R, W>(index: &InvertedIndex<D>, input: R, mut output: W) -> io::Result<usize>
where
    D: DocumentId + Display,
    R: BufRead,
    W: Write,
{
    let evaluator = QueryEvaluator::new(index);
    let mut answered = 0;
    let mut lines = input.lines();
    loop {
        writeln!(output, "{PROMPT}")?;
        output.flush()?;
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        if line.is_empty() {
            break;
        }
        let start = Instant::now();
        match evaluator.find(&line) {
            Ok(matches) if matches.is_empty() => writeln!(output, "No matches!")?,
            Ok(matches) => writeln!(output, "{} matches: {}", matches.len(), render_matches(&matches))?,
            Err(err) => {
                tracing::debug!(query = %line, %err, "rejected query");
                writeln!(output, "Incorrect query! {err}")?;
            }
        }
        tracing::debug!(query = %line, took_us = start.elapsed().as_micros() as u64, "query evaluated");
        answered += 1;
    }
    Ok(answered)
}

/// Occurrences ordered by document, start and end, comma separated.
pub fn render_matches<D: Display>(matches: &HashSet<Occurrence<D>>) -> String {
    let mut sorted: Vec<(String, &Occurrence<D>)> =
        matches.iter().map(|m| (m.document.to_string(), m)).collect();
    sorted.sort_by(|a, b| (&a.0, a.1.start, a.1.end).cmp(&(&b.0, b.1.start, b.1.end)));
    let rendered: Vec<String> = sorted.iter().map(|(_, m)| m.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}
