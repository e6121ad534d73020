use crate::index::{DocumentId, FormCache, InvertedIndex, Position};
use crate::language::Languages;
use crate::tokenizer::Tokenizer;
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const MIB: u64 = 1024 * 1024;

/// A document that could not be read to the end. Whatever was read before
/// the error stays in the index.
#[derive(Debug)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: io::Error,
}

pub struct BuildOutput<D> {
    pub index: InvertedIndex<D>,
    pub failures: Vec<DocumentFailure>,
    pub documents: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

struct Task<D> {
    path: PathBuf,
    payload: D,
    size: u64,
}

/// Counters for progress output only; indexing never reads them.
struct Progress {
    files_total: usize,
    bytes_total: u64,
    files_done: AtomicUsize,
    bytes_done: AtomicU64,
    started: Instant,
}

impl Progress {
    fn finish(&self, path: &Path, size: u64) {
        let files = self.files_done.fetch_add(1, Ordering::Relaxed) + 1;
        let bytes = self.bytes_done.fetch_add(size, Ordering::Relaxed) + size;
        let percent = if self.bytes_total == 0 { 100 } else { bytes * 100 / self.bytes_total };
        tracing::info!(
            path = %path.display(),
            "finished files: {}/{} ({}/{} MiB - {}%), time passed: {} s",
            files,
            self.files_total,
            bytes / MIB,
            self.bytes_total / MIB,
            percent,
            self.started.elapsed().as_secs()
        );
    }
}

/// Builds an [`InvertedIndex`] from files on a fixed-size pool of worker threads.
///
/// Each file is indexed start to finish by a single worker, so the position
/// lists of one document are always in scan order.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    languages: Languages,
    workers: usize,
}

impl IndexBuilder {
    pub fn new(languages: Languages) -> Self {
        Self { languages, workers: 2 }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Index every `(path, payload)` pair and block until all of them are done.
    pub fn build<D: DocumentId>(&self, documents: Vec<(PathBuf, D)>) -> BuildOutput<D> {
        let index = InvertedIndex::new(self.languages.clone());
        let failures = Mutex::new(Vec::new());

        let tasks: Vec<Task<D>> = documents
            .into_iter()
            .map(|(path, payload)| {
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                Task { path, payload, size }
            })
            .collect();
        let progress = Progress {
            files_total: tasks.len(),
            bytes_total: tasks.iter().map(|t| t.size).sum(),
            files_done: AtomicUsize::new(0),
            bytes_done: AtomicU64::new(0),
            started: Instant::now(),
        };
        tracing::info!(
            documents = progress.files_total,
            total_mib = progress.bytes_total / MIB,
            workers = self.workers,
            "indexing"
        );

        let (sender, receiver) = unbounded();
        for task in tasks {
            sender.send(task).ok();
        }
        drop(sender);

        thread::scope(|scope| {
            let index = &index;
            let progress = &progress;
            let failures = &failures;
            let mut spawned = 0;
            for worker in 0..self.workers {
                let receiver = receiver.clone();
                let spawn = thread::Builder::new()
                    .name(format!("indexer-{worker}"))
                    .spawn_scoped(scope, move || run_worker(worker, receiver, index, progress, failures));
                match spawn {
                    Ok(_) => spawned += 1,
                    Err(error) => tracing::warn!(worker, %error, "cannot spawn worker thread"),
                }
            }
            if spawned == 0 {
                run_worker(0, receiver.clone(), index, progress, failures);
            }
        });

        let elapsed = progress.started.elapsed();
        let failures = failures.into_inner();
        tracing::info!(
            documents = progress.files_total,
            failed = failures.len(),
            num_forms = index.num_forms(),
            elapsed_ms = elapsed.as_millis() as u64,
            "index build complete"
        );
        BuildOutput {
            index,
            failures,
            documents: progress.files_total,
            bytes: progress.bytes_done.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

fn run_worker<D: DocumentId>(
    worker: usize,
    tasks: Receiver<Task<D>>,
    index: &InvertedIndex<D>,
    progress: &Progress,
    failures: &Mutex<Vec<DocumentFailure>>,
) {
    let mut cache = FormCache::new();
    for task in tasks.iter() {
        let result = File::open(&task.path)
            .and_then(|f| index_document(index, &mut cache, BufReader::new(f), &task.payload));
        if let Err(error) = result {
            tracing::warn!(path = %task.path.display(), %error, "error while processing document");
            failures.lock().push(DocumentFailure { path: task.path.clone(), error });
        }
        progress.finish(&task.path, task.size);
    }
    tracing::debug!(
        worker,
        hits = cache.hits(),
        misses = cache.misses(),
        distinct = cache.len(),
        "normal form cache"
    );
}

/// Index one document read line by line. Word positions continue across
/// lines. Returns the number of words indexed; on a read error the words
/// seen so far remain in the index.
pub fn index_document<D: DocumentId, R: BufRead>(
    index: &InvertedIndex<D>,
    cache: &mut FormCache,
    reader: R,
    document: &D,
) -> io::Result<Position> {
    let mut tokenizer = Tokenizer::new(index.languages());
    for line in reader.lines() {
        let line = line?;
        for (word, position) in tokenizer.tokenize(&line) {
            index.insert(cache, &word, document, position);
        }
    }
    Ok(tokenizer.position())
}
