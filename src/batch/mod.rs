//! Concurrent corpus processing with per-document timeouts.
//!
//! The per-document pipeline is synchronous and CPU-bound, so each document
//! runs on the blocking pool. A semaphore bounds how many documents are in
//! flight, and every document gets its own time budget: a document that
//! exceeds it yields an empty [`CitationGraph`] tagged with
//! [`CitationWarning::Timeout`] while the rest of the batch continues.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use citegraph_core::{BatchProcessor, collect_xml_files};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let files = collect_xml_files(Path::new("./corpus"))?;
//! let processor = BatchProcessor::new(8, Duration::from_secs(30))?;
//! let outcome = processor.process_paths(&files).await?;
//! println!("{}", outcome.report.format_summary());
//! # Ok(())
//! # }
//! ```

mod report;

pub use report::{CoverageReport, FAILED_SAMPLE_LIMIT, SchemaCounts};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::graph::{CitationGraph, PipelineOptions, process_document_with};
use crate::warning::CitationWarning;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 64;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default per-document time budget.
pub const DEFAULT_DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for batch operations.
///
/// Only failures outside the per-document pipeline are errors; everything a
/// document can do wrong is a warning on its graph.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// An input directory could not be listed.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Live counters for a running batch, shared with progress displays.
#[derive(Debug, Default)]
pub struct BatchProgress {
    processed: AtomicUsize,
    unreadable: AtomicUsize,
    timed_out: AtomicUsize,
}

impl BatchProgress {
    /// Documents that produced a graph (including abandoned ones).
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Files that could not be read.
    #[must_use]
    pub fn unreadable(&self) -> usize {
        self.unreadable.load(Ordering::SeqCst)
    }

    /// Documents abandoned after their time budget.
    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.timed_out.load(Ordering::SeqCst)
    }

    /// Documents finished in any way.
    #[must_use]
    pub fn finished(&self) -> usize {
        self.processed() + self.unreadable()
    }
}

/// A file that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    /// Input path
    pub path: PathBuf,
    /// Error description
    pub error: String,
}

/// Everything a batch run produced.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One graph per readable input, in input order
    pub graphs: Vec<CitationGraph>,
    /// Inputs that could not be read, in input order
    pub failures: Vec<ReadFailure>,
    /// Coverage over all inputs
    pub report: CoverageReport,
}

enum TaskOutput {
    Graph(CitationGraph),
    Unreadable(String),
}

/// Runs the citation pipeline over many files concurrently.
#[derive(Debug)]
pub struct BatchProcessor {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    document_timeout: Duration,
    options: PipelineOptions,
    progress: Arc<BatchProgress>,
}

impl BatchProcessor {
    /// Creates a processor with the given concurrency limit and per-document budget.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if `concurrency` is outside
    /// 1..=64.
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize, document_timeout: Duration) -> Result<Self, BatchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(BatchError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            timeout_ms = document_timeout.as_millis(),
            "creating batch processor"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            document_timeout,
            options: PipelineOptions::default(),
            progress: Arc::new(BatchProgress::default()),
        })
    }

    /// Replaces the pipeline options used for every document.
    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the per-document time budget.
    #[must_use]
    pub fn document_timeout(&self) -> Duration {
        self.document_timeout
    }

    /// Returns the live progress counters.
    #[must_use]
    pub fn progress(&self) -> Arc<BatchProgress> {
        Arc::clone(&self.progress)
    }

    /// Reads and processes every path.
    ///
    /// Unreadable files are reported in [`BatchOutcome::failures`]; they do not
    /// fail the batch.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::SemaphoreClosed`] if the semaphore is closed.
    #[instrument(skip(self, paths), fields(files = paths.len()))]
    pub async fn process_paths(&self, paths: &[PathBuf]) -> Result<BatchOutcome, BatchError> {
        let mut handles = Vec::with_capacity(paths.len());

        info!(concurrency = self.concurrency, "starting batch");

        for path in paths {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| BatchError::SemaphoreClosed)?;

            let path = path.clone();
            let options = self.options;
            let budget = self.document_timeout;
            let progress = Arc::clone(&self.progress);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let output = process_file(&path, options, budget).await;
                match &output {
                    TaskOutput::Graph(graph) => {
                        if graph.has_warning(|w| matches!(w, CitationWarning::Timeout { .. })) {
                            progress.timed_out.fetch_add(1, Ordering::SeqCst);
                        }
                        progress.processed.fetch_add(1, Ordering::SeqCst);
                    }
                    TaskOutput::Unreadable(_) => {
                        progress.unreadable.fetch_add(1, Ordering::SeqCst);
                    }
                }
                output
            }));
        }

        let mut graphs = Vec::with_capacity(handles.len());
        let mut failures = Vec::new();
        let mut report = CoverageReport::new();

        for (path, handle) in paths.iter().zip(handles) {
            match handle.await {
                Ok(TaskOutput::Graph(graph)) => {
                    report.record(&graph);
                    graphs.push(graph);
                }
                Ok(TaskOutput::Unreadable(error)) => {
                    report.record_unreadable(&document_id(path));
                    failures.push(ReadFailure {
                        path: path.clone(),
                        error,
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "batch task panicked");
                    let graph = CitationGraph::abandoned(
                        document_id(path),
                        CitationWarning::ProcessingPanic {
                            detail: e.to_string(),
                        },
                    );
                    report.record(&graph);
                    graphs.push(graph);
                }
            }
        }

        info!(
            documents = graphs.len(),
            unreadable = failures.len(),
            timed_out = report.timed_out(),
            coverage = report.coverage(),
            "batch complete"
        );

        Ok(BatchOutcome {
            graphs,
            failures,
            report,
        })
    }
}

async fn process_file(path: &Path, options: PipelineOptions, budget: Duration) -> TaskOutput {
    let id = document_id(path);
    let source = match tokio::fs::read_to_string(path).await {
        Ok(source) => source,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read document");
            return TaskOutput::Unreadable(e.to_string());
        }
    };

    let task_id = id.clone();
    // A timed-out blocking task keeps running; its result is discarded
    let work = tokio::task::spawn_blocking(move || {
        process_document_with(&task_id, &source, &options)
    });

    let graph = match tokio::time::timeout(budget, work).await {
        Ok(Ok(graph)) => graph,
        Ok(Err(e)) => {
            warn!(document_id = %id, error = %e, "document processing panicked");
            CitationGraph::abandoned(
                id,
                CitationWarning::ProcessingPanic {
                    detail: e.to_string(),
                },
            )
        }
        Err(_) => {
            warn!(document_id = %id, timeout_secs = budget.as_secs(), "document timed out");
            CitationGraph::abandoned(
                id,
                CitationWarning::Timeout {
                    seconds: budget.as_secs(),
                },
            )
        }
    };
    TaskOutput::Graph(graph)
}

/// Document id for a path: the file stem (e.g. `10.1002_ece3.4466`).
#[must_use]
pub fn document_id(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Lists the `*.xml` files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`BatchError::Io`] if the directory cannot be read.
pub fn collect_xml_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let io_error = |source| BatchError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_xml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    debug!(dir = %dir.display(), files = files.len(), "collected XML files");
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_processor_rejects_invalid_concurrency() {
        assert!(matches!(
            BatchProcessor::new(0, DEFAULT_DOCUMENT_TIMEOUT),
            Err(BatchError::InvalidConcurrency { value: 0 })
        ));
        assert!(BatchProcessor::new(MAX_CONCURRENCY + 1, DEFAULT_DOCUMENT_TIMEOUT).is_err());
        assert_eq!(
            BatchProcessor::new(MAX_CONCURRENCY, DEFAULT_DOCUMENT_TIMEOUT)
                .unwrap()
                .concurrency(),
            MAX_CONCURRENCY
        );
    }

    #[test]
    fn test_document_id_uses_file_stem() {
        assert_eq!(
            document_id(Path::new("/corpus/10.1002_ece3.4466.xml")),
            "10.1002_ece3.4466"
        );
    }

    #[test]
    fn test_collect_xml_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.xml"), "<a/>").unwrap();
        std::fs::write(dir.path().join("a.XML"), "<a/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub.xml")).unwrap();

        let files = collect_xml_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.XML", "b.xml"]);
    }

    #[test]
    fn test_collect_xml_files_missing_dir_is_io_error() {
        let err = collect_xml_files(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, BatchError::Io { .. }));
    }
}
