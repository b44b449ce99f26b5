//! Batch pipeline: prepare once, process every item in order, summarize.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError};
use crate::cli::ExistingPolicy;

use super::item::{OutputNaming, WorkItem, parse_items};
use super::outcome::{ItemOutcome, Outcome, RunReport, RunSummary};
use super::session::Session;

/// Errors that abort a run before any item is processed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Failed to read input file {path}: {source}")]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid work items: {0}")]
    InvalidItems(String),

    #[error("Backend preparation failed: {0}")]
    BackendUnavailable(#[source] BackendError),

    #[error("Output directory {path} is unusable: {reason}")]
    OutputDir { path: PathBuf, reason: String },

    #[error("Failed to write manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },
}

/// Errors confined to a single item.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("backend returned no data")]
    EmptyResult,

    #[error("output already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read and parse a line-delimited input file.
pub fn load_items(path: &Path) -> Result<Vec<WorkItem>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path).map_err(|source| PipelineError::InputRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(parse_items(&contents))
}

/// Create the output directory if needed.
pub fn ensure_output_dir(path: &Path) -> Result<(), PipelineError> {
    if path.exists() && !path.is_dir() {
        return Err(PipelineError::OutputDir {
            path: path.to_path_buf(),
            reason: "exists and is not a directory".to_string(),
        });
    }

    std::fs::create_dir_all(path).map_err(|e| PipelineError::OutputDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reject index 0 and repeated indices; `ordered` must be sorted by index.
fn check_indices(ordered: &[&WorkItem]) -> Result<(), PipelineError> {
    if let Some(first) = ordered.first()
        && first.index == 0
    {
        return Err(PipelineError::InvalidItems(
            "indices start at 1, found 0".to_string(),
        ));
    }

    if let Some(pair) = ordered.windows(2).find(|pair| pair[0].index == pair[1].index) {
        return Err(PipelineError::InvalidItems(format!(
            "index {} appears more than once",
            pair[0].index
        )));
    }

    Ok(())
}

/// Per-run knobs that are not part of the output naming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub on_existing: ExistingPolicy,
    /// Pause between consecutive items.
    pub delay: Duration,
}

/// Orchestrates a backend session over an ordered list of work items.
pub struct Pipeline {
    naming: OutputNaming,
    options: RunOptions,
}

impl Pipeline {
    pub fn new(naming: OutputNaming, options: RunOptions) -> Self {
        Self { naming, options }
    }

    /// Run the batch.
    ///
    /// Indices must be unique and 1-based; otherwise the run is rejected
    /// before the backend is prepared. The backend is prepared before the
    /// output directory is touched, and a preparation failure yields no
    /// outcomes at all. After that every
    /// item gets exactly one outcome, in ascending index order, and
    /// `on_item` is called as each one completes with the total item count.
    pub fn run<B, F>(
        &self,
        session: &mut Session<B>,
        items: &[WorkItem],
        mut on_item: F,
    ) -> Result<RunReport, PipelineError>
    where
        B: Backend,
        F: FnMut(usize, &WorkItem, &Outcome),
    {
        let started_at = Utc::now();

        let mut ordered: Vec<&WorkItem> = items.iter().collect();
        ordered.sort_by_key(|item| item.index);
        check_indices(&ordered)?;

        session
            .prepare()
            .map_err(PipelineError::BackendUnavailable)?;
        ensure_output_dir(self.naming.dir())?;

        let total = ordered.len();
        info!(total, dir = %self.naming.dir().display(), "processing items");

        let mut outcomes = Vec::with_capacity(total);
        for (position, &item) in ordered.iter().enumerate() {
            let outcome = match self.process_item(session, item) {
                Ok(path) => {
                    debug!(index = item.index, path = %path.display(), "item done");
                    Outcome::Success { path }
                }
                Err(e) => {
                    warn!(index = item.index, error = %e, "item failed");
                    Outcome::Failure {
                        reason: e.to_string(),
                    }
                }
            };

            on_item(total, item, &outcome);
            outcomes.push(ItemOutcome::new(item, outcome));

            if !self.options.delay.is_zero() && position + 1 < total {
                thread::sleep(self.options.delay);
            }
        }

        let summary = RunSummary::from_outcomes(&outcomes);
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "run finished"
        );

        Ok(RunReport {
            output_dir: self.naming.dir().to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            summary,
            outcomes,
        })
    }

    fn process_item<B: Backend>(
        &self,
        session: &Session<B>,
        item: &WorkItem,
    ) -> Result<PathBuf, ItemError> {
        let path = self.naming.path_for(item.index);

        if self.options.on_existing == ExistingPolicy::Error && path.exists() {
            return Err(ItemError::AlreadyExists(path));
        }

        let data = session.process(item)?;
        if data.is_empty() {
            return Err(ItemError::EmptyResult);
        }

        self.persist(&path, &data)?;
        Ok(path)
    }

    /// Write through a temporary file in the output directory and rename
    /// into place, so a failed write never leaves a partial file at `path`.
    fn persist(&self, path: &Path, data: &[u8]) -> Result<(), ItemError> {
        let write_error = |source: std::io::Error| ItemError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(self.naming.dir()).map_err(write_error)?;
        tmp.write_all(data).map_err(write_error)?;
        tmp.flush().map_err(write_error)?;

        match self.options.on_existing {
            ExistingPolicy::Overwrite => tmp
                .persist(path)
                .map(drop)
                .map_err(|e| write_error(e.error)),
            ExistingPolicy::Error => tmp.persist_noclobber(path).map(drop).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    ItemError::AlreadyExists(path.to_path_buf())
                } else {
                    write_error(e.error)
                }
            }),
        }
    }
}

impl RunReport {
    /// File name of the JSON manifest inside the output directory.
    pub const MANIFEST_NAME: &'static str = "_summary.json";

    /// Write this report as pretty JSON next to the outputs.
    pub fn write_manifest(&self) -> Result<PathBuf, PipelineError> {
        let path = self.output_dir.join(Self::MANIFEST_NAME);
        let manifest_error = |reason: String| PipelineError::Manifest {
            path: path.clone(),
            reason,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| manifest_error(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| manifest_error(e.to_string()))?;

        Ok(path)
    }
}
