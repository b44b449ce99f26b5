//! Work items and their output paths.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Width of the zero-padded sequence number in output file names.
pub const SEQUENCE_WIDTH: usize = 4;

/// One unit of input: a 1-based position plus its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub index: usize,
    pub payload: String,
}

impl WorkItem {
    /// The only item of a single-payload run.
    pub fn single(payload: impl Into<String>) -> Self {
        Self {
            index: 1,
            payload: payload.into(),
        }
    }
}

/// Parse line-delimited input into work items.
///
/// Lines are trimmed and blank lines dropped before numbering, so indices
/// only ever count real items.
pub fn parse_items(input: &str) -> Vec<WorkItem> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| WorkItem {
            index: i + 1,
            payload: line.to_string(),
        })
        .collect()
}

/// Derives each item's output path from its index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    dir: PathBuf,
    extension: String,
}

impl OutputNaming {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for `index`, e.g. `0001.wav`.
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{index:0width$}.{}",
            self.extension,
            width = SEQUENCE_WIDTH
        )
    }

    /// Full output path for `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(self.file_name(index))
    }
}
