//! Batch inputs and outputs
//!
//! The core never talks to a UI. Whatever front end collects files (file
//! dialog, drag and drop, command line) implements [`FileSource`], and
//! whatever reports results implements [`ResultSink`].
//!
//! Implementations:
//! - `CsvSelection`: explicit list of files, de-duplicated, `.csv` only
//! - `DirectorySource`: every `.csv` file in one folder
//! - `ConsoleSink`: prints per-file outcomes and the batch summary

use super::error::{EdsMapError, Result};
use super::render::RenderedMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Extension accepted as grid input (case-insensitive)
pub const INPUT_EXTENSION: &str = "csv";

/// True if `path` has a `.csv` extension, in any case
pub fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(INPUT_EXTENSION))
        .unwrap_or(false)
}

/// Provider of input grid files
pub trait FileSource {
    /// Input files in processing order, without duplicates
    fn input_paths(&self) -> Result<Vec<PathBuf>>;
}

/// Receiver of batch results
pub trait ResultSink {
    /// Called once per input file, in order
    fn record(&mut self, input: &Path, outcome: &Result<RenderedMap>);

    /// Called once after the last file
    fn finish(&mut self, summary: &BatchSummary);
}

/// Success/failure tally of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Inputs that failed, in order
    pub failures: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn record(&mut self, input: &Path, ok: bool) {
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failures.push(input.to_path_buf());
        }
    }
}

/// Ordered selection of input files
#[derive(Debug, Clone, Default)]
pub struct CsvSelection {
    paths: Vec<PathBuf>,
}

impl CsvSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Non-CSV files and duplicates are ignored; returns whether
    /// the file was added.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !is_csv(&path) {
            debug!("Skipping non-CSV input {}", path.display());
            return false;
        }
        if self.paths.contains(&path) {
            debug!("Skipping duplicate input {}", path.display());
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Add several files; returns how many were added
    pub fn extend<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .map(|p| self.add(p))
            .filter(|added| *added)
            .count()
    }

    /// Remove a file; returns whether it was selected
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FileSource for CsvSelection {
    fn input_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.paths.clone())
    }
}

/// All `.csv` files directly inside a directory, sorted by name
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySource { dir: dir.into() }
    }
}

impl FileSource for DirectorySource {
    fn input_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| EdsMapError::ingest(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| EdsMapError::ingest(&self.dir, e))?.path();
            if path.is_file() && is_csv(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Concatenation of several sources, de-duplicated in order
impl<S: FileSource> FileSource for [S] {
    fn input_paths(&self) -> Result<Vec<PathBuf>> {
        let mut selection = CsvSelection::new();
        for source in self {
            selection.extend(source.input_paths()?);
        }
        Ok(selection.paths)
    }
}

/// Prints outcomes to stdout and diagnostics through tracing
#[derive(Debug, Default)]
pub struct ConsoleSink {
    quiet: bool,
}

impl ConsoleSink {
    pub fn new(quiet: bool) -> Self {
        ConsoleSink { quiet }
    }
}

impl ResultSink for ConsoleSink {
    fn record(&mut self, input: &Path, outcome: &Result<RenderedMap>) {
        match outcome {
            Ok(map) => {
                if !self.quiet {
                    println!(
                        "✓ Saved {} ({} bytes, {}×{})",
                        map.path.display(),
                        map.bytes,
                        map.width,
                        map.height
                    );
                }
            }
            Err(e) => {
                error!("✗ {}: {}", input.display(), e);
            }
        }
    }

    fn finish(&mut self, summary: &BatchSummary) {
        if summary.all_succeeded() {
            println!(
                "\nProcessing finished: {} map(s) generated.",
                summary.succeeded
            );
        } else {
            warn!("{} of {} file(s) failed", summary.failed, summary.total());
            println!(
                "\nProcessing finished: {} map(s) generated, {} failed.",
                summary.succeeded, summary.failed
            );
            for path in &summary.failures {
                println!("  ✗ {}", path.display());
            }
        }
    }
}
