//! Shared map generation pipeline
//!
//! This module contains the per-file and batch logic shared by the command
//! line entry point and any other front end.
//!
//! The pipeline, per input file:
//! 1. Loads and validates the grid
//! 2. Derives the element label and output name from the file name
//! 3. Renders the colour-mapped PNG into the output directory
//!
//! Failures are isolated per file: a batch keeps going and reports counts.

use crate::config::PlotterConfig;
use crate::eds::error::{EdsMapError, Result};
use crate::eds::grid;
use crate::eds::naming::SourceIdentity;
use crate::eds::render::{RenderContext, RenderedMap};
use crate::eds::source::{BatchSummary, FileSource, ResultSink};
use crate::memprof;
use std::path::Path;
use tracing::{debug, error, info};

/// Render one grid file into `output_dir`
///
/// The output file is `{derived_base_name}.png`; an existing file with that
/// name is replaced.
///
/// # Errors
/// Any `Ingest`, `InvalidGrid`, `InvalidName` or `Render` error for this file.
/// No output is left behind when an error is returned.
pub fn try_render_grid_to_image(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    colormap_name: &str,
    ctx: &mut RenderContext,
) -> Result<RenderedMap> {
    let input_path = input_path.as_ref();
    let identity = SourceIdentity::from_path(input_path)?;
    let loaded = grid::load(input_path)?;
    debug!(
        "{}: {}×{} grid, {} missing cell(s)",
        input_path.display(),
        loaded.grid.rows(),
        loaded.grid.cols(),
        loaded.report.missing_cells()
    );

    let output_path = output_dir.as_ref().join(identity.output_file_name());
    ctx.render(
        &loaded.grid,
        &identity.element_label,
        &output_path,
        colormap_name,
    )
}

/// Render one grid file with the default configuration
///
/// Returns true when the PNG was written. Any failure is logged and reported
/// as false.
pub fn render_grid_to_image(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    colormap_name: &str,
) -> bool {
    let mut ctx = RenderContext::new(PlotterConfig::default());
    render_grid_to_image_with_context(input_path, output_dir, colormap_name, &mut ctx)
}

/// Same as [`render_grid_to_image`], reusing a caller-owned context
pub fn render_grid_to_image_with_context(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    colormap_name: &str,
    ctx: &mut RenderContext,
) -> bool {
    let input_path = input_path.as_ref();
    match try_render_grid_to_image(input_path, output_dir, colormap_name, ctx) {
        Ok(_) => true,
        Err(e) => {
            error!("Failed to process {}: {}", input_path.display(), e);
            false
        }
    }
}

/// Render every file from `source` into `output_dir`
///
/// # Errors
/// - `NothingSelected` if the source yields no files
/// - `OutputDir` if the output directory cannot be created
/// - Errors from the source itself (e.g. an unreadable input directory)
///
/// Per-file failures are not errors: they go to `sink` and are counted in
/// the returned summary.
pub fn run_batch<S, K>(
    source: &S,
    output_dir: &Path,
    colormap_name: &str,
    ctx: &mut RenderContext,
    sink: &mut K,
) -> Result<BatchSummary>
where
    S: FileSource + ?Sized,
    K: ResultSink + ?Sized,
{
    let m0 = memprof::checkpoint("run_batch START");
    let t0 = std::time::Instant::now();

    let inputs = source.input_paths()?;
    if inputs.is_empty() {
        return Err(EdsMapError::NothingSelected);
    }

    std::fs::create_dir_all(output_dir).map_err(|e| EdsMapError::OutputDir {
        path: output_dir.to_path_buf(),
        message: e.to_string(),
    })?;

    info!(
        "Processing {} file(s) into {} with colour map {}",
        inputs.len(),
        output_dir.display(),
        colormap_name
    );

    let mut summary = BatchSummary::default();
    for (index, input) in inputs.iter().enumerate() {
        info!("[{}/{}] {}", index + 1, inputs.len(), input.display());
        let outcome = try_render_grid_to_image(input, output_dir, colormap_name, ctx);
        summary.record(input, outcome.is_ok());
        sink.record(input, &outcome);
        memprof::delta(&format!("after {}", input.display()), m0);
    }

    ctx.release();
    sink.finish(&summary);

    memprof::delta("run_batch END", m0);
    memprof::time_elapsed("run_batch", t0);

    Ok(summary)
}
