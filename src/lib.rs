//! EDS Map Plotter Library
//!
//! Converts exported EDS intensity grids (headerless CSV) into colour-mapped
//! PNG maps with a title and a colour bar.
//!
//! Module organization:
//! - `eds`: grid ingest, naming, palettes, rendering, batch source/sink traits
//! - `pipeline`: per-file and batch processing shared by all front ends
//! - `config`: plotter configuration built from plotter.json properties
//! - `memprof`: RSS and timing checkpoints at debug level

pub mod config;
pub mod eds;
pub mod memprof;
pub mod pipeline;

pub use eds::{EdsMapError, Result};
pub use pipeline::{render_grid_to_image, run_batch, try_render_grid_to_image};
