//! EDS map core
//!
//! Everything needed to turn one exported intensity grid into one PNG:
//! ingest (`grid`), naming (`naming`), colour handling (`palettes`, `colors`)
//! and drawing (`render`). `source` holds the traits a front end implements
//! to feed a batch and collect its results.

pub mod colors;
pub mod error;
pub mod grid;
pub mod naming;
pub mod palettes;
pub mod properties;
pub mod render;
pub mod source;

pub use colors::ColorScale;
pub use error::{EdsMapError, Result};
pub use grid::{CoercionReport, GridLoad, NumericGrid};
pub use naming::SourceIdentity;
pub use palettes::{ColorMap, PaletteRegistry, PALETTE_REGISTRY};
pub use properties::PropertyReader;
pub use render::{RenderContext, RenderedMap};
pub use source::{
    BatchSummary, ConsoleSink, CsvSelection, DirectorySource, FileSource, ResultSink,
};
