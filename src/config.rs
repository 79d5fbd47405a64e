//! Plotter configuration
//!
//! Configuration is read through [`PropertyReader`], so every default comes
//! from plotter.json. Canvas size and resolution are not configurable: maps
//! are always 8 × 8 inches at 300 DPI.

use crate::eds::properties::PropertyReader;

/// Logical canvas edge in inches
pub const CANVAS_INCHES: f64 = 8.0;

/// Output resolution in dots per inch
pub const DPI: u32 = 300;

/// Canvas edge in pixels (2400)
pub const CANVAS_PIXELS: u32 = (CANVAS_INCHES as u32) * DPI;

/// PNG compression level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

impl PngCompression {
    /// Parse from string value
    ///
    /// Validation happens in PropertyReader::get_enum(); unknown values map
    /// to Default.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "fast" => Self::Fast,
            "best" => Self::Best,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Default => "default",
            Self::Best => "best",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotterConfig {
    /// Colour map name as given; recognized at render time
    pub colormap: String,

    /// PNG compression level: "fast", "default", "best"
    pub png_compression: PngCompression,

    /// Colour bar axis label, "Intensidade" by default
    pub legend_label: String,

    /// Font family for all text
    pub font_family: String,

    /// Title font size in points
    pub title_font_pt: f64,

    /// Legend label font size in points
    pub legend_font_pt: f64,

    /// Legend tick label font size in points
    pub tick_font_pt: f64,
}

impl PlotterConfig {
    /// Create config from properties
    pub fn from_properties(props: &PropertyReader) -> Self {
        let colormap = props.get_string("colormap");
        let png_compression = PngCompression::parse(&props.get_enum("png.compression"));
        let legend_label = props.get_string("legend.label");
        let font_family = props.get_string("font.family");

        let title_font_pt = props.get_f64_in_range("title.font.size", 1.0, 200.0);
        let legend_font_pt = props.get_f64_in_range("legend.font.size", 1.0, 200.0);
        let tick_font_pt = props.get_f64_in_range("tick.font.size", 1.0, 200.0);

        Self {
            colormap,
            png_compression,
            legend_label,
            font_family,
            title_font_pt,
            legend_font_pt,
            tick_font_pt,
        }
    }

    /// Convert a point size to pixels at the fixed output resolution
    pub fn points_to_pixels(points: f64) -> u32 {
        (points * DPI as f64 / 72.0).round().max(1.0) as u32
    }
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self::from_properties(&PropertyReader::default())
    }
}
