//! EDS map rendering
//!
//! Draws one map per grid on a fixed 2400 × 2400 canvas (8 × 8 inches at
//! 300 DPI):
//!
//! ```text
//! +-------------------------------------------+
//! |          EDS-Map - {element}              |
//! | +-------------------------+  +--+         |
//! | |                         |  |  | - max   |
//! | |   interpolated field    |  |  |         |
//! | |                         |  |  | - ...   | Intensidade
//! | |                         |  |  |         |
//! | +-------------------------+  +--+ - min   |
//! +-------------------------------------------+
//! ```
//!
//! Text, the legend bar and its axis are drawn with plotters into a canvas
//! buffer owned by [`RenderContext`]; the field itself is painted straight
//! into the same buffer, then the buffer is PNG-encoded and moved into place.

use super::colors::{format_tick, ColorScale, NO_DATA_COLOR};
use super::error::{EdsMapError, Result};
use super::grid::NumericGrid;
use super::naming::map_title;
use super::palettes::PALETTE_REGISTRY;
use crate::config::{PlotterConfig, PngCompression, CANVAS_PIXELS, DPI};
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Blank border around the whole figure, in pixels
const OUTER_MARGIN: i32 = 60;

/// Width of the colour bar itself, in pixels
const LEGEND_BAR_WIDTH: i32 = 100;

/// Gap between the field and the colour bar, in pixels
const LEGEND_GAP: i32 = 60;

/// Number of tick labels requested on the legend axis
const LEGEND_TICKS: usize = 6;

/// Pixels per metre for the PNG pHYs chunk (300 DPI)
const PIXELS_PER_METRE: u32 = (DPI as f64 / 0.0254 + 0.5) as u32;

/// A map written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMap {
    pub path: PathBuf,
    pub element_label: String,
    pub width: u32,
    pub height: u32,
    /// Intensity range the colours were scaled to
    pub value_range: (f64, f64),
    /// Encoded PNG size in bytes
    pub bytes: usize,
}

/// Absolute pixel rectangle on the canvas
#[derive(Debug, Clone, PartialEq, Eq)]
struct PixelRect {
    x: Range<i32>,
    y: Range<i32>,
}

impl PixelRect {
    fn from_ranges((x, y): (Range<i32>, Range<i32>)) -> Self {
        PixelRect { x, y }
    }

    fn width(&self) -> u32 {
        (self.x.end - self.x.start).max(0) as u32
    }

    fn height(&self) -> u32 {
        (self.y.end - self.y.start).max(0) as u32
    }
}

/// Canvas buffer borrowed for the duration of one render
///
/// Acquiring resets the buffer to a blank canvas; dropping clears it, so a
/// failed render leaves nothing behind for the next one.
struct CanvasLease<'a> {
    buffer: &'a mut Vec<u8>,
}

impl<'a> CanvasLease<'a> {
    fn acquire(buffer: &'a mut Vec<u8>, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        buffer.clear();
        buffer.resize(len, NO_DATA_COLOR[0]);
        CanvasLease { buffer }
    }

    fn pixels(&mut self) -> &mut [u8] {
        self.buffer.as_mut_slice()
    }
}

impl Drop for CanvasLease<'_> {
    fn drop(&mut self) {
        self.buffer.clear();
    }
}

/// Caller-owned rendering state
///
/// Holds the configuration and a canvas buffer that is reused across calls,
/// so a batch allocates the canvas once. Not shared between threads; a
/// parallel caller gives each worker its own context.
#[derive(Debug)]
pub struct RenderContext {
    config: PlotterConfig,
    canvas: Vec<u8>,
    renders: u64,
}

impl RenderContext {
    pub fn new(config: PlotterConfig) -> Self {
        RenderContext {
            config,
            canvas: Vec::new(),
            renders: 0,
        }
    }

    pub fn config(&self) -> &PlotterConfig {
        &self.config
    }

    /// Number of successful renders performed with this context
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Free the canvas allocation (it is re-created on the next render)
    pub fn release(&mut self) {
        self.canvas = Vec::new();
    }

    /// Render `grid` as a colour-mapped PNG at `output_path`
    ///
    /// # Errors
    /// `Render` if the colour map is unknown, the output directory cannot be
    /// created, drawing fails, or the image cannot be written. Nothing is
    /// written at `output_path` unless the whole image was encoded.
    pub fn render(
        &mut self,
        grid: &NumericGrid,
        element_label: &str,
        output_path: &Path,
        colormap_name: &str,
    ) -> Result<RenderedMap> {
        let colormap = PALETTE_REGISTRY.resolve(colormap_name).ok_or_else(|| {
            EdsMapError::Render(format!("Unknown colour map '{}'", colormap_name))
        })?;
        let scale = ColorScale::for_grid(colormap, grid)
            .ok_or_else(|| EdsMapError::Render("grid has no numeric cell".to_string()))?;
        if !scale.has_drawable_legend() {
            let (min, max) = scale.range();
            return Err(EdsMapError::Render(format!(
                "Intensity range {:e}..{:e} is too wide to draw",
                min, max
            )));
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EdsMapError::Render(format!(
                    "Cannot create output directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let (width, height) = (CANVAS_PIXELS, CANVAS_PIXELS);
        let title = map_title(element_label);

        let png = {
            let mut lease = CanvasLease::acquire(&mut self.canvas, width, height);
            let panel = draw_frame(lease.pixels(), (width, height), &title, &scale, &self.config)
                .map_err(|e| EdsMapError::Render(format!("Drawing failed: {}", e)))?;
            debug!(
                "Panel {}×{} px at ({}, {})",
                panel.width(),
                panel.height(),
                panel.x.start,
                panel.y.start
            );
            paint_field(lease.pixels(), width, &panel, grid, &scale);
            encode_png(lease.pixels(), width, height, self.config.png_compression)?
        };

        write_atomically(output_path, &png)?;
        self.renders += 1;

        info!(
            "Rendered {} ({} bytes, colour map {})",
            output_path.display(),
            png.len(),
            colormap.name()
        );

        Ok(RenderedMap {
            path: output_path.to_path_buf(),
            element_label: element_label.to_string(),
            width,
            height,
            value_range: scale.range(),
            bytes: png.len(),
        })
    }
}

/// Draw title and legend; return the pixel rectangle reserved for the field
fn draw_frame(
    buffer: &mut [u8],
    size: (u32, u32),
    title: &str,
    scale: &ColorScale<'_>,
    config: &PlotterConfig,
) -> DrawResult<PixelRect> {
    let family = config.font_family.as_str();
    let title_font = (
        family,
        PlotterConfig::points_to_pixels(config.title_font_pt) as f64,
    )
        .into_font();
    let legend_px = PlotterConfig::points_to_pixels(config.legend_font_pt);
    let tick_px = PlotterConfig::points_to_pixels(config.tick_font_pt);

    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.margin(OUTER_MARGIN, OUTER_MARGIN, OUTER_MARGIN, OUTER_MARGIN);

    let label_area = (tick_px * 4 + legend_px * 2) as i32;
    let legend_width = LEGEND_GAP + LEGEND_BAR_WIDTH + label_area;
    let (root_width, _) = root.dim_in_pixel();
    let split_at = (root_width as i32 - legend_width).max(0);
    let (left, legend_area) = root.split_horizontally(split_at);

    let panel = left.titled(title, title_font)?;
    let panel_rect = PixelRect::from_ranges(panel.get_pixel_range());
    let legend_rect = PixelRect::from_ranges(legend_area.get_pixel_range());

    let (lo, hi) = scale.legend_range();
    let span = hi - lo;
    let tick_formatter = |v: &f64| format_tick(*v, span);

    let top_offset = (panel_rect.y.start - legend_rect.y.start).max(0);
    let bottom_offset = (legend_rect.y.end - panel_rect.y.end).max(0);

    let mut legend = ChartBuilder::on(&legend_area)
        .margin_top(top_offset)
        .margin_bottom(bottom_offset)
        .margin_left(LEGEND_GAP)
        .margin_right(0)
        .set_label_area_size(LabelAreaPosition::Right, label_area)
        .build_cartesian_2d(0.0..1.0, lo..hi)?;

    legend
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_labels(LEGEND_TICKS)
        .y_label_formatter(&tick_formatter)
        .label_style((family, tick_px as f64))
        .y_desc(config.legend_label.as_str())
        .axis_desc_style((family, legend_px as f64))
        .draw()?;

    let bar_rect = PixelRect::from_ranges(legend.plotting_area().get_pixel_range());
    let steps = bar_rect.height().max(1) as usize;
    let delta = span / steps as f64;
    legend.draw_series((0..steps).map(|step| {
        let v0 = lo + delta * step as f64;
        let v1 = v0 + delta;
        let [r, g, b] = scale.colormap().color_at(scale.normalize((v0 + v1) * 0.5));
        Rectangle::new([(0.0, v0), (1.0, v1)], RGBColor(r, g, b).filled())
    }))?;
    legend.draw_series(std::iter::once(Rectangle::new(
        [(0.0, lo), (1.0, hi)],
        BLACK.stroke_width(2),
    )))?;

    root.present()?;
    Ok(panel_rect)
}

/// Continuous grid coordinate of the centre of pixel `offset` along an axis
/// of `extent` pixels covering `cells` cells. Cell centres sit at integers.
fn grid_coordinate(offset: u32, extent: u32, cells: usize) -> f64 {
    (offset as f64 + 0.5) / extent as f64 * cells as f64 - 0.5
}

/// Bilinear sample of the grid at continuous coordinates
///
/// None if the nearest cell is missing. Otherwise missing neighbours are
/// dropped and the remaining weights renormalized.
fn sample_bilinear(grid: &NumericGrid, gx: f64, gy: f64) -> Option<f64> {
    let (rows, cols) = (grid.rows(), grid.cols());
    if rows == 0 || cols == 0 {
        return None;
    }
    let gx = gx.clamp(0.0, (cols - 1) as f64);
    let gy = gy.clamp(0.0, (rows - 1) as f64);

    let nearest = grid.get(gy.round() as usize, gx.round() as usize)?;
    if nearest.is_nan() {
        return None;
    }

    let x0 = gx.floor() as usize;
    let y0 = gy.floor() as usize;
    let x1 = (x0 + 1).min(cols - 1);
    let y1 = (y0 + 1).min(rows - 1);
    let fx = gx - x0 as f64;
    let fy = gy - y0 as f64;

    let corners = [
        (y0, x0, (1.0 - fx) * (1.0 - fy)),
        (y0, x1, fx * (1.0 - fy)),
        (y1, x0, (1.0 - fx) * fy),
        (y1, x1, fx * fy),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (row, col, w) in corners {
        if let Some(v) = grid.get(row, col).filter(|v| !v.is_nan()) {
            sum += v * w;
            weight += w;
        }
    }

    if weight > 0.0 {
        Some(sum / weight)
    } else {
        Some(nearest)
    }
}

/// Paint the interpolated field into `rect` of an RGB canvas
fn paint_field(
    buffer: &mut [u8],
    canvas_width: u32,
    rect: &PixelRect,
    grid: &NumericGrid,
    scale: &ColorScale<'_>,
) {
    let (width, height) = (rect.width(), rect.height());
    if width == 0 || height == 0 {
        return;
    }

    let columns: Vec<f64> = (0..width)
        .map(|px| grid_coordinate(px, width, grid.cols()))
        .collect();

    for py in 0..height {
        let gy = grid_coordinate(py, height, grid.rows());
        let y = rect.y.start as usize + py as usize;
        let row_start = y * canvas_width as usize;
        for (px, gx) in columns.iter().enumerate() {
            let color = sample_bilinear(grid, *gx, gy)
                .and_then(|v| scale.color_for(v))
                .unwrap_or(NO_DATA_COLOR);
            let idx = (row_start + rect.x.start as usize + px) * 3;
            buffer[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

/// Encode an RGB canvas as PNG with a 300 DPI physical size
fn encode_png(
    pixels: &[u8],
    width: u32,
    height: u32,
    compression: PngCompression,
) -> Result<Vec<u8>> {
    let encode_err = |e: png::EncodingError| EdsMapError::Render(format!("PNG encoding failed: {}", e));

    let mut bytes = Vec::new();
    let mut encoder = png::Encoder::new(&mut bytes, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(match compression {
        PngCompression::Fast => png::Compression::Fast,
        PngCompression::Default => png::Compression::Default,
        PngCompression::Best => png::Compression::Best,
    });
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: PIXELS_PER_METRE,
        yppu: PIXELS_PER_METRE,
        unit: png::Unit::Meter,
    }));

    let mut writer = encoder.write_header().map_err(encode_err)?;
    writer.write_image_data(pixels).map_err(encode_err)?;
    writer.finish().map_err(encode_err)?;

    Ok(bytes)
}

/// Write `bytes` to a temporary file next to `path`, then rename it over
/// `path`. The temporary file is removed on failure.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            EdsMapError::Render(format!("Output path {} has no file name", path.display()))
        })?;
    let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = std::fs::write(&temp_path, bytes).and_then(|_| std::fs::rename(&temp_path, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(EdsMapError::Render(format!(
            "Cannot write {}: {}",
            path.display(),
            e
        )));
    }
    Ok(())
}
