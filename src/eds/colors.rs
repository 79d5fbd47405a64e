//! Value-to-colour mapping for a single map
//!
//! Every map is normalized over its own observed range: the lowest intensity
//! in the file gets the first colour of the map and the highest gets the
//! last. Scales are therefore not comparable across files.

use super::grid::NumericGrid;
use super::palettes::ColorMap;

/// Background colour used for missing cells and the canvas
pub const NO_DATA_COLOR: [u8; 3] = [255, 255, 255];

/// Continuous colour scale over a closed value range
#[derive(Debug, Clone, Copy)]
pub struct ColorScale<'a> {
    colormap: ColorMap<'a>,
    min: f64,
    max: f64,
}

impl<'a> ColorScale<'a> {
    pub fn new(colormap: ColorMap<'a>, min: f64, max: f64) -> Self {
        ColorScale { colormap, min, max }
    }

    /// Scale over the grid's own finite range. None if the grid has no
    /// numeric cell.
    pub fn for_grid(colormap: ColorMap<'a>, grid: &NumericGrid) -> Option<Self> {
        grid.value_range()
            .map(|(min, max)| Self::new(colormap, min, max))
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn colormap(&self) -> ColorMap<'a> {
        self.colormap
    }

    /// Position of `value` in [0, 1]. A flat range maps to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        // Halved endpoints keep the span finite across the whole f64 range
        let half_span = self.max / 2.0 - self.min / 2.0;
        if half_span <= 0.0 || !half_span.is_finite() {
            return 0.0;
        }
        ((value / 2.0 - self.min / 2.0) / half_span).clamp(0.0, 1.0)
    }

    /// Colour for a value; None for missing values
    pub fn color_for(&self, value: f64) -> Option<[u8; 3]> {
        if !value.is_finite() {
            return None;
        }
        Some(self.colormap.color_at(self.normalize(value)))
    }

    /// True if the legend axis can be drawn: finite ends and a span that
    /// does not overflow
    pub fn has_drawable_legend(&self) -> bool {
        let (lo, hi) = self.legend_range();
        lo.is_finite() && hi.is_finite() && (hi - lo).is_finite()
    }

    /// Value range shown on the legend axis. A flat range is widened so the
    /// axis has non-zero extent.
    pub fn legend_range(&self) -> (f64, f64) {
        if self.max > self.min {
            (self.min, self.max)
        } else {
            let pad = if self.min == 0.0 {
                0.5
            } else {
                self.min.abs() * 0.05
            };
            (self.min - pad, self.max + pad)
        }
    }
}

/// Most decimals shown in fixed notation; finer spans switch to exponent form
const MAX_FIXED_DECIMALS: f64 = 6.0;

/// Format a legend tick label with precision suited to the axis span
///
/// Enough significant digits are kept that ticks one span-step apart get
/// different labels, even when the span is tiny relative to the value.
pub fn format_tick(value: f64, span: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    let span_exponent = (span > 0.0 && span.is_finite()).then(|| span.log10().floor());
    let decimals = span_exponent.map(|e| (2.0 - e).max(0.0)).unwrap_or(2.0);

    if magnitude >= 1e6 || magnitude < 1e-4 || decimals > MAX_FIXED_DECIMALS {
        let digits = span_exponent
            .map(|e| (magnitude.log10().floor() - e + 1.0).max(1.0))
            .unwrap_or(1.0);
        return format!("{:.*e}", digits as usize, value);
    }

    let text = format!("{:.*}", decimals as usize, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eds::palettes::PALETTE_REGISTRY;

    fn greys() -> ColorMap<'static> {
        PALETTE_REGISTRY.resolve("Greys").unwrap()
    }

    #[test]
    fn test_normalize_uses_grid_range() {
        let grid = NumericGrid::from_rows(vec![vec![10.0, f64::NAN], vec![20.0, 30.0]]).unwrap();
        let scale = ColorScale::for_grid(greys(), &grid).unwrap();
        assert_eq!(scale.range(), (10.0, 30.0));
        assert_eq!(scale.normalize(10.0), 0.0);
        assert_eq!(scale.normalize(20.0), 0.5);
        assert_eq!(scale.normalize(30.0), 1.0);
        assert_eq!(scale.normalize(99.0), 1.0);
    }

    #[test]
    fn test_color_for_missing_is_none() {
        let scale = ColorScale::new(greys(), 0.0, 1.0);
        assert_eq!(scale.color_for(f64::NAN), None);
        assert_eq!(scale.color_for(0.0), Some([255, 255, 255]));
        assert_eq!(scale.color_for(1.0), Some([0, 0, 0]));
    }

    #[test]
    fn test_flat_grid_maps_to_low_end() {
        let scale = ColorScale::new(greys(), 5.0, 5.0);
        assert_eq!(scale.normalize(5.0), 0.0);
        let (lo, hi) = scale.legend_range();
        assert!(lo < 5.0 && hi > 5.0);

        let zero = ColorScale::new(greys(), 0.0, 0.0);
        assert_eq!(zero.legend_range(), (-0.5, 0.5));
    }

    #[test]
    fn test_all_missing_grid_has_no_scale() {
        let grid = NumericGrid::from_rows(vec![vec![f64::NAN]]).unwrap();
        assert!(ColorScale::for_grid(greys(), &grid).is_none());
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0, 10.0), "0");
        assert_eq!(format_tick(250.0, 1000.0), "250");
        assert_eq!(format_tick(2.5, 10.0), "2.5");
        assert_eq!(format_tick(0.125, 0.5), "0.125");
        assert_eq!(format_tick(1.5e7, 1e7), "1.5e7");
    }

    #[test]
    fn test_format_tick_near_flat_range_stays_distinct() {
        let (lo, span) = (1.0, 1e-9);
        let labels: Vec<String> = (0..6)
            .map(|i| format_tick(lo + span * i as f64 / 5.0, span))
            .collect();
        for pair in labels.windows(2) {
            assert_ne!(pair[0], pair[1], "{:?}", labels);
        }

        let labels: Vec<String> = [1e6, 1e6 + 0.5, 1e6 + 1.0]
            .iter()
            .map(|v| format_tick(*v, 1.0))
            .collect();
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
    }

    #[test]
    fn test_normalize_full_f64_range() {
        let scale = ColorScale::new(greys(), -1e308, 1e308);
        assert_eq!(scale.normalize(-1e308), 0.0);
        assert_eq!(scale.normalize(0.0), 0.5);
        assert_eq!(scale.normalize(1e308), 1.0);
        assert!(!scale.has_drawable_legend());

        assert!(ColorScale::new(greys(), 0.0, 1e308).has_drawable_legend());
        assert!(ColorScale::new(greys(), 5.0, 5.0).has_drawable_legend());
        assert!(!ColorScale::new(greys(), f64::MAX, f64::MAX).has_drawable_legend());
    }
}
