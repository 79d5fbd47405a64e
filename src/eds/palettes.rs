//! Colour map registry
//!
//! Loads the recognized colour maps from palettes.json (embedded at compile
//! time) and provides access by name. The names and stop colours follow the
//! matplotlib maps commonly used for EDS maps.
//!
//! Palette types:
//! - `sequential`: Gradient from low to high intensity
//! - `diverging`: Gradient with a neutral midpoint
//!
//! Lookup is case-insensitive and a `_r` suffix selects the reversed map
//! (`viridis_r`), as in matplotlib.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

/// Embedded palettes.json content
const PALETTES_JSON: &str = include_str!("../../palettes.json");

/// Suffix that selects a reversed colour map
const REVERSED_SUFFIX: &str = "_r";

/// Global palette registry, initialized lazily on first access
pub static PALETTE_REGISTRY: Lazy<PaletteRegistry> = Lazy::new(|| {
    PaletteRegistry::from_json(PALETTES_JSON).unwrap_or_else(|e| {
        tracing::error!("Failed to load palettes.json: {}", e);
        PaletteRegistry::default()
    })
});

/// Palette type as defined in palettes.json
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteType {
    Sequential,
    Diverging,
}

/// A single palette definition from palettes.json
#[derive(Debug, Clone, Deserialize)]
pub struct PaletteDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub palette_type: PaletteType,
    pub colors: Vec<String>,
}

impl PaletteDefinition {
    /// Get a stop colour by index (clamped to the last stop)
    pub fn get_color(&self, index: usize) -> [u8; 3] {
        if self.colors.is_empty() {
            return [128, 128, 128];
        }
        let idx = index.min(self.colors.len() - 1);
        parse_hex_color(&self.colors[idx]).unwrap_or([128, 128, 128])
    }

    /// Number of colour stops
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Interpolate a colour at position t ∈ [0, 1]
    ///
    /// t=0 returns the first stop, t=1 the last. Stops are evenly spaced and
    /// values in between are linearly interpolated per channel.
    pub fn interpolate(&self, t: f64) -> [u8; 3] {
        if self.colors.is_empty() {
            return [128, 128, 128];
        }

        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let n = self.colors.len();

        if n == 1 {
            return self.get_color(0);
        }

        let pos = t * (n - 1) as f64;
        let idx_low = (pos.floor() as usize).min(n - 1);
        let idx_high = (idx_low + 1).min(n - 1);
        let frac = pos - idx_low as f64;

        let low = self.get_color(idx_low);
        let high = self.get_color(idx_high);

        let mix = |a: u8, b: u8| (a as f64 * (1.0 - frac) + b as f64 * frac).round() as u8;
        [
            mix(low[0], high[0]),
            mix(low[1], high[1]),
            mix(low[2], high[2]),
        ]
    }
}

/// A resolved colour map: a palette, optionally reversed
#[derive(Debug, Clone, Copy)]
pub struct ColorMap<'a> {
    pub definition: &'a PaletteDefinition,
    pub reversed: bool,
}

impl ColorMap<'_> {
    /// Colour at normalized position t ∈ [0, 1]
    pub fn color_at(&self, t: f64) -> [u8; 3] {
        let t = if self.reversed { 1.0 - t } else { t };
        self.definition.interpolate(t)
    }

    /// Display name, including the `_r` suffix when reversed
    pub fn name(&self) -> String {
        if self.reversed {
            format!("{}{}", self.definition.name, REVERSED_SUFFIX)
        } else {
            self.definition.name.clone()
        }
    }
}

/// Registry of all recognized colour maps
#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    /// All palettes by name (lowercase keys for case-insensitive lookup)
    palettes: HashMap<String, PaletteDefinition>,
    /// Names in file order (for listing)
    names: Vec<String>,
    /// Sequential palette names
    sequential_names: Vec<String>,
    /// Diverging palette names
    diverging_names: Vec<String>,
}

impl PaletteRegistry {
    /// Load palettes from JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        let definitions: Vec<PaletteDefinition> = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse palettes JSON: {}", e))?;

        let mut registry = Self::default();

        for def in definitions {
            if def.colors.iter().any(|c| parse_hex_color(c).is_none()) {
                return Err(format!("Palette '{}' has an invalid colour", def.name));
            }
            let name = def.name.clone();
            match def.palette_type {
                PaletteType::Sequential => registry.sequential_names.push(name.clone()),
                PaletteType::Diverging => registry.diverging_names.push(name.clone()),
            }
            registry.names.push(name.clone());
            registry.palettes.insert(name.to_lowercase(), def);
        }

        tracing::debug!(
            "PaletteRegistry: loaded {} palettes ({} sequential, {} diverging)",
            registry.palettes.len(),
            registry.sequential_names.len(),
            registry.diverging_names.len()
        );

        Ok(registry)
    }

    /// Get a palette by exact name (case-insensitive, no suffix handling)
    pub fn get(&self, name: &str) -> Option<&PaletteDefinition> {
        self.palettes.get(&name.to_lowercase())
    }

    /// Resolve a colour map name, honouring the `_r` suffix
    pub fn resolve(&self, name: &str) -> Option<ColorMap<'_>> {
        let name = name.trim();
        if let Some(definition) = self.get(name) {
            return Some(ColorMap {
                definition,
                reversed: false,
            });
        }
        let lower = name.to_lowercase();
        let base = lower.strip_suffix(REVERSED_SUFFIX)?;
        self.palettes.get(base).map(|definition| ColorMap {
            definition,
            reversed: true,
        })
    }

    /// True if `name` resolves to a colour map
    pub fn is_recognized(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// All palette names in file order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn sequential_palettes(&self) -> &[String] {
        &self.sequential_names
    }

    pub fn diverging_palettes(&self) -> &[String] {
        &self.diverging_names
    }
}

/// Parse a hex color string to RGB array
///
/// Supports `#RRGGBB`, `#RRGGBBAA` (alpha ignored), with or without `#`.
fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim_start_matches('#');

    if hex.len() != 6 && hex.len() != 8 {
        return None;
    }

    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;

    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000"), Some([255, 0, 0]));
        assert_eq!(parse_hex_color("#08306B"), Some([8, 48, 107]));
        assert_eq!(parse_hex_color("440154"), Some([68, 1, 84]));
        assert_eq!(parse_hex_color("#440154FF"), Some([68, 1, 84]));

        assert_eq!(parse_hex_color("#FFF"), None);
        assert_eq!(parse_hex_color("GGGGGG"), None);
    }

    #[test]
    fn test_registry_has_all_maps() {
        let registry = &*PALETTE_REGISTRY;
        for name in [
            "Blues", "viridis", "magma", "inferno", "plasma", "cividis", "Greys", "Reds",
            "Greens", "Oranges", "Purples", "turbo", "Spectral", "coolwarm", "seismic",
        ] {
            assert!(registry.is_recognized(name), "missing {}", name);
        }
        assert_eq!(registry.names().len(), 15);
        // The configured default must resolve
        let default = crate::eds::properties::registry().get_default("colormap");
        assert!(default.is_some_and(|name| registry.is_recognized(name)));
        assert!(registry.diverging_palettes().contains(&"seismic".to_string()));
        assert!(registry.sequential_palettes().contains(&"viridis".to_string()));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = &*PALETTE_REGISTRY;
        assert!(registry.resolve("VIRIDIS").is_some());
        assert!(registry.resolve("blues").is_some());
        assert!(registry.resolve("jet").is_none());
        assert!(registry.resolve("").is_none());
        assert!(registry.resolve("_r").is_none());
    }

    #[test]
    fn test_reversed_suffix() {
        let registry = &*PALETTE_REGISTRY;
        let forward = registry.resolve("Greys").unwrap();
        let reversed = registry.resolve("Greys_r").unwrap();
        assert!(!forward.reversed);
        assert!(reversed.reversed);
        assert_eq!(reversed.name(), "Greys_r");
        assert_eq!(forward.color_at(0.0), [255, 255, 255]);
        assert_eq!(reversed.color_at(0.0), [0, 0, 0]);
        assert_eq!(reversed.color_at(1.0), [255, 255, 255]);
    }

    #[test]
    fn test_interpolation_endpoints_and_midpoint() {
        let seismic = PALETTE_REGISTRY.get("seismic").unwrap();
        assert_eq!(seismic.interpolate(0.0), [0, 0, 76]);
        assert_eq!(seismic.interpolate(0.5), [255, 255, 255]);
        assert_eq!(seismic.interpolate(1.0), [127, 0, 0]);
        // Out-of-range and NaN clamp to the ends
        assert_eq!(seismic.interpolate(2.0), [127, 0, 0]);
        assert_eq!(seismic.interpolate(f64::NAN), [0, 0, 76]);

        // Halfway between #0000FF (t=0.25) and #FFFFFF (t=0.5)
        assert_eq!(seismic.interpolate(0.375), [128, 128, 255]);
    }

    #[test]
    fn test_invalid_palette_json_is_rejected() {
        assert!(PaletteRegistry::from_json("not json").is_err());
        let bad = r##"[{"name": "x", "type": "sequential", "colors": ["#12"]}]"##;
        assert!(PaletteRegistry::from_json(bad).is_err());
    }
}
