//! Output naming for EDS maps
//!
//! Exports are named `{sample}_{element}.csv`. The element is the last
//! underscore-separated token of the base name; the rendered map is written
//! as `{sample}_edsmap_{element}.png`, or `edsmap_{element}.png` when the
//! base name has no underscore.

use super::error::{EdsMapError, Result};
use std::path::Path;

/// Marker inserted between the sample prefix and the element label
pub const MAP_MARKER: &str = "edsmap";

/// Extension of rendered maps
pub const OUTPUT_EXTENSION: &str = "png";

/// Identity of an input grid derived from its base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    /// Analyte/channel label, used in the title and output name
    pub element_label: String,
    /// Everything before the last underscore, if there was one
    pub prefix: Option<String>,
    /// Output file name without extension
    pub output_base_name: String,
}

impl SourceIdentity {
    /// Derive the identity from a base name (no directory, no extension)
    pub fn derive(base_name: &str) -> Result<Self> {
        if base_name.is_empty() {
            return Err(EdsMapError::InvalidName(
                "input base name is empty".to_string(),
            ));
        }

        // rsplit_once keeps empty tokens on both sides, same as a literal split
        let identity = match base_name.rsplit_once('_') {
            Some((prefix, element)) => SourceIdentity {
                element_label: element.to_string(),
                prefix: Some(prefix.to_string()),
                output_base_name: format!("{}_{}_{}", prefix, MAP_MARKER, element),
            },
            None => SourceIdentity {
                element_label: base_name.to_string(),
                prefix: None,
                output_base_name: format!("{}_{}", MAP_MARKER, base_name),
            },
        };
        Ok(identity)
    }

    /// Derive the identity from an input file path
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem.is_empty() {
            return Err(EdsMapError::InvalidName(format!(
                "cannot take a base name from '{}'",
                path.display()
            )));
        }
        Self::derive(&stem)
    }

    /// `{output_base_name}.png`
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.output_base_name, OUTPUT_EXTENSION)
    }

    /// Title drawn above the map
    pub fn title(&self) -> String {
        map_title(&self.element_label)
    }
}

/// `EDS-Map - {element}`
pub fn map_title(element_label: &str) -> String {
    format!("EDS-Map - {}", element_label)
}

/// Convenience wrapper around [`SourceIdentity::derive`]
pub fn derive(base_name: &str) -> Result<SourceIdentity> {
    SourceIdentity::derive(base_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_and_element() {
        let id = derive("Sample1_Fe").unwrap();
        assert_eq!(id.element_label, "Fe");
        assert_eq!(id.prefix.as_deref(), Some("Sample1"));
        assert_eq!(id.output_base_name, "Sample1_edsmap_Fe");
        assert_eq!(id.output_file_name(), "Sample1_edsmap_Fe.png");
        assert_eq!(id.title(), "EDS-Map - Fe");
    }

    #[test]
    fn test_single_token() {
        let id = derive("Oxygen").unwrap();
        assert_eq!(id.element_label, "Oxygen");
        assert_eq!(id.prefix, None);
        assert_eq!(id.output_base_name, "edsmap_Oxygen");
    }

    #[test]
    fn test_only_last_token_is_peeled() {
        let id = derive("A_B_C").unwrap();
        assert_eq!(id.element_label, "C");
        assert_eq!(id.output_base_name, "A_B_edsmap_C");
    }

    #[test]
    fn test_empty_tokens_are_preserved() {
        let id = derive("A__B").unwrap();
        assert_eq!(id.element_label, "B");
        assert_eq!(id.output_base_name, "A__edsmap_B");

        let id = derive("A_").unwrap();
        assert_eq!(id.element_label, "");
        assert_eq!(id.output_base_name, "A_edsmap_");

        let id = derive("_Fe").unwrap();
        assert_eq!(id.prefix.as_deref(), Some(""));
        assert_eq!(id.output_base_name, "_edsmap_Fe");
    }

    #[test]
    fn test_unicode_passes_through() {
        let id = derive("Amostra_Ferro_Óxido").unwrap();
        assert_eq!(id.element_label, "Óxido");
        assert_eq!(id.output_base_name, "Amostra_Ferro_edsmap_Óxido");
    }

    #[test]
    fn test_empty_name_is_rejected() {
        assert!(matches!(derive(""), Err(EdsMapError::InvalidName(_))));
    }

    #[test]
    fn test_from_path_strips_directory_and_extension() {
        let id = SourceIdentity::from_path("/data/run.2/Sample1_Fe.csv").unwrap();
        assert_eq!(id.output_base_name, "Sample1_edsmap_Fe");

        let id = SourceIdentity::from_path("maps/Map.v2_Si.csv").unwrap();
        assert_eq!(id.element_label, "Si");
        assert_eq!(id.output_base_name, "Map.v2_edsmap_Si");
    }

    #[test]
    fn test_from_path_without_file_name() {
        assert!(SourceIdentity::from_path("/").is_err());
    }
}
