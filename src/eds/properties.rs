//! Plotter property definitions with defaults from plotter.json
//!
//! plotter.json is embedded at compile time and is the single place where
//! property defaults live. User values (from a JSON config file or the
//! command line) are layered on top through [`PropertyReader`].

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// plotter.json embedded at compile time
const PLOTTER_JSON: &str = include_str!("../../plotter.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PropertyKind {
    #[serde(rename = "StringProperty")]
    String,
    #[serde(rename = "EnumeratedProperty")]
    Enumerated,
}

/// Property definition from plotter.json
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub kind: PropertyKind,
    #[serde(rename = "defaultValue", default)]
    pub default_value: String,
    #[serde(default)]
    pub description: String,
    /// For EnumeratedProperty, the valid values
    #[serde(rename = "values")]
    pub valid_values: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PlotterSpec {
    properties: Vec<PropertyDef>,
}

/// Registry of all plotter properties with their defaults
pub struct PropertyRegistry {
    properties: HashMap<String, PropertyDef>,
}

impl PropertyRegistry {
    /// Parse a plotter.json document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let spec: PlotterSpec = serde_json::from_str(json)?;
        let properties = spec
            .properties
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Ok(Self { properties })
    }

    /// Get the default value for a property
    pub fn get_default(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|p| p.default_value.as_str())
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    /// Check if a value is valid for an enumerated property
    pub fn is_valid_enum_value(&self, name: &str, value: &str) -> bool {
        self.properties
            .get(name)
            .and_then(|p| p.valid_values.as_ref())
            .map(|values| values.iter().any(|v| v.eq_ignore_ascii_case(value)))
            .unwrap_or(true)
    }
}

static REGISTRY: std::sync::OnceLock<PropertyRegistry> = std::sync::OnceLock::new();

/// Get the global property registry
///
/// Panics if the embedded plotter.json is malformed, which a unit test
/// rules out.
pub fn registry() -> &'static PropertyRegistry {
    REGISTRY.get_or_init(|| {
        PropertyRegistry::from_json(PLOTTER_JSON).expect("plotter.json is invalid")
    })
}

/// Typed property reader: user value if set, plotter.json default otherwise
#[derive(Debug, Clone, Default)]
pub struct PropertyReader {
    user_values: HashMap<String, String>,
}

impl PropertyReader {
    /// Create from user values. Empty strings count as "not set".
    pub fn new(user_values: HashMap<String, String>) -> Self {
        let user_values = user_values
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { user_values }
    }

    /// Create from a JSON object of `"name": value` pairs
    ///
    /// Strings, numbers and booleans are accepted; other values are skipped.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut user_values = HashMap::new();
        for (key, value) in map {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    warn!("Ignoring property '{}' with unsupported value {}", key, other);
                    continue;
                }
            };
            if registry().get_property(&key).is_none() {
                warn!("Unknown property '{}' in config file", key);
            }
            user_values.insert(key, value);
        }
        Ok(Self::new(user_values))
    }

    /// Read a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Override a single value (CLI flags win over the config file)
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.user_values.insert(name.into(), value);
        }
    }

    /// String property (user value or default)
    pub fn get_string(&self, name: &str) -> String {
        if let Some(value) = self.user_values.get(name) {
            return value.clone();
        }
        registry().get_default(name).unwrap_or("").to_string()
    }

    /// Enumerated property; invalid user values fall back to the default
    pub fn get_enum(&self, name: &str) -> String {
        let reg = registry();
        let default = reg.get_default(name).unwrap_or("");

        if let Some(value) = self.user_values.get(name) {
            if reg.is_valid_enum_value(name, value) {
                return value.to_lowercase();
            }
            let valid_values = reg
                .get_property(name)
                .and_then(|p| p.valid_values.as_ref())
                .map(|v| v.join(", "))
                .unwrap_or_default();
            warn!(
                "Invalid value '{}' for property '{}'. Valid values: [{}]. Using default: '{}'",
                value, name, valid_values, default
            );
        }

        default.to_string()
    }

    /// f64 property within [min, max]; falls back to the default otherwise
    pub fn get_f64_in_range(&self, name: &str, min: f64, max: f64) -> f64 {
        let default = registry()
            .get_default(name)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        let value = self.get_string(name);
        match value.parse::<f64>() {
            Ok(v) if (min..=max).contains(&v) => v,
            Ok(v) => {
                warn!(
                    "Value {} for property '{}' out of range [{}, {}]. Using default: {}",
                    v, name, min, max, default
                );
                default
            }
            Err(_) => {
                warn!(
                    "Invalid numeric value '{}' for property '{}'. Using default: {}",
                    value, name, default
                );
                default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_loads() {
        let reg = registry();
        assert!(reg.get_property("colormap").is_some());
        assert!(reg.get_property("png.compression").is_some());
        assert!(reg.get_property("legend.label").is_some());
        assert_eq!(
            reg.get_property("png.compression").map(|p| p.kind),
            Some(PropertyKind::Enumerated)
        );
    }

    #[test]
    fn test_registry_defaults() {
        let reg = registry();
        assert_eq!(reg.get_default("colormap"), Some("Blues"));
        assert_eq!(reg.get_default("png.compression"), Some("default"));
        assert_eq!(reg.get_default("legend.label"), Some("Intensidade"));
        assert_eq!(reg.get_default("title.font.size"), Some("28"));
    }

    #[test]
    fn test_enum_validation() {
        let reg = registry();
        assert!(reg.is_valid_enum_value("png.compression", "fast"));
        assert!(reg.is_valid_enum_value("png.compression", "BEST"));
        assert!(!reg.is_valid_enum_value("png.compression", "ultra"));
        // Non-enumerated properties accept anything
        assert!(reg.is_valid_enum_value("legend.label", "anything"));
    }

    #[test]
    fn test_reader_defaults() {
        let reader = PropertyReader::default();
        assert_eq!(reader.get_string("colormap"), "Blues");
        assert_eq!(reader.get_enum("png.compression"), "default");
        assert_eq!(reader.get_f64_in_range("tick.font.size", 1.0, 200.0), 18.0);
    }

    #[test]
    fn test_reader_user_values() {
        let reader = PropertyReader::from_json_str(
            r#"{"colormap": "magma", "png.compression": "Fast", "title.font.size": 40, "legend.label": ""}"#,
        )
        .unwrap();
        assert_eq!(reader.get_string("colormap"), "magma");
        assert_eq!(reader.get_enum("png.compression"), "fast");
        assert_eq!(reader.get_f64_in_range("title.font.size", 1.0, 200.0), 40.0);
        // Empty means "not set"
        assert_eq!(reader.get_string("legend.label"), "Intensidade");
    }

    #[test]
    fn test_reader_invalid_values_fall_back() {
        let mut reader = PropertyReader::default();
        reader.set("png.compression", "ultra");
        reader.set("title.font.size", "huge");
        reader.set("tick.font.size", "5000");
        assert_eq!(reader.get_enum("png.compression"), "default");
        assert_eq!(reader.get_f64_in_range("title.font.size", 1.0, 200.0), 28.0);
        assert_eq!(reader.get_f64_in_range("tick.font.size", 1.0, 200.0), 18.0);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plotter.json");
        std::fs::write(&path, r#"{"colormap": "viridis_r", "png.compression": "best"}"#).unwrap();

        let reader = PropertyReader::from_json_file(&path).unwrap();
        assert_eq!(reader.get_string("colormap"), "viridis_r");
        assert_eq!(reader.get_enum("png.compression"), "best");
        assert_eq!(reader.get_string("legend.label"), "Intensidade");
    }

    #[test]
    fn test_from_json_file_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = PropertyReader::from_json_file(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json"));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let err = PropertyReader::from_json_file(&broken).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_from_json_str_rejects_non_object() {
        assert!(PropertyReader::from_json_str("[1, 2]").is_err());
    }
}
