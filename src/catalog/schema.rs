//! Catalog schema and configuration file format.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::key::{AssetName, DimensionValue, SelectionKey};
use crate::error::CatalogError;

pub const DEFAULT_EXTENSION: &str = "mp4";

/// One selection dimension. `values`, when present, is the allowed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl Dimension {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), values: None }
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn allows(&self, value: &str) -> bool {
        self.values
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|v| v == value))
    }
}

/// Shape of every key in a deployment: dimension order plus asset extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSchema {
    pub dimensions: Vec<Dimension>,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl CatalogSchema {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self { dimensions, extension: default_extension() }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn arity(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimension_names(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.name.clone()).collect()
    }

    /// Schema-level checks, run before any entry is looked at.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.dimensions.is_empty() {
            return Err(CatalogError::EmptySchema);
        }
        let mut seen = HashSet::new();
        for dim in &self.dimensions {
            if !is_usable_name(&dim.name) {
                return Err(CatalogError::ReservedDimension(dim.name.clone()));
            }
            if !seen.insert(dim.name.as_str()) {
                return Err(CatalogError::DuplicateDimension(dim.name.clone()));
            }
            if let Some(values) = &dim.values {
                for value in values {
                    DimensionValue::new(value.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Validate one raw entry against this schema.
    pub fn validate_entry(&self, entry: &RawEntry) -> Result<(SelectionKey, AssetName), CatalogError> {
        if entry.key.len() != self.arity() {
            return Err(CatalogError::Arity {
                key: entry.key.clone(),
                expected: self.arity(),
                found: entry.key.len(),
            });
        }

        for (dim, value) in self.dimensions.iter().zip(&entry.key) {
            if !dim.allows(value) {
                return Err(CatalogError::DisallowedValue {
                    key: entry.key.clone(),
                    dimension: dim.name.clone(),
                    value: value.clone(),
                });
            }
        }

        let key = SelectionKey::parse(entry.key.iter().cloned())?;
        let asset = AssetName::new(entry.video.clone(), &self.extension)?;
        Ok((key, asset))
    }

    /// Own formation, opponent formation, pressing variant.
    pub fn formations() -> Self {
        let formations = ["4-3-3", "3-5-2", "3-4-3"];
        Self::new(vec![
            Dimension::new("own").with_values(formations),
            Dimension::new("opp").with_values(formations),
            Dimension::new("press").with_values(["pressing_1", "pressing_2"]),
        ])
    }
}

/// An unvalidated `key -> video` line as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    pub key: Vec<String>,
    pub video: String,
}

impl RawEntry {
    pub fn new<I, S>(key: I, video: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into_iter().map(Into::into).collect(),
            video: video.into(),
        }
    }
}

/// On-disk catalog: schema plus entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(flatten)]
    pub schema: CatalogSchema,
    #[serde(default)]
    pub entries: Vec<RawEntry>,
}

impl CatalogFile {
    pub fn from_yaml(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// The catalog shipped with the service.
    pub fn builtin() -> Self {
        Self {
            schema: CatalogSchema::formations(),
            entries: vec![
                RawEntry::new(["4-3-3", "4-3-3", "pressing_1"], "433_vs_433_pressing_1.mp4"),
                RawEntry::new(["4-3-3", "4-3-3", "pressing_2"], "433_vs_433_pressing_2.mp4"),
                RawEntry::new(["4-3-3", "3-5-2", "pressing_1"], "433_vs_352_pressing_1.mp4"),
                RawEntry::new(["3-5-2", "4-3-3", "pressing_1"], "352_vs_433_pressing_1.mp4"),
                RawEntry::new(["3-4-3", "4-3-3", "pressing_1"], "343_vs_433_pressing_1.mp4"),
            ],
        }
    }
}

/// Keys the catalog view emits next to the per-dimension ones.
const RESERVED_NAMES: [&str; 3] = ["dimensions", "combos", "video"];

fn is_usable_name(name: &str) -> bool {
    !name.trim().is_empty() && !RESERVED_NAMES.contains(&name) && !name.contains("_by_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogIndex;

    #[test]
    fn test_validate_entry_arity() {
        let schema = CatalogSchema::formations();
        let err = schema
            .validate_entry(&RawEntry::new(["4-3-3", "4-3-3"], "a.mp4"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Arity { expected: 3, found: 2, .. }));
    }

    #[test]
    fn test_validate_entry_allowed_values() {
        let schema = CatalogSchema::formations();
        let err = schema
            .validate_entry(&RawEntry::new(["5-4-1", "4-3-3", "pressing_1"], "a.mp4"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DisallowedValue { ref dimension, .. } if dimension == "own"));
    }

    #[test]
    fn test_open_dimension_accepts_any_value() {
        let schema = CatalogSchema::new(vec![Dimension::new("phase"), Dimension::new("own")]);
        assert!(schema.validate_entry(&RawEntry::new(["build_up", "anything"], "x.mp4")).is_ok());
    }

    #[test]
    fn test_reserved_dimension_names_rejected() {
        for name in ["combos", "video", "dimensions", "", "  ", "press_by_pair"] {
            let schema = CatalogSchema::new(vec![Dimension::new("own"), Dimension::new(name)]);
            assert!(
                matches!(schema.validate(), Err(CatalogError::ReservedDimension(ref n)) if n == name),
                "accepted {:?}",
                name
            );
        }

        let yaml = "dimensions:\n  - name: combos\n  - name: video\nentries:\n  - key: [x, y]\n    video: a.mp4\n";
        let file = CatalogFile::from_yaml(yaml).unwrap();
        assert!(matches!(
            CatalogIndex::from_file(file),
            Err(CatalogError::ReservedDimension(ref n)) if n == "combos"
        ));
    }

    #[test]
    fn test_schema_validation() {
        assert!(matches!(CatalogSchema::new(vec![]).validate(), Err(CatalogError::EmptySchema)));
        let dup = CatalogSchema::new(vec![Dimension::new("own"), Dimension::new("own")]);
        assert!(matches!(dup.validate(), Err(CatalogError::DuplicateDimension(_))));
        assert!(CatalogSchema::formations().validate().is_ok());
    }

    #[test]
    fn test_parse_four_dimension_yaml() {
        let yaml = r#"
extension: MP4
dimensions:
  - name: phase
    values: [defensive, offensive]
  - name: own
  - name: opp
  - name: press
entries:
  - key: [defensive, "4-3-3", "4-3-3", pressing_1]
    video: def_433_433.MP4
"#;
        let file = CatalogFile::from_yaml(yaml).unwrap();
        assert_eq!(file.schema.arity(), 4);
        assert_eq!(file.schema.extension, "MP4");
        assert_eq!(file.schema.dimensions[1].values, None);
        assert_eq!(file.entries.len(), 1);
        assert!(file.schema.validate_entry(&file.entries[0]).is_ok());
    }

    #[test]
    fn test_extension_defaults_to_mp4() {
        let file = CatalogFile::from_yaml("dimensions:\n  - name: own\n").unwrap();
        assert_eq!(file.schema.extension, "mp4");
        assert!(file.entries.is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        assert!(matches!(CatalogFile::from_yaml("dimensions: 7"), Err(CatalogError::Parse(_))));
    }
}
