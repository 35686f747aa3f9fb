//! Strongly-typed catalog keys and asset names.

use serde::Serialize;
use std::fmt;

use crate::error::CatalogError;

/// Separator used when a key prefix is flattened into a lookup string.
pub const PREFIX_SEPARATOR: &str = "|";

/// One value of one selection dimension, e.g. `"4-3-3"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DimensionValue(String);

impl DimensionValue {
    pub fn new(value: impl Into<String>) -> Result<Self, CatalogError> {
        let value = value.into();
        if value.trim().is_empty() || value.contains(PREFIX_SEPARATOR) {
            return Err(CatalogError::InvalidValue(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered tuple of dimension values identifying one scenario.
///
/// Equality and hashing are element-wise, so two keys match only when every
/// dimension matches in the same position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SelectionKey(Vec<DimensionValue>);

impl SelectionKey {
    pub fn new(values: Vec<DimensionValue>) -> Self {
        Self(values)
    }

    /// Build a key from raw strings, validating each value.
    pub fn parse<I, S>(values: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values
            .into_iter()
            .map(DimensionValue::new)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[DimensionValue] {
        &self.0
    }

    /// The first `len` values joined with `|`.
    pub fn prefix(&self, len: usize) -> String {
        self.0[..len.min(self.0.len())]
            .iter()
            .map(DimensionValue::as_str)
            .collect::<Vec<_>>()
            .join(PREFIX_SEPARATOR)
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.prefix(self.0.len()))
    }
}

/// A validated asset filename: a bare name inside the asset store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetName(String);

impl AssetName {
    /// Rejects anything that could escape the asset directory and anything
    /// not carrying `extension` (compared case-insensitively).
    pub fn new(filename: impl Into<String>, extension: &str) -> Result<Self, CatalogError> {
        let filename = filename.into();
        if filename.trim().is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
            || filename.contains('\0')
        {
            return Err(CatalogError::UnsafeFilename(filename));
        }

        let suffix = format!(".{}", extension.trim_start_matches('.').to_ascii_lowercase());
        if !filename.to_ascii_lowercase().ends_with(&suffix) || filename.len() == suffix.len() {
            return Err(CatalogError::WrongExtension {
                filename,
                extension: extension.trim_start_matches('.').to_string(),
            });
        }
        Ok(Self(filename))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
