//! Derived, UI-facing projections of the index.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::index::CatalogIndex;
use super::key::PREFIX_SEPARATOR;
use super::schema::{CatalogSchema, RawEntry};
use crate::error::CatalogError;

/// One indexed combination with every dimension named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub values: Vec<(String, String)>,
    pub video: String,
}

impl Serialize for Combination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("video", &self.video)?;
        map.end()
    }
}

/// Dependent-dropdown view of the catalog.
///
/// `roots` holds the valid first-dimension values. `branches[i]` holds the
/// valid values of dimension `i + 1`, keyed by the preceding values joined
/// with `|`. Every list is sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub dimensions: Vec<String>,
    pub roots: Vec<String>,
    pub branches: Vec<BTreeMap<String, Vec<String>>>,
    pub combos: Vec<Combination>,
}

impl CatalogView {
    pub(crate) fn derive(index: &CatalogIndex) -> Self {
        let dimensions = index.schema().dimension_names();
        let arity = dimensions.len();

        let mut roots = BTreeSet::new();
        let mut branches: Vec<BTreeMap<String, BTreeSet<String>>> =
            vec![BTreeMap::new(); arity.saturating_sub(1)];

        let mut keyed: Vec<_> = index.entries().collect();
        keyed.sort_by(|a, b| a.0.cmp(b.0));

        let mut combos = Vec::with_capacity(keyed.len());
        for (key, asset) in keyed {
            let values = key.values();
            roots.insert(values[0].as_str().to_string());
            for depth in 1..arity {
                branches[depth - 1]
                    .entry(key.prefix(depth))
                    .or_default()
                    .insert(values[depth].as_str().to_string());
            }
            combos.push(Combination {
                values: dimensions
                    .iter()
                    .cloned()
                    .zip(values.iter().map(|v| v.as_str().to_string()))
                    .collect(),
                video: asset.as_str().to_string(),
            });
        }

        Self {
            dimensions,
            roots: roots.into_iter().collect(),
            branches: branches
                .into_iter()
                .map(|level| {
                    level
                        .into_iter()
                        .map(|(prefix, next)| (prefix, next.into_iter().collect()))
                        .collect()
                })
                .collect(),
            combos,
        }
    }

    /// Valid values for the dimension following `chosen`.
    ///
    /// An empty `chosen` yields the first-dimension values. Returns `None`
    /// when the prefix has no entries or is already a full key.
    pub fn next_values(&self, chosen: &[&str]) -> Option<&[String]> {
        if chosen.is_empty() {
            return Some(&self.roots);
        }
        let level = self.branches.get(chosen.len() - 1)?;
        let prefix = chosen.join(PREFIX_SEPARATOR);
        level.get(&prefix).map(Vec::as_slice)
    }

    /// `<dim>_by_<preceding dims>`, except the last level of a
    /// three-dimension catalog, which the web client reads as
    /// `<dim>_by_pair`.
    fn branch_label(&self, depth: usize) -> String {
        if depth == 2 && self.dimensions.len() == 3 {
            return format!("{}_by_pair", self.dimensions[depth]);
        }
        format!("{}_by_{}", self.dimensions[depth], self.dimensions[..depth].join("_"))
    }
}

impl Serialize for CatalogView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.branches.len() + 3))?;
        map.serialize_entry("dimensions", &self.dimensions)?;
        if let Some(first) = self.dimensions.first() {
            map.serialize_entry(first, &self.roots)?;
        }
        for (i, level) in self.branches.iter().enumerate() {
            map.serialize_entry(&self.branch_label(i + 1), level)?;
        }
        map.serialize_entry("combos", &self.combos)?;
        map.end()
    }
}

/// Legacy flat option lists, one per dimension, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsView {
    pub dimensions: Vec<(String, Vec<String>)>,
}

impl Serialize for OptionsView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.dimensions.len()))?;
        for (name, values) in &self.dimensions {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// Validate raw entries and derive the catalog view in one step.
pub fn build_catalog<I>(schema: CatalogSchema, entries: I) -> Result<CatalogView, CatalogError>
where
    I: IntoIterator<Item = RawEntry>,
{
    Ok(CatalogIndex::new(schema, entries)?.view())
}
