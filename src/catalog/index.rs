//! The immutable selection index.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::key::{AssetName, SelectionKey};
use super::schema::{CatalogFile, CatalogSchema, RawEntry};
use super::view::{CatalogView, OptionsView};
use crate::error::CatalogError;

/// Validated mapping from selection key to asset filename.
///
/// Built once at start-up and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    schema: CatalogSchema,
    entries: HashMap<SelectionKey, AssetName>,
}

impl CatalogIndex {
    /// Validate every entry and fail on the first bad one.
    pub fn new<I>(schema: CatalogSchema, entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = RawEntry>,
    {
        schema.validate()?;

        let mut map = HashMap::new();
        for raw in entries {
            let (key, asset) = schema.validate_entry(&raw)?;
            if map.contains_key(&key) {
                return Err(CatalogError::DuplicateKey(raw.key));
            }
            map.insert(key, asset);
        }

        debug!("Catalog index built with {} entries over {} dimensions", map.len(), schema.arity());
        Ok(Self { schema, entries: map })
    }

    pub fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        Self::new(file.schema, file.entries)
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_file(CatalogFile::builtin())
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-match lookup. No partial or nearest matching.
    pub fn lookup(&self, key: &SelectionKey) -> Option<&AssetName> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SelectionKey, &AssetName)> {
        self.entries.iter()
    }

    /// Hierarchical projection for dependent selection.
    pub fn view(&self) -> CatalogView {
        CatalogView::derive(self)
    }

    /// Flat per-dimension value lists in schema order.
    ///
    /// Dimensions with a configured allowed set report it verbatim; open
    /// dimensions report the values observed in the index.
    pub fn options(&self) -> OptionsView {
        let dimensions = self
            .schema
            .dimensions
            .iter()
            .enumerate()
            .map(|(pos, dim)| {
                let values = match &dim.values {
                    Some(allowed) => allowed.clone(),
                    None => self
                        .entries
                        .keys()
                        .map(|key| key.values()[pos].as_str().to_string())
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .collect(),
                };
                (dim.name.clone(), values)
            })
            .collect();
        OptionsView { dimensions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::Dimension;

    #[test]
    fn test_builtin_index_is_valid() {
        let index = CatalogIndex::builtin().unwrap();
        assert_eq!(index.len(), 5);
        let key = SelectionKey::parse(["4-3-3", "3-5-2", "pressing_1"]).unwrap();
        assert_eq!(index.lookup(&key).unwrap().as_str(), "433_vs_352_pressing_1.mp4");
    }

    #[test]
    fn test_lookup_is_exact() {
        let index = CatalogIndex::builtin().unwrap();
        let reversed = SelectionKey::parse(["3-5-2", "4-3-3", "pressing_2"]).unwrap();
        assert!(index.lookup(&reversed).is_none());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = CatalogIndex::new(
            CatalogSchema::formations(),
            vec![
                RawEntry::new(["4-3-3", "4-3-3", "pressing_1"], "a.mp4"),
                RawEntry::new(["4-3-3", "4-3-3", "pressing_1"], "b.mp4"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(_)));
    }

    #[test]
    fn test_bad_entry_aborts_whole_index() {
        let result = CatalogIndex::new(
            CatalogSchema::formations(),
            vec![
                RawEntry::new(["4-3-3", "4-3-3", "pressing_1"], "a.mp4"),
                RawEntry::new(["4-3-3", "3-5-2", "pressing_1"], "../../etc/passwd.mp4"),
            ],
        );
        assert!(matches!(result, Err(CatalogError::UnsafeFilename(_))));
    }

    #[test]
    fn test_options_keep_schema_order() {
        let index = CatalogIndex::builtin().unwrap();
        let options = index.options();
        let names: Vec<_> = options.dimensions.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["own", "opp", "press"]);
        assert_eq!(options.dimensions[0].1, ["4-3-3", "3-5-2", "3-4-3"]);
        assert_eq!(options.dimensions[2].1, ["pressing_1", "pressing_2"]);
    }

    #[test]
    fn test_options_for_open_dimensions_come_from_entries() {
        let schema = CatalogSchema::new(vec![Dimension::new("phase"), Dimension::new("own")]);
        let index = CatalogIndex::new(
            schema,
            vec![
                RawEntry::new(["offensive", "4-3-3"], "a.mp4"),
                RawEntry::new(["defensive", "4-3-3"], "b.mp4"),
                RawEntry::new(["defensive", "3-5-2"], "c.mp4"),
            ],
        )
        .unwrap();
        let options = index.options();
        assert_eq!(options.dimensions[0].1, ["defensive", "offensive"]);
        assert_eq!(options.dimensions[1].1, ["3-5-2", "4-3-3"]);
    }
}
