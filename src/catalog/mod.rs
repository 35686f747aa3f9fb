//! Catalog Module
//!
//! The static selection index and the views derived from it.

pub mod key;
pub mod schema;
pub mod index;
pub mod view;

pub use key::{AssetName, DimensionValue, SelectionKey};
pub use schema::{CatalogFile, CatalogSchema, Dimension, RawEntry};
pub use index::CatalogIndex;
pub use view::{build_catalog, CatalogView, Combination, OptionsView};
