//! Catalog layer
//! - reference.rs: `catalog:` references and their collection across consumers
//! - paths.rs: Candidate structural paths per file dialect
//! - store.rs: Catalog definitions merged across definition files

pub mod paths;
pub mod reference;
pub mod store;

pub use reference::{CatalogReference, collect_catalog_references};
pub use store::{CatalogEntry, CatalogStore};
