//! Parser layer
//! - traits.rs: Document trait definition and format dispatch
//! - types.rs: Common types (FileFormat, Leaf, PendingEdits)
//! - json.rs: package.json document model
//! - yaml.rs: pnpm-workspace.yaml document model

pub mod json;
pub mod traits;
pub mod types;
pub mod yaml;

pub use json::JsonDocument;
pub use traits::{Document, ParseError, open_document};
pub use types::{FileFormat, Leaf, Quoting, detect_format};
pub use yaml::YamlDocument;
