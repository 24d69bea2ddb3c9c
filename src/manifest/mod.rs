//! Manifest layer
//! - section.rs: Declaration sections and packageManager pins
//! - package_json.rs: Manifest loading and file identities
//! - filter.rs: Include / exclude expressions
//! - resolver.rs: Effective current version per dependency

pub mod filter;
pub mod package_json;
pub mod resolver;
pub mod section;

pub use filter::PackageFilter;
pub use package_json::{FileIdentity, Manifest};
pub use resolver::{SectionResolver, is_indirect_spec, resolve_sections};
pub use section::DeclarationSection;
