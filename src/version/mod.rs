//! Version layer
//!
//! - [`range`]: npm range grammar and minimum satisfying version
//! - [`semver`]: Version parsing, the strict-lower comparison and range prefixes
//! - [`source`]: Desired-version collaborator trait
//! - [`error`]: Lookup errors

pub mod error;
pub mod range;
pub mod semver;
pub mod source;

pub use error::LookupError;
pub use range::RangeSpec;
pub use semver::is_strictly_lower;
pub use source::{StaticVersionSource, VersionSource};
