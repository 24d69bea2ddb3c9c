use thiserror::Error;

/// Failure of the desired-version collaborator for one dependency
///
/// Never fatal: the affected name simply produces no edit.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Lookup failed for {name}: {message}")]
    Failed { name: String, message: String },
}
