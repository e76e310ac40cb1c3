//! Specifier resolution
//!
//! Turns the specifiers found in source into canonical identifiers: bare
//! package names are placed under the dependency root, relative paths are
//! resolved against the importing file.
//!
//! This is distinct from fetching: nothing here knows whether an identifier
//! exists. Fetchers may correct a candidate afterwards through a
//! [`ResolutionHint`](crate::fetch::ResolutionHint).

pub mod specifier;

pub use specifier::{
    Candidate, INDEX_SUFFIX, candidate_identifier, is_bare_specifier, package_root,
    resolve_relative,
};

/// Default prefix for identifiers of bare (package) specifiers
pub const DEFAULT_DEPENDENCY_ROOT: &str = "file:///node_modules/";
