//! On-the-fly module resolution for editor language services.
//!
//! Given a buffer's text, `declink` parses it, extracts the modules it
//! imports or re-exports, resolves each specifier to a canonical identifier
//! and recursively fetches and registers the referenced declaration files,
//! fetching every module at most once per session.

pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod logging;
pub mod parsing;
pub mod plugin;
pub mod resolution;
pub mod service;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{FetchError, LoadError, LoadResult, ServiceError, ValidationError};
pub use fetch::{FetchRequest, FetchedModule, FsFetcher, ModuleFetcher, ResolutionHint};
pub use loader::{DependencyLoader, FileInfo, LoadRequest, LoadStatus, LoaderOptions, Registry};
pub use parsing::{Language, ModuleReference, ParseOptions, ParseOptionsOverride, SyntaxTree};
pub use plugin::{EditorPlugin, ParseInfo, TypeScriptPlugin};
pub use service::{Diagnostic, Diagnostics, InMemoryLanguageService, LanguageService};
