pub mod import;
pub mod language;
pub mod options;
pub mod parser;
pub mod tree;

pub use import::{
    MODULE_REFERENCE_KINDS, ModuleReference, extract_module_references, find_nodes_of_kind,
};
pub use language::Language;
pub use options::{Dialect, ParseOptions, ParseOptionsOverride, SourceType};
pub use parser::parse_text;
pub use tree::{Node, SyntaxTree, walk};
