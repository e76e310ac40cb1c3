//! Module reference extraction
//!
//! Import-like nodes are located with the generic walker, so extraction does
//! not depend on where in the tree a declaration sits.

use serde::{Deserialize, Serialize};

use super::tree::{CHILDREN_KEY, Node, SyntaxTree, walk};

/// Node kinds that may carry a `source` module specifier
pub const MODULE_REFERENCE_KINDS: [&str; 3] =
    ["import_statement", "export_statement", "import_require_clause"];

/// A module specifier as written in source, with its byte span
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleReference {
    /// The specifier text without quotes (e.g. "./utils" or "@scope/pkg")
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl ModuleReference {
    /// Read the `source` child of an import/export node
    fn from_source(node: Node<'_>) -> Option<Self> {
        let source = node.child("source").or_else(|| require_argument(node))?;
        let value = source.field("value")?.as_str()?;
        if value.is_empty() {
            return None;
        }
        Some(Self {
            value: value.to_string(),
            start: source.start(),
            end: source.end(),
        })
    }
}

// Older grammar releases leave the `require(...)` literal unfielded.
fn require_argument(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() != "import_require_clause" {
        return None;
    }
    node.field(CHILDREN_KEY)?
        .as_array()?
        .iter()
        .filter_map(Node::from_value)
        .find(|child| child.kind() == "string")
}

/// Collect every node whose kind is in `kinds`, in pre-order.
pub fn find_nodes_of_kind<'a>(tree: &'a SyntaxTree, kinds: &[&str]) -> Vec<Node<'a>> {
    let mut found = Vec::new();
    walk(tree.root(), &mut |value| {
        if let Some(node) = Node::from_value(value) {
            if kinds.contains(&node.kind()) {
                found.push(node);
            }
        }
    });
    found
}

/// All module specifiers referenced by import/export declarations in `tree`.
pub fn extract_module_references(tree: &SyntaxTree) -> Vec<ModuleReference> {
    find_nodes_of_kind(tree, &MODULE_REFERENCE_KINDS)
        .into_iter()
        .filter_map(ModuleReference::from_source)
        .collect()
}
