//! Lowered syntax trees and the generic tree walker
//!
//! Parser output is lowered into a plain JSON value so that consumers can
//! search it without knowing the grammar's exact shape. Every named node is
//! an object with `kind`, `start` and `end`; children reachable through a
//! grammar field live under the field name, the remaining named children are
//! kept in order under `children`.

use serde_json::Value;
use std::sync::Arc;

/// Key holding the node kind
pub const KIND_KEY: &str = "kind";
/// Key holding unfielded named children
pub const CHILDREN_KEY: &str = "children";

/// Immutable syntax tree shared between the registry and its readers
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    root: Arc<Value>,
}

impl SyntaxTree {
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// The lowered root node
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Borrowed view of the root node
    pub fn root_node(&self) -> Option<Node<'_>> {
        Node::from_value(&self.root)
    }

    /// Whether both handles point at the same tree allocation
    pub fn ptr_eq(&self, other: &SyntaxTree) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }
}

/// Borrowed view over one lowered node object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node<'a> {
    value: &'a Value,
}

impl<'a> Node<'a> {
    /// View `value` as a node; only objects carrying a string `kind` qualify.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        value
            .as_object()
            .filter(|object| object.get(KIND_KEY).is_some_and(Value::is_string))
            .map(|_| Self { value })
    }

    pub fn kind(&self) -> &'a str {
        self.value[KIND_KEY].as_str().unwrap_or_default()
    }

    pub fn start(&self) -> usize {
        offset(&self.value["start"])
    }

    pub fn end(&self) -> usize {
        offset(&self.value["end"])
    }

    /// Raw value stored under `name`, if any
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name)
    }

    /// Child node stored under `name`
    pub fn child(&self, name: &str) -> Option<Node<'a>> {
        self.field(name).and_then(Node::from_value)
    }

    pub fn as_value(&self) -> &'a Value {
        self.value
    }
}

fn offset(value: &Value) -> usize {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or_default()
}

/// Depth-first pre-order walk over a tree-shaped value.
///
/// `visit` fires on every property value of an object and every element of an
/// array reachable below `value`, before that value's own children are
/// walked. Only arrays and objects are descended into.
pub fn walk<'a, F>(value: &'a Value, visit: &mut F)
where
    F: FnMut(&'a Value),
{
    match value {
        Value::Object(object) => {
            for child in object.values() {
                visit(child);
                walk(child, visit);
            }
        }
        Value::Array(items) => {
            for child in items {
                visit(child);
                walk(child, visit);
            }
        }
        _ => {}
    }
}
