//! Syntax tree adapter over tree-sitter
//!
//! Parsing is best effort: every failure mode collapses into `None` so a
//! malformed buffer never stops the rest of the pipeline.

use serde_json::{Map, Value};
use tree_sitter::{Node as TsNode, Parser};

use super::options::{ParseOptions, SourceType};
use super::tree::{CHILDREN_KEY, KIND_KEY, SyntaxTree};

const PROGRAM_KIND: &str = "program";
const STRING_KIND: &str = "string";
const STRING_FRAGMENT_KIND: &str = "string_fragment";
const ESCAPE_SEQUENCE_KIND: &str = "escape_sequence";
const MODULE_DECLARATION_KINDS: [&str; 2] = ["import_statement", "export_statement"];

/// Parse `text` into a lowered syntax tree.
///
/// Returns `None` for empty text and whenever the parser cannot produce a tree
/// acceptable under `options`. Never panics on malformed input.
pub fn parse_text(text: &str, options: &ParseOptions) -> Option<SyntaxTree> {
    if text.is_empty() {
        return None;
    }

    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&options.dialect.grammar()) {
        tracing::debug!("Failed to set {:?} grammar: {e}", options.dialect);
        return None;
    }

    let Some(tree) = parser.parse(text, None) else {
        tracing::debug!("Parser produced no tree");
        return None;
    };
    let root = tree.root_node();

    if root.has_error() && !options.error_recovery {
        tracing::debug!("Discarding tree with syntax errors (error recovery disabled)");
        return None;
    }

    let misplaced = misplaced_module_declarations(root, options);
    if misplaced > 0 {
        if !options.error_recovery {
            tracing::debug!(
                "Discarding tree with {misplaced} misplaced import/export declarations"
            );
            return None;
        }
        tracing::debug!("Keeping tree with {misplaced} misplaced import/export declarations");
    }

    Some(SyntaxTree::new(lower(root, text)))
}

/// Count import/export declarations the options do not allow.
fn misplaced_module_declarations(root: TsNode, options: &ParseOptions) -> usize {
    let mut count = 0;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if MODULE_DECLARATION_KINDS.contains(&node.kind()) {
            let top_level = node.parent().is_some_and(|p| p.kind() == PROGRAM_KIND);
            let allowed = match options.source_type {
                SourceType::Script => false,
                SourceType::Module => top_level || options.allow_import_export_everywhere,
            };
            if !allowed {
                count += 1;
            }
        }

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }

    count
}

/// Lower a tree-sitter node into the JSON node shape.
fn lower(node: TsNode, code: &str) -> Value {
    let mut object = Map::new();
    object.insert(KIND_KEY.to_string(), Value::from(node.kind()));
    object.insert("start".to_string(), Value::from(node.start_byte()));
    object.insert("end".to_string(), Value::from(node.end_byte()));

    if node.kind() == STRING_KIND {
        object.insert("value".to_string(), Value::from(string_value(node, code)));
    }

    let mut children = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.is_named() {
                let lowered = lower(child, code);
                match cursor.field_name() {
                    Some(field) => insert_field(&mut object, field, lowered),
                    None => children.push(lowered),
                }
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    if !children.is_empty() {
        object.insert(CHILDREN_KEY.to_string(), Value::Array(children));
    }

    Value::Object(object)
}

/// Store a fielded child; repeated fields become arrays.
fn insert_field(object: &mut Map<String, Value>, field: &str, value: Value) {
    match object.get_mut(field) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            object.insert(field.to_string(), value);
        }
    }
}

/// Cooked value of a string literal: fragments verbatim, escapes decoded.
fn string_value(node: TsNode, code: &str) -> String {
    let mut value = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let text = code.get(child.byte_range()).unwrap_or_default();
        match child.kind() {
            STRING_FRAGMENT_KIND => value.push_str(text),
            ESCAPE_SEQUENCE_KIND => push_escape(&mut value, text),
            _ => {}
        }
    }
    value
}

/// Append the character an escape sequence such as `\n` or `\u{40}` stands
/// for. Unrecognised sequences are kept as written.
fn push_escape(value: &mut String, escape: &str) {
    let body = escape.strip_prefix('\\').unwrap_or(escape);
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return;
    };
    let rest = chars.as_str();

    let decoded = match first {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0'..='7' => u32::from_str_radix(body, 8).ok().and_then(char::from_u32),
        'x' => u32::from_str_radix(rest, 16).ok().and_then(char::from_u32),
        'u' => {
            let hex = rest.trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        }
        // Line continuation
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => return,
        other if rest.is_empty() => Some(other),
        _ => None,
    };

    match decoded {
        Some(c) => value.push(c),
        None => value.push_str(escape),
    }
}
