//! Language detection and enumeration
//!
//! The editor reports a language id with every buffer; only the languages
//! listed here take part in module resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Editor languages handled by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 2] = [Language::JavaScript, Language::TypeScript];

    /// Parse an editor language id (e.g. "typescript")
    ///
    /// Returns None for languages the resolver does not handle.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "javascript" => Some(Language::JavaScript),
            "typescript" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// The editor language id
    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }

    /// Source file suffix, without the leading dot
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
