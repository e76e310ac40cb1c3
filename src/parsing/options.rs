//! Parser configuration
//!
//! [`ParseOptions`] is the full configuration used for a parse call.
//! [`ParseOptionsOverride`] is the partial form accepted from settings and
//! callers; it is merged over the defaults on every parse.

use serde::{Deserialize, Serialize};

/// How the source text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// ES module: import/export declarations are allowed
    #[default]
    Module,
    /// Classic script: import/export declarations are errors
    Script,
}

/// Grammar used to parse the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    TypeScript,
    Tsx,
    JavaScript,
}

impl Dialect {
    pub(crate) fn grammar(&self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// Complete parser configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    pub source_type: SourceType,
    /// Keep trees that contain syntax errors
    pub error_recovery: bool,
    /// Accept import/export declarations below the top level
    pub allow_import_export_everywhere: bool,
    pub dialect: Dialect,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            source_type: SourceType::Module,
            error_recovery: true,
            allow_import_export_everywhere: true,
            dialect: Dialect::TypeScript,
        }
    }
}

impl ParseOptions {
    /// Defaults with `overrides` applied on top
    pub fn merged(overrides: &ParseOptionsOverride) -> Self {
        Self::default().with_overrides(overrides)
    }

    pub fn with_overrides(mut self, overrides: &ParseOptionsOverride) -> Self {
        if let Some(source_type) = overrides.source_type {
            self.source_type = source_type;
        }
        if let Some(error_recovery) = overrides.error_recovery {
            self.error_recovery = error_recovery;
        }
        if let Some(allow) = overrides.allow_import_export_everywhere {
            self.allow_import_export_everywhere = allow;
        }
        if let Some(dialect) = overrides.dialect {
            self.dialect = dialect;
        }
        self
    }
}

/// Partial parser configuration; unset fields keep their defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseOptionsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_recovery: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_import_export_everywhere: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
}
