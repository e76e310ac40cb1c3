//! Language service seam
//!
//! The loader registers every fetched declaration file with a language
//! service so cross-file types become visible to diagnostics. Hosts implement
//! [`LanguageService`] over their editor; [`InMemoryLanguageService`] keeps
//! everything in memory and backs headless use and tests.

use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::parsing::Language;

/// A single diagnostic reported for a buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub start: usize,
    pub end: usize,
    /// Service-specific diagnostic code (e.g. 2307 for a missing module)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

/// Diagnostics for one buffer, split the way language services report them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub syntactic: Vec<Diagnostic>,
    pub semantic: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.syntactic.is_empty() && self.semantic.is_empty()
    }
}

/// Consumer of declaration text and provider of diagnostics
pub trait LanguageService: Send + Sync {
    /// Register or overwrite global declaration text under `identifier`.
    fn register_declaration(&self, text: &str, identifier: &str, language: Language);

    /// Remove a declaration; registering empty text has the same effect.
    fn unregister_declaration(&self, identifier: &str, language: Language) {
        self.register_declaration("", identifier, language);
    }

    /// Materialise an editable buffer holding a fetched declaration.
    ///
    /// Only called when declaration buffers are enabled. The default does
    /// nothing.
    fn open_declaration_buffer(&self, _text: &str, _identifier: &str, _language: Language) {}

    /// Syntactic and semantic diagnostics for the buffer at `identifier`.
    fn diagnostics(
        &self,
        identifier: &str,
        language: Language,
    ) -> BoxFuture<'static, Result<Diagnostics, ServiceError>>;
}

/// Order-preserving record of a registration call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub identifier: String,
    pub language: Language,
    pub text: String,
}

/// Language service that keeps declarations and buffers in memory
#[derive(Debug, Default)]
pub struct InMemoryLanguageService {
    declarations: DashMap<(Language, String), String>,
    buffers: DashMap<String, String>,
    diagnostics: DashMap<String, Diagnostics>,
    history: Mutex<Vec<Registration>>,
}

impl InMemoryLanguageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current declaration text, if registered and non-empty
    pub fn declaration(&self, identifier: &str, language: Language) -> Option<String> {
        self.declarations
            .get(&(language, identifier.to_string()))
            .map(|text| text.clone())
    }

    /// Identifiers with a registered declaration for `language`, sorted
    pub fn declared_identifiers(&self, language: Language) -> Vec<String> {
        let mut identifiers: Vec<String> = self
            .declarations
            .iter()
            .filter(|entry| entry.key().0 == language)
            .map(|entry| entry.key().1.clone())
            .collect();
        identifiers.sort();
        identifiers
    }

    /// Text of an opened declaration buffer
    pub fn buffer(&self, identifier: &str) -> Option<String> {
        self.buffers.get(identifier).map(|text| text.clone())
    }

    /// Every registration call so far, in call order
    pub fn history(&self) -> Vec<Registration> {
        self.history.lock().clone()
    }

    /// Diagnostics to report for `identifier` from now on
    pub fn set_diagnostics(&self, identifier: impl Into<String>, diagnostics: Diagnostics) {
        self.diagnostics.insert(identifier.into(), diagnostics);
    }
}

impl LanguageService for InMemoryLanguageService {
    fn register_declaration(&self, text: &str, identifier: &str, language: Language) {
        self.history.lock().push(Registration {
            identifier: identifier.to_string(),
            language,
            text: text.to_string(),
        });

        let key = (language, identifier.to_string());
        if text.is_empty() {
            self.declarations.remove(&key);
        } else {
            self.declarations.insert(key, text.to_string());
        }
    }

    fn open_declaration_buffer(&self, text: &str, identifier: &str, _language: Language) {
        self.buffers
            .insert(identifier.to_string(), text.to_string());
    }

    fn diagnostics(
        &self,
        identifier: &str,
        _language: Language,
    ) -> BoxFuture<'static, Result<Diagnostics, ServiceError>> {
        let diagnostics = self
            .diagnostics
            .get(identifier)
            .map(|d| d.clone())
            .unwrap_or_default();
        Box::pin(future::ready(Ok(diagnostics)))
    }
}
