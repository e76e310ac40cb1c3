//! Editor plugin surface
//!
//! The editor integration layer drives plugins through [`EditorPlugin`]: it
//! hands over every content change, asks for syntax trees, and requests
//! validation. [`TypeScriptPlugin`] wires these calls to the dependency
//! loader and the language service.

use futures::future::{self, BoxFuture};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{LoadResult, ValidationError};
use crate::fetch::ModuleFetcher;
use crate::loader::{DependencyLoader, LoadRequest, LoaderOptions, Registry};
use crate::parsing::{Language, SyntaxTree};
use crate::service::LanguageService;

/// A buffer content change reported by the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInfo {
    pub text: String,
    pub identifier: String,
    /// Editor language id
    pub language: String,
}

pub trait EditorPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the plugin handles buffers of this editor language id
    fn is_match(&self, language: &str) -> bool;

    /// Process a content change. Unmatched languages are ignored.
    fn parse(&self, info: ParseInfo) -> BoxFuture<'_, LoadResult<()>>;

    fn get_ast(&self, identifier: &str) -> Option<SyntaxTree>;

    /// Succeeds when the language service reports no diagnostics.
    fn validate(
        &self,
        identifier: &str,
        language: &str,
    ) -> BoxFuture<'static, Result<(), ValidationError>>;

    /// Release everything the plugin holds
    fn destroy(&self);
}

/// TypeScript/JavaScript plugin backed by a [`DependencyLoader`]
pub struct TypeScriptPlugin {
    loader: DependencyLoader,
    service: Arc<dyn LanguageService>,
}

impl TypeScriptPlugin {
    pub const NAME: &'static str = "typescript";

    pub fn new(service: Arc<dyn LanguageService>, options: LoaderOptions) -> Self {
        Self {
            loader: DependencyLoader::new(Arc::clone(&service), options),
            service,
        }
    }

    pub fn from_settings(
        service: Arc<dyn LanguageService>,
        settings: &Settings,
        fetcher: Option<Arc<dyn ModuleFetcher>>,
    ) -> Self {
        let mut options = LoaderOptions::from_settings(settings);
        options.fetcher = fetcher;
        Self::new(service, options)
    }

    pub fn loader(&self) -> &DependencyLoader {
        &self.loader
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.loader.registry()
    }
}

impl EditorPlugin for TypeScriptPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_match(&self, language: &str) -> bool {
        Language::from_id(language).is_some()
    }

    fn parse(&self, info: ParseInfo) -> BoxFuture<'_, LoadResult<()>> {
        let Some(language) = Language::from_id(&info.language) else {
            return Box::pin(future::ready(Ok(())));
        };
        self.loader
            .load_dependencies(LoadRequest::file(info.text, info.identifier, language))
    }

    fn get_ast(&self, identifier: &str) -> Option<SyntaxTree> {
        self.loader.get_ast(identifier)
    }

    fn validate(
        &self,
        identifier: &str,
        language: &str,
    ) -> BoxFuture<'static, Result<(), ValidationError>> {
        let language = Language::from_id(language).unwrap_or(Language::JavaScript);
        let identifier = identifier.to_string();
        let pending = self.service.diagnostics(&identifier, language);

        Box::pin(async move {
            let diagnostics = pending.await?;
            if diagnostics.is_empty() {
                Ok(())
            } else {
                Err(ValidationError::Rejected {
                    identifier,
                    diagnostics,
                })
            }
        })
    }

    fn destroy(&self) {
        tracing::debug!(
            "Dropping {} resolved files from the registry",
            self.registry().len()
        );
        self.registry().clear();
    }
}
