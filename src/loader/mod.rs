//! Recursive dependency loader
//!
//! For one file's text the loader builds its syntax tree and extracts module
//! references. When a fetcher is configured it resolves each reference to a
//! candidate identifier, fetches every dependency not yet loading or loaded,
//! then recurses into the fetched text as a declaration file.
//!
//! Per identifier the status moves `(absent) -> Loading -> Success | Error`.
//! `Loading` is written in the same registry operation that checks for an
//! earlier fetch, before the fetch future is first polled, so concurrent
//! importers of one module dispatch a single fetch and import cycles end.
//! A dispatched fetch is never cancelled, so no identifier stays `Loading`
//! once the call that dispatched it has settled.

pub mod registry;

use futures::future::{BoxFuture, join_all};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{LoadError, LoadResult};
use crate::fetch::{FetchRequest, ModuleFetcher};
use crate::parsing::{
    Language, ModuleReference, ParseOptions, ParseOptionsOverride, SyntaxTree,
    extract_module_references, parse_text,
};
use crate::resolution::{Candidate, DEFAULT_DEPENDENCY_ROOT, candidate_identifier};
use crate::service::LanguageService;

pub use registry::{FileInfo, LoadStatus, Registry};

/// Default suffix of synthesized declaration identifiers
pub const DEFAULT_DECLARATION_SUFFIX: &str = ".d.ts";

/// Loader configuration
#[derive(Clone)]
pub struct LoaderOptions {
    /// Source of dependency text; `None` resolves without fetching
    pub fetcher: Option<Arc<dyn ModuleFetcher>>,
    /// Also open an editable buffer for every registered declaration
    pub declaration_model: bool,
    /// Merged over the parser defaults on every parse
    pub parse_overrides: ParseOptionsOverride,
    pub dependency_root: String,
    pub declaration_suffix: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            fetcher: None,
            declaration_model: false,
            parse_overrides: ParseOptionsOverride::default(),
            dependency_root: DEFAULT_DEPENDENCY_ROOT.to_string(),
            declaration_suffix: DEFAULT_DECLARATION_SUFFIX.to_string(),
        }
    }
}

impl std::fmt::Debug for LoaderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderOptions")
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<fetcher>"))
            .field("declaration_model", &self.declaration_model)
            .field("parse_overrides", &self.parse_overrides)
            .field("dependency_root", &self.dependency_root)
            .field("declaration_suffix", &self.declaration_suffix)
            .finish()
    }
}

impl LoaderOptions {
    /// Options from settings; the fetcher is supplied by the host separately.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            fetcher: None,
            declaration_model: settings.loader.declaration_model,
            parse_overrides: settings.parser,
            dependency_root: settings.resolver.dependency_root.clone(),
            declaration_suffix: settings.resolver.declaration_suffix.clone(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn ModuleFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

/// One invocation of the loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub text: String,
    pub identifier: String,
    pub language: Language,
    /// The text is a fetched declaration file to register globally
    pub is_root: bool,
}

impl LoadRequest {
    /// A file opened in the editor
    pub fn file(
        text: impl Into<String>,
        identifier: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            text: text.into(),
            identifier: identifier.into(),
            language,
            is_root: false,
        }
    }

    /// A fetched declaration file
    pub fn declaration(
        text: impl Into<String>,
        identifier: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            is_root: true,
            ..Self::file(text, identifier, language)
        }
    }
}

/// Resolves and loads the dependency graph of editor buffers
pub struct DependencyLoader {
    registry: Arc<Registry>,
    service: Arc<dyn LanguageService>,
    options: LoaderOptions,
    parse_options: ParseOptions,
}

impl DependencyLoader {
    /// Loader with a fresh registry
    pub fn new(service: Arc<dyn LanguageService>, options: LoaderOptions) -> Self {
        Self::with_registry(Arc::new(Registry::new()), service, options)
    }

    /// Loader writing into an existing registry
    pub fn with_registry(
        registry: Arc<Registry>,
        service: Arc<dyn LanguageService>,
        options: LoaderOptions,
    ) -> Self {
        let parse_options = ParseOptions::merged(&options.parse_overrides);
        Self {
            registry,
            service,
            options,
            parse_options,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn file_info(&self, identifier: &str) -> Option<Arc<FileInfo>> {
        self.registry.file_info(identifier)
    }

    pub fn get_ast(&self, identifier: &str) -> Option<SyntaxTree> {
        self.registry.ast(identifier)
    }

    pub fn status(&self, identifier: &str) -> Option<LoadStatus> {
        self.registry.status(identifier)
    }

    /// Entry point for an editor buffer change
    pub async fn load_file(
        &self,
        text: &str,
        identifier: &str,
        language: Language,
    ) -> LoadResult<()> {
        self.load_dependencies(LoadRequest::file(text, identifier, language))
            .await
    }

    /// Parse, extract, resolve and (with a fetcher) recursively load.
    ///
    /// Parse failures end the call successfully with nothing recorded.
    /// Without a fetcher the file is recorded with empty `filepaths`. A failed
    /// fetch never cancels its siblings: the call settles once every branch
    /// has, then fails with the first error in dispatch order.
    pub fn load_dependencies(&self, request: LoadRequest) -> BoxFuture<'_, LoadResult<()>> {
        Box::pin(async move {
            let LoadRequest {
                text,
                identifier,
                language,
                is_root,
            } = request;

            if text.is_empty() {
                return Ok(());
            }

            if is_root {
                self.register_declaration(&text, &identifier, language);
            }

            let Some(tree) = parse_text(&text, &self.parse_options) else {
                tracing::debug!("No syntax tree for '{identifier}', skipping its dependencies");
                return Ok(());
            };

            let import_modules = extract_module_references(&tree);
            let fetcher = self.options.fetcher.clone();
            // Candidates are only resolved when they can be fetched
            let candidates: Vec<Candidate> = match fetcher {
                Some(_) => import_modules
                    .iter()
                    .map(|reference| {
                        candidate_identifier(
                            &identifier,
                            &reference.value,
                            &self.options.dependency_root,
                        )
                    })
                    .collect(),
                None => Vec::new(),
            };

            let info = self.registry.record_file(
                identifier.clone(),
                FileInfo {
                    tree,
                    import_modules,
                    filepaths: candidates.iter().map(|c| c.identifier.clone()).collect(),
                },
            );

            let Some(fetcher) = fetcher else {
                return Ok(());
            };

            let branches: Vec<_> = info
                .import_modules
                .iter()
                .zip(candidates)
                .filter_map(|(reference, candidate)| {
                    if !self.registry.begin_load(&candidate.identifier) {
                        tracing::trace!(
                            "Skipping '{}': already loading or loaded",
                            candidate.identifier
                        );
                        return None;
                    }
                    Some(self.fetch_and_expand(
                        Arc::clone(&fetcher),
                        reference,
                        candidate,
                        language,
                    ))
                })
                .collect();

            if branches.is_empty() {
                return Ok(());
            }
            tracing::debug!("'{identifier}' dispatched {} fetches", branches.len());

            // Every branch runs to completion; the first failure in dispatch
            // order is reported.
            join_all(branches)
                .await
                .into_iter()
                .collect::<LoadResult<()>>()
        })
    }

    /// Fetch one dependency already marked `Loading`, then recurse into it.
    async fn fetch_and_expand(
        &self,
        fetcher: Arc<dyn ModuleFetcher>,
        reference: &ModuleReference,
        candidate: Candidate,
        language: Language,
    ) -> LoadResult<()> {
        let request = FetchRequest {
            specifier: reference.value.clone(),
            relative_path: candidate.relative_path.clone(),
        };

        let fetched = match fetcher.fetch(request).await {
            Ok(fetched) => fetched,
            Err(source) => {
                tracing::warn!(
                    "Failed to fetch '{}' as '{}': {source}",
                    reference.value,
                    candidate.identifier
                );
                self.registry
                    .set_status(candidate.identifier.clone(), LoadStatus::Error);
                return Err(LoadError::FetchFailed {
                    specifier: reference.value.clone(),
                    identifier: candidate.identifier,
                    source,
                });
            }
        };

        let resolved = fetched
            .hint
            .apply(&candidate.identifier, candidate.assumes_entry_point);

        if resolved != candidate.identifier {
            let first_visit = self.registry.begin_load(&resolved);
            self.registry
                .set_status(candidate.identifier.clone(), LoadStatus::Success);
            self.registry.set_status(resolved.clone(), LoadStatus::Success);
            if !first_visit {
                tracing::trace!(
                    "'{}' resolved to already loaded '{resolved}'",
                    candidate.identifier
                );
                return Ok(());
            }
        } else {
            self.registry.set_status(resolved.clone(), LoadStatus::Success);
        }

        self.load_dependencies(LoadRequest::declaration(fetched.text, resolved, language))
            .await
    }

    fn register_declaration(&self, text: &str, identifier: &str, language: Language) {
        let declaration = format!("{identifier}{}", self.options.declaration_suffix);
        self.service
            .register_declaration(text, &declaration, language);
        if self.options.declaration_model {
            self.service
                .open_declaration_buffer(text, &declaration, language);
        }
    }
}
