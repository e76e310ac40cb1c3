//! Module fetching
//!
//! The loader never reads modules itself. It asks a [`ModuleFetcher`] for the
//! text behind a candidate identifier; the fetcher may also correct the
//! candidate through a [`ResolutionHint`] when the specifier turned out to
//! name a directory or a different file.

use futures::future::BoxFuture;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::{FetchError, FetchResult};
use crate::parsing::Language;
use crate::resolution::{DEFAULT_DEPENDENCY_ROOT, INDEX_SUFFIX};

/// What the loader asks a fetcher for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The specifier exactly as written in source
    pub specifier: String,
    /// Candidate identifier without the dependency root prefix
    pub relative_path: String,
}

/// Correction a fetcher may report for the candidate identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResolutionHint {
    /// The candidate identifier is right
    #[default]
    Unchanged,
    /// The candidate names a directory; its `index` file was served
    IsDirectory,
    /// The served module lives at this identifier instead
    Renamed(String),
}

impl ResolutionHint {
    /// Apply the hint to `candidate`.
    ///
    /// A directory hint is ignored when the candidate already points at a
    /// package entry point, which ends in `/index` by construction.
    pub fn apply(&self, candidate: &str, assumes_entry_point: bool) -> String {
        match self {
            ResolutionHint::Unchanged => candidate.to_string(),
            ResolutionHint::IsDirectory if assumes_entry_point => candidate.to_string(),
            ResolutionHint::IsDirectory if candidate.ends_with('/') => {
                format!("{candidate}{}", &INDEX_SUFFIX[1..])
            }
            ResolutionHint::IsDirectory => format!("{candidate}{INDEX_SUFFIX}"),
            ResolutionHint::Renamed(identifier) => identifier.clone(),
        }
    }
}

/// A fetched module's text plus the fetcher's resolution hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedModule {
    pub text: String,
    pub hint: ResolutionHint,
}

impl FetchedModule {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hint: ResolutionHint::Unchanged,
        }
    }

    pub fn with_hint(mut self, hint: ResolutionHint) -> Self {
        self.hint = hint;
        self
    }
}

pub type FetchFuture = BoxFuture<'static, FetchResult<FetchedModule>>;

/// Host-provided source of module text
pub trait ModuleFetcher: Send + Sync {
    fn fetch(&self, request: FetchRequest) -> FetchFuture;
}

impl<F, Fut> ModuleFetcher for F
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = FetchResult<FetchedModule>> + Send + 'static,
{
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        Box::pin(self(request))
    }
}

const URI_SCHEME: &str = "file://";
const DECLARATION_EXTENSION: &str = "d.ts";

/// Fetcher serving a project directory and its `node_modules` folder
///
/// Path identifiers (`/src/a`, `file:///src/a`) map below `root`; package
/// paths (`lodash/fp`) map below `root/node_modules`.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
    language: Language,
    dependency_root: String,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            root: root.into(),
            language,
            dependency_root: DEFAULT_DEPENDENCY_ROOT.to_string(),
        }
    }

    /// Prefix used when renaming package identifiers; must match the loader's
    pub fn with_dependency_root(mut self, dependency_root: impl Into<String>) -> Self {
        self.dependency_root = dependency_root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `relative_path`; `None` if it could leave `root`.
    fn base_path(&self, relative_path: &str) -> Option<PathBuf> {
        let stripped = relative_path
            .strip_prefix(URI_SCHEME)
            .unwrap_or(relative_path);
        if has_parent_segment(stripped) {
            return None;
        }
        if stripped.starts_with('/') {
            Some(self.root.join(stripped.trim_start_matches('/')))
        } else {
            Some(self.root.join("node_modules").join(stripped))
        }
    }

    fn extensions(&self) -> [&'static str; 2] {
        [DECLARATION_EXTENSION, self.language.file_suffix()]
    }

    async fn resolve(&self, request: &FetchRequest) -> FetchResult<FetchedModule> {
        let Some(base) = self.base_path(&request.relative_path) else {
            tracing::warn!(
                "Refusing to fetch '{}': path escapes '{}'",
                request.relative_path,
                self.root.display()
            );
            return Err(FetchError::not_found(request.relative_path.clone()));
        };

        if is_file(&base).await {
            return Ok(FetchedModule::new(read(&base).await?));
        }
        for extension in self.extensions() {
            let path = with_extension(&base, extension);
            if is_file(&path).await {
                return Ok(FetchedModule::new(read(&path).await?));
            }
        }

        if !is_dir(&base).await {
            return Err(FetchError::not_found(request.relative_path.clone()));
        }

        if let Some(types) = package_types(&base)
            .await?
            .filter(|types| !has_parent_segment(types))
        {
            let entry = base.join(&types);
            if is_file(&entry).await {
                let identifier = self.identifier_for(&request.relative_path, &types);
                tracing::debug!("Package '{}' declares types at '{types}'", request.specifier);
                return Ok(FetchedModule::new(read(&entry).await?)
                    .with_hint(ResolutionHint::Renamed(identifier)));
            }
        }

        for extension in self.extensions() {
            let path = base.join(format!("index.{extension}"));
            if is_file(&path).await {
                return Ok(FetchedModule::new(read(&path).await?)
                    .with_hint(ResolutionHint::IsDirectory));
            }
        }

        Err(FetchError::not_found(request.relative_path.clone()))
    }

    /// Identifier of a package's `types` entry, without its extension
    fn identifier_for(&self, relative_path: &str, types: &str) -> String {
        let entry = types.trim_start_matches("./");
        let entry = entry
            .strip_suffix(".d.ts")
            .or_else(|| entry.strip_suffix(".ts"))
            .unwrap_or(entry);
        let base = relative_path.trim_end_matches('/');
        if base.starts_with('/') || base.starts_with(URI_SCHEME) {
            format!("{base}/{entry}")
        } else {
            format!("{}{base}/{entry}", self.dependency_root)
        }
    }
}

impl ModuleFetcher for FsFetcher {
    fn fetch(&self, request: FetchRequest) -> FetchFuture {
        let fetcher = self.clone();
        Box::pin(async move { fetcher.resolve(&request).await })
    }
}

/// Whether any `/` or `\` separated segment is `..`
fn has_parent_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| segment == "..")
}

fn with_extension(base: &Path, extension: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn read(path: &Path) -> FetchResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// `types` (or `typings`) entry of a package directory's manifest
async fn package_types(dir: &Path) -> FetchResult<Option<String>> {
    let manifest = dir.join("package.json");
    if !is_file(&manifest).await {
        return Ok(None);
    }
    let content = read(&manifest).await?;
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
        tracing::warn!("Ignoring unparseable manifest '{}'", manifest.display());
        return Ok(None);
    };
    Ok(["types", "typings"]
        .iter()
        .find_map(|key| json.get(key).and_then(|v| v.as_str()))
        .map(str::to_string))
}
