//! Specifier path algebra
//!
//! Pure string functions: no filesystem access, no normalisation beyond what
//! is documented on each function. Identifiers always use `/` separators.

/// Suffix appended to identifiers that name a directory or package entry point
pub const INDEX_SUFFIX: &str = "/index";

/// Whether `path` names a package rather than a relative or absolute path.
///
/// Anything not starting with `/`, `\` or `.` is bare.
pub fn is_bare_specifier(path: &str) -> bool {
    !matches!(path.chars().next(), Some('/' | '\\' | '.'))
}

/// The package directory part of a bare specifier.
///
/// `lodash/fp` gives `lodash`; scoped names keep their scope, so
/// `@scope/pkg/sub` gives `@scope/pkg`.
pub fn package_root(path: &str) -> String {
    let take = if path.starts_with('@') { 2 } else { 1 };
    path.split('/').take(take).collect::<Vec<_>>().join("/")
}

/// Resolve `specifier` against the identifier of the importing file.
///
/// The first segment of `base` is the root segment; for a scoped base
/// (`@scope/pkg/...`) the first two segments form it. The root segment is
/// never popped by `..`. A specifier starting with `/` is appended to the root
/// segment verbatim.
pub fn resolve_relative(base: &str, specifier: &str) -> String {
    let mut segments = base.split('/');
    let root = if base.starts_with('@') {
        segments.by_ref().take(2).collect::<Vec<_>>().join("/")
    } else {
        segments.next().unwrap_or_default().to_string()
    };

    if specifier.starts_with('/') {
        return format!("{root}{specifier}");
    }

    let mut stack: Vec<&str> = segments.collect();
    // Drop the importing file's own name.
    stack.pop();

    for part in specifier.split('/') {
        match part {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    let mut resolved = root;
    for segment in stack {
        resolved.push('/');
        resolved.push_str(segment);
    }
    resolved
}

/// Where a specifier points, before the fetcher has had its say
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Canonical identifier recorded in the importing file's `filepaths`
    pub identifier: String,
    /// Path handed to the fetcher: the identifier without the `/index` entry
    /// suffix and without the dependency root
    pub relative_path: String,
    /// `/index` was appended because the specifier names a whole package
    pub assumes_entry_point: bool,
}

/// Compute the candidate identifier for `specifier` imported from `base`.
pub fn candidate_identifier(base: &str, specifier: &str, dependency_root: &str) -> Candidate {
    let target = if is_bare_specifier(specifier) {
        format!("{dependency_root}{specifier}")
    } else {
        resolve_relative(base, specifier)
    };

    let relative_path = target
        .strip_prefix(dependency_root)
        .unwrap_or(&target)
        .to_string();

    let assumes_entry_point = specifier == package_root(specifier);
    let identifier = if assumes_entry_point {
        format!("{target}{INDEX_SUFFIX}")
    } else {
        target
    };

    Candidate {
        identifier,
        relative_path,
        assumes_entry_point,
    }
}
