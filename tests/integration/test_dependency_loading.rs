//! End-to-end dependency loading through an in-memory fetcher

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use declink::{
    DependencyLoader, FetchError, FetchRequest, FetchedModule, InMemoryLanguageService, Language,
    LoadError, LoadStatus, LoaderOptions, ParseOptionsOverride,
};

use crate::common::{MapFetcher, shared};

fn loader_with(
    fetcher: MapFetcher,
) -> (DependencyLoader, Arc<MapFetcher>, Arc<InMemoryLanguageService>) {
    let service = Arc::new(InMemoryLanguageService::new());
    let (fetcher, erased) = shared(fetcher);
    let loader =
        DependencyLoader::new(service.clone(), LoaderOptions::default().with_fetcher(erased));
    (loader, fetcher, service)
}

#[tokio::test]
async fn test_relative_import_is_fetched_and_registered() {
    let fetcher = MapFetcher::new();
    fetcher.insert("/root/b", "export const b = 1;");
    let (loader, fetcher, service) = loader_with(fetcher);

    loader
        .load_file("import { b } from './b';", "/root/a", Language::TypeScript)
        .await
        .unwrap();

    let info = loader.file_info("/root/a").unwrap();
    assert_eq!(info.filepaths, vec!["/root/b"]);
    assert_eq!(info.import_modules[0].value, "./b");

    assert_eq!(loader.status("/root/b"), Some(LoadStatus::Success));
    // The buffer the editor handed over never gets a status of its own
    assert_eq!(loader.status("/root/a"), None);

    let dependency = loader.file_info("/root/b").unwrap();
    assert!(dependency.import_modules.is_empty());
    assert!(dependency.filepaths.is_empty());

    assert_eq!(fetcher.calls(), vec!["/root/b"]);
    assert_eq!(
        service.declaration("/root/b.d.ts", Language::TypeScript).as_deref(),
        Some("export const b = 1;")
    );
    assert!(service.declaration("/root/a.d.ts", Language::TypeScript).is_none());
    // Buffers are only opened when declaration buffers are enabled
    assert!(service.buffer("/root/b.d.ts").is_none());
}

#[tokio::test]
async fn test_failed_fetch_marks_error_and_rejects() {
    let (loader, _fetcher, service) = loader_with(MapFetcher::new());

    let err = loader
        .load_file("import { b } from './b';", "/root/a", Language::TypeScript)
        .await
        .unwrap_err();

    assert_eq!(err.identifier(), "/root/b");
    assert_eq!(err.status_code(), "MODULE_NOT_FOUND");
    assert!(matches!(err, LoadError::FetchFailed { ref specifier, .. } if specifier == "./b"));

    assert_eq!(loader.status("/root/b"), Some(LoadStatus::Error));
    // The importing file is recorded before any fetch is dispatched
    assert_eq!(loader.file_info("/root/a").unwrap().filepaths, vec!["/root/b"]);
    assert!(loader.file_info("/root/b").is_none());
    assert!(service.history().is_empty());
}

#[tokio::test]
async fn test_errored_module_is_retried_on_next_load() {
    let (loader, fetcher, _service) = loader_with(MapFetcher::new());
    let code = "import { b } from './b';";

    assert!(loader.load_file(code, "/root/a", Language::TypeScript).await.is_err());

    fetcher.insert("/root/b", "export const b = 1;");
    loader.load_file(code, "/root/a", Language::TypeScript).await.unwrap();

    assert_eq!(loader.status("/root/b"), Some(LoadStatus::Success));
    assert_eq!(fetcher.call_count("/root/b"), 2);
}

#[tokio::test]
async fn test_shared_dependency_is_fetched_once() {
    let fetcher = MapFetcher::new().with_delay(Duration::from_millis(20));
    fetcher.insert("lodash", "export declare function chunk(): void;");
    let (loader, fetcher, _service) = loader_with(fetcher);

    let (first, second) = tokio::join!(
        loader.load_file("import _ from 'lodash';", "/root/a", Language::TypeScript),
        loader.load_file("import { chunk } from 'lodash';", "/root/c", Language::TypeScript),
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(fetcher.call_count("lodash"), 1);
    assert_eq!(
        loader.status("file:///node_modules/lodash/index"),
        Some(LoadStatus::Success)
    );
    assert_eq!(
        loader.file_info("/root/a").unwrap().filepaths,
        loader.file_info("/root/c").unwrap().filepaths
    );
}

#[tokio::test]
async fn test_loaded_module_is_not_fetched_again() {
    let fetcher = MapFetcher::new();
    fetcher.insert("/root/b", "export const b = 1;");
    let (loader, fetcher, _service) = loader_with(fetcher);

    loader
        .load_file("import { b } from './b';", "/root/a", Language::TypeScript)
        .await
        .unwrap();
    loader
        .load_file("export * from './b';", "/root/c", Language::TypeScript)
        .await
        .unwrap();

    assert_eq!(fetcher.call_count("/root/b"), 1);
}

#[tokio::test]
async fn test_transitive_dependencies_resolve_against_their_importer() {
    let fetcher = MapFetcher::new();
    fetcher.insert("/root/lib/b", "export * from '../util/c';");
    fetcher.insert("/root/util/c", "import 'pkg/sub';\nexport const c = 1;");
    fetcher.insert("pkg/sub", "export declare const sub: number;");
    let (loader, fetcher, service) = loader_with(fetcher);

    loader
        .load_file("import { c } from './lib/b';", "/root/a", Language::TypeScript)
        .await
        .unwrap();

    assert_eq!(loader.file_info("/root/lib/b").unwrap().filepaths, vec!["/root/util/c"]);
    assert_eq!(
        loader.file_info("/root/util/c").unwrap().filepaths,
        vec!["file:///node_modules/pkg/sub"]
    );
    assert_eq!(
        loader.status("file:///node_modules/pkg/sub"),
        Some(LoadStatus::Success)
    );
    assert_eq!(fetcher.calls(), vec!["/root/lib/b", "/root/util/c", "pkg/sub"]);
    assert_eq!(
        service.declared_identifiers(Language::TypeScript),
        vec![
            "/root/lib/b.d.ts",
            "/root/util/c.d.ts",
            "file:///node_modules/pkg/sub.d.ts",
        ]
    );
}

#[tokio::test]
async fn test_import_cycle_terminates() {
    let fetcher = MapFetcher::new();
    fetcher.insert("/root/b", "import { a } from './a';\nexport const b = 1;");
    fetcher.insert("/root/a", "import { b } from './b';\nexport const a = 1;");
    let (loader, fetcher, _service) = loader_with(fetcher);

    loader
        .load_file("import { b } from './b';", "/root/a", Language::TypeScript)
        .await
        .unwrap();

    assert_eq!(fetcher.call_count("/root/b"), 1);
    assert_eq!(fetcher.call_count("/root/a"), 1);
    assert_eq!(loader.status("/root/a"), Some(LoadStatus::Success));
    assert_eq!(loader.status("/root/b"), Some(LoadStatus::Success));
}

#[tokio::test]
async fn test_reload_replaces_file_info() {
    let fetcher = MapFetcher::new();
    fetcher.insert("/root/b", "export const b = 1;");
    fetcher.insert("/root/c", "export const c = 1;");
    let (loader, _fetcher, _service) = loader_with(fetcher);

    loader
        .load_file("import { b } from './b';", "/root/a", Language::TypeScript)
        .await
        .unwrap();
    let first = loader.get_ast("/root/a").unwrap();

    loader
        .load_file("import { c } from './c';", "/root/a", Language::TypeScript)
        .await
        .unwrap();
    let info = loader.file_info("/root/a").unwrap();

    assert_eq!(info.filepaths, vec!["/root/c"]);
    assert_eq!(info.import_modules.len(), 1);
    assert_eq!(info.import_modules[0].value, "./c");
    assert!(!first.ptr_eq(&info.tree));
}

#[tokio::test]
async fn test_resolution_only_without_fetcher() {
    let service = Arc::new(InMemoryLanguageService::new());
    let loader = DependencyLoader::new(service.clone(), LoaderOptions::default());

    loader
        .load_file(
            "import a from '@scope/pkg';\nimport { b } from '../b';",
            "/root/src/a",
            Language::TypeScript,
        )
        .await
        .unwrap();

    let info = loader.file_info("/root/src/a").unwrap();
    let specifiers: Vec<&str> = info.import_modules.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(specifiers, vec!["@scope/pkg", "../b"]);
    // Candidates are only resolved when a fetcher can load them
    assert!(info.filepaths.is_empty());
    assert_eq!(loader.status("/root/b"), None);
    assert_eq!(loader.registry().identifiers(), vec!["/root/src/a"]);
    assert!(service.history().is_empty());
}

#[tokio::test]
async fn test_empty_text_records_nothing() {
    let (loader, fetcher, _service) = loader_with(MapFetcher::new());

    loader.load_file("", "/root/a", Language::TypeScript).await.unwrap();

    assert!(loader.registry().is_empty());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_unparseable_text_degrades_to_nothing() {
    let service = Arc::new(InMemoryLanguageService::new());
    let (fetcher, erased) = shared(MapFetcher::new());
    let options = LoaderOptions {
        parse_overrides: ParseOptionsOverride {
            error_recovery: Some(false),
            ..Default::default()
        },
        ..LoaderOptions::default().with_fetcher(erased)
    };
    let loader = DependencyLoader::new(service, options);

    loader
        .load_file("import { from './b'", "/root/a", Language::TypeScript)
        .await
        .unwrap();

    assert!(loader.file_info("/root/a").is_none());
    assert!(loader.get_ast("/root/a").is_none());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_unparseable_dependency_is_still_registered() {
    let service = Arc::new(InMemoryLanguageService::new());
    let (fetcher, erased) = shared(MapFetcher::new());
    fetcher.insert("/root/b", "export const = ;");
    let options = LoaderOptions {
        parse_overrides: ParseOptionsOverride {
            error_recovery: Some(false),
            ..Default::default()
        },
        ..LoaderOptions::default().with_fetcher(erased)
    };
    let loader = DependencyLoader::new(service.clone(), options);

    loader
        .load_file("import { b } from './b';", "/root/a", Language::TypeScript)
        .await
        .unwrap();

    assert_eq!(loader.status("/root/b"), Some(LoadStatus::Success));
    assert!(loader.file_info("/root/b").is_none());
    assert!(service.declaration("/root/b.d.ts", Language::TypeScript).is_some());
}

#[tokio::test]
async fn test_declaration_buffers_and_custom_suffix() {
    let service = Arc::new(InMemoryLanguageService::new());
    let (_fetcher, erased) = shared({
        let fetcher = MapFetcher::new();
        fetcher.insert("/root/b", "export const b = 1;");
        fetcher
    });
    let options = LoaderOptions {
        declaration_model: true,
        declaration_suffix: ".d.mts".to_string(),
        ..LoaderOptions::default().with_fetcher(erased)
    };
    let loader = DependencyLoader::new(service.clone(), options);

    loader
        .load_file("import { b } from './b';", "/root/a", Language::JavaScript)
        .await
        .unwrap();

    assert_eq!(service.buffer("/root/b.d.mts").as_deref(), Some("export const b = 1;"));
    assert!(service.declaration("/root/b.d.mts", Language::JavaScript).is_some());
    assert!(service.declaration("/root/b.d.mts", Language::TypeScript).is_none());
}

#[tokio::test]
async fn test_first_failure_rejects_the_load() {
    let fetcher = MapFetcher::new();
    fetcher.insert("/root/ok", "export const ok = 1;");
    let (loader, _fetcher, _service) = loader_with(fetcher);

    let err = loader
        .load_file(
            "import { ok } from './ok';\nimport { gone } from './gone';",
            "/root/a",
            Language::TypeScript,
        )
        .await
        .unwrap_err();

    assert_eq!(err.identifier(), "/root/gone");
    assert_eq!(loader.status("/root/gone"), Some(LoadStatus::Error));
    assert_eq!(loader.status("/root/ok"), Some(LoadStatus::Success));
    assert_eq!(
        loader.file_info("/root/a").unwrap().filepaths,
        vec!["/root/ok", "/root/gone"]
    );
}

#[tokio::test]
async fn test_failure_does_not_abandon_slower_siblings() {
    let service = Arc::new(InMemoryLanguageService::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let fetcher = move |request: FetchRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if request.relative_path == "/root/slow" {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(FetchedModule::new("export * from './nested';"))
            } else if request.relative_path == "/root/nested" {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(FetchedModule::new("export const nested = 1;"))
            } else {
                Err(FetchError::not_found(request.relative_path))
            }
        }
    };
    let loader = DependencyLoader::new(
        service.clone(),
        LoaderOptions::default().with_fetcher(Arc::new(fetcher)),
    );

    let err = loader
        .load_file(
            "import { slow } from './slow';
import { gone } from './gone';",
            "/root/a",
            Language::TypeScript,
        )
        .await
        .unwrap_err();

    // The failing fetch settles first, yet the slower branch and its
    // descendants still finish before the call returns
    assert_eq!(err.identifier(), "/root/gone");
    assert_eq!(loader.status("/root/slow"), Some(LoadStatus::Success));
    assert_eq!(loader.status("/root/nested"), Some(LoadStatus::Success));
    assert!(service.declaration("/root/slow.d.ts", Language::TypeScript).is_some());
    assert!(service.declaration("/root/nested.d.ts", Language::TypeScript).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // A later importer finds the module loaded rather than stuck
    loader
        .load_file("import { slow } from './slow';", "/root/c", Language::TypeScript)
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_first_error_in_dispatch_order_is_reported() {
    let (loader, _fetcher, _service) = loader_with(MapFetcher::new());

    let err = loader
        .load_file(
            "import { x } from './first';
import { y } from './second';",
            "/root/a",
            Language::TypeScript,
        )
        .await
        .unwrap_err();

    assert_eq!(err.identifier(), "/root/first");
    assert_eq!(loader.status("/root/first"), Some(LoadStatus::Error));
    assert_eq!(loader.status("/root/second"), Some(LoadStatus::Error));
}
