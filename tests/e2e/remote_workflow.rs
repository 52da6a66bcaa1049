use httpmock::prelude::*;

use bioimageio_core::RdfError;
use bioimageio_core::config::{CacheConfig, Config, ResolverConfig};
use bioimageio_core::pipeline::Pipeline;
use bioimageio_core::source::{BaseLocation, SourceRef};

const REMOTE_DATASET: &str = "format_version: 0.5.3\ntype: dataset\nname: remote cells\ndocumentation: README.md\n";

fn pipeline_with_cache(cache_dir: &std::path::Path, offline: bool) -> Pipeline {
    let config = Config {
        resolver: ResolverConfig {
            timeout_secs: 5,
            offline,
            ..ResolverConfig::default()
        },
        cache: CacheConfig {
            enabled: true,
            dir: Some(cache_dir.to_path_buf()),
        },
        ..Config::default()
    };
    Pipeline::from_config(&config).unwrap()
}

fn source(server: &MockServer, path: &str) -> SourceRef {
    SourceRef::parse(&server.url(path))
}

#[test]
fn second_resolution_is_served_from_the_cache() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/cells/rdf.yaml");
        then.status(200).body(REMOTE_DATASET);
    });
    let cache = tempfile::tempdir().unwrap();

    let first = pipeline_with_cache(cache.path(), false)
        .resolve_source(&source(&server, "/cells/rdf.yaml"))
        .unwrap();
    // a fresh pipeline over the same cache directory
    let second = pipeline_with_cache(cache.path(), false)
        .resolve_source(&source(&server, "/cells/rdf.yaml"))
        .unwrap();

    mock.assert_hits(1);
    assert_eq!(first.content, second.content);
    assert_eq!(first.digest, second.digest);
}

#[test]
fn remote_descriptions_resolve_relative_to_their_url() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cells/rdf.yaml");
        then.status(200).body(REMOTE_DATASET);
    });
    let cache = tempfile::tempdir().unwrap();
    let pipeline = pipeline_with_cache(cache.path(), false);

    let rd = pipeline
        .load_description(&source(&server, "/cells/rdf.yaml"))
        .unwrap();
    let BaseLocation::Url(base) = &rd.root else {
        panic!("expected a URL root, got {}", rd.root);
    };
    assert_eq!(base.path(), "/cells/");
}

#[test]
fn remote_references_are_downloaded_into_packages() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/cells/rdf.yaml");
        then.status(200).body(REMOTE_DATASET);
    });
    let readme = server.mock(|when, then| {
        when.method(GET).path("/cells/README.md");
        then.status(200).body("# Remote cells\n");
    });
    let cache = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pipeline = pipeline_with_cache(cache.path(), false);

    let rd = pipeline
        .load_description(&source(&server, "/cells/rdf.yaml"))
        .unwrap();
    let manifest = pipeline.write_package(&rd, &out.path().join("cells.zip")).unwrap();

    readme.assert();
    assert_eq!(
        manifest.archive_paths().collect::<Vec<_>>(),
        ["rdf.yaml", "docs/README.md"]
    );
    assert_eq!(manifest.find("docs/README.md").unwrap().size, 15);
}

#[test]
fn http_errors_are_unreachable_sources() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing/rdf.yaml");
        then.status(404);
    });
    let cache = tempfile::tempdir().unwrap();

    let err = pipeline_with_cache(cache.path(), false)
        .read_description(&source(&server, "/missing/rdf.yaml"))
        .unwrap_err();
    let RdfError::UnreachableSource { reason, .. } = &err else {
        panic!("expected an unreachable source, got {err}");
    };
    assert!(reason.contains("404"), "{reason}");
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn offline_mode_uses_cached_copies_only() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/cells/rdf.yaml");
        then.status(200).body(REMOTE_DATASET);
    });
    let cache = tempfile::tempdir().unwrap();

    let offline = pipeline_with_cache(cache.path(), true);
    assert!(
        offline
            .resolve_source(&source(&server, "/cells/rdf.yaml"))
            .is_err()
    );
    mock.assert_hits(0);

    pipeline_with_cache(cache.path(), false)
        .resolve_source(&source(&server, "/cells/rdf.yaml"))
        .unwrap();
    let resolved = offline
        .resolve_source(&source(&server, "/cells/rdf.yaml"))
        .unwrap();
    assert_eq!(resolved.content, REMOTE_DATASET.as_bytes());
    mock.assert_hits(1);
}
