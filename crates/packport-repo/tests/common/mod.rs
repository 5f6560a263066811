#![allow(dead_code)]

use std::path::Path;

use packport_core::PackMetadata;
use packport_repo::{Entry, Home, IndexFile, PackVersion, RepoFile};

pub fn pack_version(name: &str, version: &str, url: &str) -> PackVersion {
    PackVersion {
        metadata: PackMetadata {
            name: name.to_string(),
            version: version.to_string(),
            description: None,
        },
        urls: vec![url.to_string()],
        created: None,
        removed: false,
        digest: None,
    }
}

pub fn index_of(versions: Vec<PackVersion>) -> IndexFile {
    let mut index = IndexFile::new();
    for pv in versions {
        index
            .entries
            .entry(pv.name().to_string())
            .or_default()
            .push(pv);
    }
    index
}

/// Build a home directory holding a registry with the given repositories
/// and one cached index per repository.
pub fn write_home(root: &Path, repos: Vec<(Entry, IndexFile)>) -> Home {
    let home = Home::new(root);
    home.ensure_directories().unwrap();

    let mut registry = RepoFile::new();
    for (entry, index) in repos {
        index
            .write_file(&home.cache_index(&entry.name), 0o644)
            .unwrap();
        registry.add([entry]);
    }
    registry
        .write_file(&home.repository_file(), 0o644)
        .unwrap();
    home
}

/// The registry fixture used by the resolution tests: a `testing`
/// repository with three alpine releases (canonically sorted) and a
/// `relative` repository whose index publishes repository-relative URLs.
pub fn resolver_home(root: &Path) -> Home {
    let testing = index_of(vec![
        pack_version("alpine", "1.2.3", "http://example.com/alpine-1.2.3.tgz"),
        pack_version("alpine", "0.2.0", "http://example.com/alpine-0.2.0.tgz"),
        pack_version("alpine", "0.1.0", "http://example.com/alpine-0.1.0.tgz"),
    ]);
    let relative = index_of(vec![pack_version("alpine", "1.2.3", "alpine-1.2.3.tgz")]);

    write_home(
        root,
        vec![
            (
                Entry {
                    name: "testing".to_string(),
                    cache: "testing-index.yaml".to_string(),
                    url: "http://example.com".to_string(),
                    ..Default::default()
                },
                testing,
            ),
            (
                Entry {
                    name: "relative".to_string(),
                    cache: "relative-index.yaml".to_string(),
                    url: "http://dl.example.com/packs".to_string(),
                    ..Default::default()
                },
                relative,
            ),
        ],
    )
}
